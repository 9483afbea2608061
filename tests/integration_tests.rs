//! Integration tests for the kanban CLI
//!
//! Board commands run against the reference task store served in-process on
//! an ephemeral port.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use kanban::board::api::AppState;
use kanban::board::server::build_router;
use predicates::prelude::*;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to create a kanban Command isolated from the caller's environment
fn kanban(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("kanban");
    cmd.current_dir(dir.path())
        .env_remove("KANBAN_API_URL")
        .env_remove("RUST_LOG");
    cmd
}

/// Serve the reference store on its own runtime thread and return its URL.
fn spawn_store() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let app = build_router(Arc::new(AppState::default()), "http://localhost:3000").unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });
    format!("http://{}", addr)
}

/// An address with nothing listening on it.
fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn stdout_of(output: &std::process::Output) -> String {
    console::strip_ansi_codes(&String::from_utf8_lossy(&output.stdout)).to_string()
}

/// Run `kanban add` and return the created task id.
fn add_task(dir: &TempDir, url: &str, title: &str) -> String {
    let output = kanban(dir)
        .args(["--api-url", url, "add", title])
        .output()
        .unwrap();
    assert!(output.status.success(), "add failed: {:?}", output);
    let stdout = stdout_of(&output);
    stdout
        .split_whitespace()
        .nth(1)
        .expect("created id in output")
        .to_string()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_kanban_help() {
        let dir = TempDir::new().unwrap();
        kanban(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("board"));
    }

    #[test]
    fn test_kanban_version() {
        let dir = TempDir::new().unwrap();
        kanban(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_move_rejects_unknown_status() {
        let dir = TempDir::new().unwrap();
        kanban(&dir)
            .args(["move", "abc", "blocked"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid status"));
    }

    #[test]
    fn test_edit_requires_a_change() {
        let dir = TempDir::new().unwrap();
        kanban(&dir)
            .args(["--api-url", &dead_url(), "edit", "abc"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Nothing to change"));
    }

    #[test]
    fn test_board_unreachable_store() {
        let dir = TempDir::new().unwrap();
        kanban(&dir)
            .args(["--api-url", &dead_url(), "board"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Could not load tasks"));
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_invalid_config_file_fails() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".kanban")).unwrap();
        fs::write(dir.path().join(".kanban/kanban.toml"), "[client\n").unwrap();

        kanban(&dir)
            .arg("board")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load configuration"));
    }

    #[test]
    fn test_config_file_api_url_is_used() {
        let url = spawn_store();
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".kanban")).unwrap();
        fs::write(
            dir.path().join(".kanban/kanban.toml"),
            format!("[client]\napi_url = \"{}\"\n", url),
        )
        .unwrap();

        kanban(&dir)
            .arg("board")
            .assert()
            .success()
            .stdout(predicate::str::contains("To Do (0)"));
    }

    #[test]
    fn test_env_api_url_is_used() {
        let url = spawn_store();
        let dir = TempDir::new().unwrap();

        kanban(&dir)
            .env("KANBAN_API_URL", &url)
            .arg("board")
            .assert()
            .success()
            .stdout(predicate::str::contains("Done (0)"));
    }
}

// =============================================================================
// Board Workflow Tests
// =============================================================================

mod workflow {
    use super::*;

    #[test]
    fn test_add_move_delete() {
        let url = spawn_store();
        let dir = TempDir::new().unwrap();

        let id = add_task(&dir, &url, "Write spec");

        kanban(&dir)
            .args(["--api-url", &url, "board"])
            .assert()
            .success()
            .stdout(predicate::str::contains("To Do (1)"))
            .stdout(predicate::str::contains("Write spec"));

        kanban(&dir)
            .args(["--api-url", &url, "move", &id, "in-progress"])
            .assert()
            .success()
            .stdout(predicate::str::contains("In Progress"));

        kanban(&dir)
            .args(["--api-url", &url, "forward", &id[..8]])
            .assert()
            .success()
            .stdout(predicate::str::contains("Done"));

        kanban(&dir)
            .args(["--api-url", &url, "forward", &id])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no column beyond"));

        kanban(&dir)
            .args(["--api-url", &url, "board"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Done (1)"));

        kanban(&dir)
            .args(["--api-url", &url, "delete", &id, "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Deleted"));

        kanban(&dir)
            .args(["--api-url", &url, "board"])
            .assert()
            .success()
            .stdout(predicate::str::contains("To Do (0)"))
            .stdout(predicate::str::contains("Done (0)"));
    }

    #[test]
    fn test_edit_changes_title() {
        let url = spawn_store();
        let dir = TempDir::new().unwrap();
        let id = add_task(&dir, &url, "Old title");

        kanban(&dir)
            .args(["--api-url", &url, "edit", &id, "--title", "New title"])
            .assert()
            .success();

        kanban(&dir)
            .args(["--api-url", &url, "board"])
            .assert()
            .success()
            .stdout(predicate::str::contains("New title"))
            .stdout(predicate::str::contains("Old title").not());
    }

    #[test]
    fn test_add_blank_title_is_rejected() {
        let url = spawn_store();
        let dir = TempDir::new().unwrap();

        kanban(&dir)
            .args(["--api-url", &url, "add", "  "])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Task title is required"));
    }

    #[test]
    fn test_delete_without_terminal_fails_and_keeps_task() {
        let url = spawn_store();
        let dir = TempDir::new().unwrap();
        let id = add_task(&dir, &url, "Keep me");

        kanban(&dir)
            .args(["--api-url", &url, "delete", &id])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read delete confirmation"));

        kanban(&dir)
            .args(["--api-url", &url, "board"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Keep me"));
    }

    #[test]
    fn test_delete_unknown_id() {
        let url = spawn_store();
        let dir = TempDir::new().unwrap();

        kanban(&dir)
            .args(["--api-url", &url, "delete", "missing", "--yes"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No task matches"));
    }
}
