//! Typed error hierarchy for the board.
//!
//! Three top-level enums cover the three layers:
//! - `StoreError`: a single remote task-store call failed
//! - `SyncError`: a synchronizer operation failed (remote or precondition)
//! - `ConfigError`: the configuration file could not be loaded

use thiserror::Error;

use crate::board::models::TaskStatus;

/// Errors from one call against the remote task store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request to task store failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Task store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid task store response: {0}")]
    Decode(String),

    #[error("Invalid task store URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Errors from the task state synchronizer.
///
/// Remote failures wrap the `StoreError` that caused them. `EmptyTitle`,
/// `TaskNotFound` and `NoAdjacentColumn` are raised locally before any
/// request is sent.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to fetch tasks: {0}")]
    FetchFailed(#[source] StoreError),

    #[error("Failed to create task: {0}")]
    CreateFailed(#[source] StoreError),

    #[error("Failed to update task {id}: {source}")]
    UpdateFailed {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to move task {id} from {from} to {to}: {source}")]
    MoveFailed {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
        #[source]
        source: StoreError,
    },

    #[error("Failed to delete task {id}: {source}")]
    DeleteFailed {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("Task title is required")]
    EmptyTitle,

    #[error("Task {id} not found")]
    TaskNotFound { id: String },

    #[error("Task {id} has no column beyond {status}")]
    NoAdjacentColumn { id: String, status: TaskStatus },
}

impl SyncError {
    /// Fixed message placed in the board's error slot, or `None` for local
    /// precondition failures that never reach the store.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::FetchFailed(_) => Some("Could not load tasks."),
            Self::CreateFailed(_) | Self::UpdateFailed { .. } => Some("Failed to save the task."),
            Self::MoveFailed { .. } => Some("Failed to move the task. Reverting..."),
            Self::DeleteFailed { .. } => Some("Failed to delete the task."),
            Self::EmptyTitle | Self::TaskNotFound { .. } | Self::NoAdjacentColumn { .. } => None,
        }
    }

    pub fn is_precondition(&self) -> bool {
        self.user_message().is_none()
    }
}

/// Errors from loading `.kanban/kanban.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error() -> StoreError {
        StoreError::Status {
            status: 500,
            body: "boom".into(),
        }
    }

    #[test]
    fn store_error_status_carries_code_and_body() {
        let err = status_error();
        let text = err.to_string();
        assert!(text.contains("500"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn move_failed_names_both_columns() {
        let err = SyncError::MoveFailed {
            id: "2".into(),
            from: TaskStatus::ToDo,
            to: TaskStatus::InProgress,
            source: status_error(),
        };
        let text = err.to_string();
        assert!(text.contains("ToDo"));
        assert!(text.contains("InProgress"));
        assert_eq!(
            err.user_message(),
            Some("Failed to move the task. Reverting...")
        );
    }

    #[test]
    fn remote_failures_have_user_messages() {
        assert_eq!(
            SyncError::FetchFailed(status_error()).user_message(),
            Some("Could not load tasks.")
        );
        assert_eq!(
            SyncError::CreateFailed(status_error()).user_message(),
            Some("Failed to save the task.")
        );
        assert_eq!(
            SyncError::DeleteFailed {
                id: "1".into(),
                source: status_error()
            }
            .user_message(),
            Some("Failed to delete the task.")
        );
    }

    #[test]
    fn precondition_failures_have_no_user_message() {
        assert!(SyncError::EmptyTitle.is_precondition());
        assert!(SyncError::TaskNotFound { id: "x".into() }.is_precondition());
        assert!(
            SyncError::NoAdjacentColumn {
                id: "x".into(),
                status: TaskStatus::Done
            }
            .is_precondition()
        );
    }

    #[test]
    fn sync_error_exposes_store_error_as_source() {
        use std::error::Error as _;
        let err = SyncError::CreateFailed(status_error());
        let source = err.source().expect("source");
        assert!(source.to_string().contains("500"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&status_error());
        assert_std_error(&SyncError::EmptyTitle);
        let config_err = ConfigError::Read {
            path: "kanban.toml".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_std_error(&config_err);
    }
}
