use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kanban::board::TaskStatus;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cmd;

#[derive(Parser)]
#[command(name = "kanban")]
#[command(version, about = "Three-column Kanban board backed by a REST task store")]
pub struct Cli {
    /// Log task store requests (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Task store base address. Overrides KANBAN_API_URL and kanban.toml.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Directory containing .kanban/kanban.toml (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the in-memory reference task store
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Interface to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Show all three columns
    Board,
    /// Create a task in "To Do"
    Add {
        title: String,

        #[arg(short, long)]
        description: Option<String>,
    },
    /// Change a task's title or description
    Edit {
        /// Task id or unique id prefix
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },
    /// Move a task to a column (todo, in-progress, done)
    Move {
        /// Task id or unique id prefix
        id: String,
        status: TaskStatus,
    },
    /// Move a task one column to the right
    Forward {
        /// Task id or unique id prefix
        id: String,
    },
    /// Move a task one column to the left
    Back {
        /// Task id or unique id prefix
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task id or unique id prefix
        id: String,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn init_tracing(verbose: bool) {
    // RUST_LOG wins; otherwise --verbose turns on debug output for this crate.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| {
            EnvFilter::new(if verbose { "kanban=debug" } else { "warn" })
        });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let port = match &cli.command {
        Commands::Serve { port, .. } => *port,
        _ => None,
    };
    let config = kanban::config::KanbanConfig::with_cli_args(&project_dir, cli.api_url.clone(), port)
        .context("Failed to load configuration")?;

    match &cli.command {
        Commands::Serve { host, .. } => cmd::cmd_serve(&config, host).await?,
        Commands::Board => cmd::cmd_board(&config).await?,
        Commands::Add { title, description } => {
            cmd::cmd_add(&config, title, description.as_deref()).await?
        }
        Commands::Edit {
            id,
            title,
            description,
        } => cmd::cmd_edit(&config, id, title.clone(), description.clone()).await?,
        Commands::Move { id, status } => cmd::cmd_move(&config, id, *status).await?,
        Commands::Forward { id } => cmd::cmd_step(&config, id, cmd::Direction::Forward).await?,
        Commands::Back { id } => cmd::cmd_step(&config, id, cmd::Direction::Back).await?,
        Commands::Delete { id, yes } => cmd::cmd_delete(&config, id, *yes).await?,
    }

    Ok(())
}
