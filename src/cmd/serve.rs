//! Reference task store command: `kanban serve`.

use anyhow::Result;
use kanban::board::server::{ServerConfig, start_server};
use kanban::config::KanbanConfig;

pub async fn cmd_serve(config: &KanbanConfig, host: &str) -> Result<()> {
    start_server(ServerConfig {
        host: host.to_string(),
        port: config.port(),
        allowed_origin: config.allowed_origin().to_string(),
    })
    .await
}
