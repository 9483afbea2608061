//! Board configuration read from `.kanban/kanban.toml`.
//!
//! Settings are layered `file → environment → CLI`:
//!
//! ```toml
//! [client]
//! api_url = "http://localhost:8080"
//! timeout_secs = 10
//!
//! [server]
//! port = 8080
//! allowed_origin = "http://localhost:3000"
//! ```
//!
//! `KANBAN_API_URL` overrides `client.api_url`; `--api-url` and `--port`
//! override both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Environment variable overriding the task store base address.
pub const API_URL_ENV: &str = "KANBAN_API_URL";

pub const CONFIG_DIR: &str = ".kanban";
pub const CONFIG_FILE: &str = "kanban.toml";

/// How the CLI reaches the remote task store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Per-request transport timeout. Unset means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: None,
        }
    }
}

/// Settings for the reference task store started by `kanban serve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Browser origin allowed by CORS.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

fn default_port() -> u16 {
    8080
}

fn default_allowed_origin() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

/// The complete kanban.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanToml {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub server: ServerSection,
}

impl KanbanToml {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `<dir>/kanban.toml`, or defaults when the file doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Resolved configuration: file settings plus environment and CLI overrides.
#[derive(Debug, Clone)]
pub struct KanbanConfig {
    pub config_dir: PathBuf,
    pub toml: KanbanToml,
    pub cli_api_url: Option<String>,
    pub cli_port: Option<u16>,
}

impl KanbanConfig {
    pub fn new(project_dir: &Path) -> Result<Self, ConfigError> {
        let config_dir = project_dir.join(CONFIG_DIR);
        let toml = KanbanToml::load_or_default(&config_dir)?;
        Ok(Self {
            config_dir,
            toml,
            cli_api_url: None,
            cli_port: None,
        })
    }

    pub fn with_cli_args(
        project_dir: &Path,
        api_url: Option<String>,
        port: Option<u16>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::new(project_dir)?;
        config.cli_api_url = api_url;
        config.cli_port = port;
        Ok(config)
    }

    /// Task store base address (CLI → env → file → default).
    pub fn api_url(&self) -> String {
        self.cli_api_url
            .clone()
            .or_else(|| {
                std::env::var(API_URL_ENV)
                    .ok()
                    .filter(|url| !url.trim().is_empty())
            })
            .unwrap_or_else(|| self.toml.client.api_url.clone())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.toml.client.timeout_secs.map(Duration::from_secs)
    }

    pub fn port(&self) -> u16 {
        self.cli_port.unwrap_or(self.toml.server.port)
    }

    pub fn allowed_origin(&self) -> &str {
        &self.toml.server.allowed_origin
    }
}
