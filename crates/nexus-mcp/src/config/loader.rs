//! Server configuration: defaults, TOML file, environment override.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::prompts::PromptSource;
use crate::protocol::HandlerOptions;
use crate::transport::DEFAULT_MAX_FRAME_BYTES;
use crate::types::{McpError, McpResult, Prompt, Resource, Tool};

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV: &str = "NEXUS_MCP_CONFIG";

/// Host configuration.
///
/// Every field has a default, so an empty file (or no file) is valid.
/// The `[[tools]]`, `[[resources]]` and `[[prompts]]` tables seed the
/// registries at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the TCP listener binds to.
    pub listen_addr: String,
    /// Per-request handler bound, in seconds.
    pub request_timeout_secs: u64,
    /// Reject operations before the handshake completes.
    pub strict_handshake: bool,
    /// Largest accepted inbound frame.
    pub max_frame_bytes: usize,
    pub tools: Vec<Tool>,
    pub resources: Vec<Resource>,
    pub prompts: Vec<Prompt>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
            strict_handshake: false,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            tools: Vec::new(),
            resources: Vec::new(),
            prompts: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> McpResult<Self> {
        toml::from_str(text).map_err(|e| McpError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> McpResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| McpError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn handler_options(&self) -> HandlerOptions {
        HandlerOptions {
            request_timeout: self.request_timeout(),
            strict_handshake: self.strict_handshake,
        }
    }
}

impl PromptSource for ServerConfig {
    fn load_prompts(&self) -> McpResult<Vec<Prompt>> {
        Ok(self.prompts.clone())
    }
}

/// Load configuration.
///
/// Uses `path` when given, otherwise the file named by `NEXUS_MCP_CONFIG`,
/// otherwise the defaults. A named file that is missing is an error.
pub fn load_config(path: Option<&str>) -> McpResult<ServerConfig> {
    let path = path
        .map(str::to_string)
        .or_else(|| std::env::var(CONFIG_ENV).ok().filter(|p| !p.is_empty()));

    match path {
        Some(path) => {
            tracing::debug!("Loading config from {path}");
            ServerConfig::from_file(path)
        }
        None => Ok(ServerConfig::default()),
    }
}
