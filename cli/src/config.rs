//! `chainpoll.yaml`: application configuration.
//!
//! ```yaml
//! listen_addr: "0.0.0.0:5100"
//! poller:
//!   rpc_url: "http://127.0.0.1:8545"
//!   poll_interval_ms: 2000
//!   block_range: static
//!   duplicate_policy: ignore
//! log:
//!   level: info
//! jobs:
//!   - id: 6ba16cd62b8b4114b95449e35800cba0
//!     addresses: ["0x291D46AE055Dd592B8CC7DdBF232cc206CEfa975"]
//!     from_block: "0x35e8e0c"
//!     to_block: latest
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use chainpoll_core::job::JobDescriptor;
use chainpoll_poller::PollerConfig;

use crate::logging::LogConfig;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "chainpoll.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bind address of the trigger server
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub log: LogConfig,
    /// Watched jobs; the built-in set when omitted
    #[serde(default = "JobDescriptor::builtin")]
    pub jobs: Vec<JobDescriptor>,
}

fn default_listen_addr() -> String { "0.0.0.0:5100".into() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            poller: PollerConfig::default(),
            log: LogConfig::default(),
            jobs: JobDescriptor::builtin(),
        }
    }
}

impl AppConfig {
    /// Load `path`, or `chainpoll.yaml` if present, or the built-in defaults.
    ///
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path: PathBuf = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply command-line overrides on top of the file.
    pub fn with_overrides(mut self, rpc_url: Option<String>, listen: Option<String>) -> Self {
        if let Some(url) = rpc_url {
            self.poller.rpc_url = url;
        }
        if let Some(addr) = listen {
            self.listen_addr = addr;
        }
        self
    }
}
