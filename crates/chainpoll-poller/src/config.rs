//! Poller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the filter's `fromBlock` evolves between polls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockRangeMode {
    /// Every poll queries the configured range again. With `toBlock: latest`
    /// the scanned range grows with the chain.
    #[default]
    Static,
    /// After a poll that returned logs, `fromBlock` moves to one past the
    /// highest `blockNumber` seen.
    Advancing,
}

/// What a trigger does when the job already has a live session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the running session; the trigger is a no-op.
    #[default]
    Ignore,
    /// Cancel the running session and start a fresh one.
    Restart,
    /// Start another concurrent session next to the running one.
    Allow,
}

/// Configuration shared by every poll session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// JSON-RPC endpoint, e.g. "http://127.0.0.1:8545"
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Sleep before each request (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Deadline for one request (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub block_range: BlockRangeMode,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

fn default_rpc_url() -> String { "http://127.0.0.1:8545".into() }
fn default_poll_interval_ms() -> u64 { 2_000 }
fn default_request_timeout_ms() -> u64 { 30_000 }

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            block_range: BlockRangeMode::default(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl PollerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
