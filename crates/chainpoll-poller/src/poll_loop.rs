//! The poll loop: one per triggered job.
//!
//! Each iteration sleeps for `poll_interval`, sends `eth_getLogs` with the
//! session's filter under a `request_timeout` deadline, and hands the outcome
//! to the result sink or failure handler. Failures never end the loop and
//! never change the interval. Both waits race the session's cancellation
//! token, so a stop takes effect mid-sleep or mid-request. An advancing
//! session with a numeric `toBlock` ends once that block has been scanned.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use chainpoll_core::error::TransportError;
use chainpoll_core::request::METHOD_GET_LOGS;
use chainpoll_core::transport::RpcTransport;
use chainpoll_core::types::BlockNumberOrTag;

use crate::config::{BlockRangeMode, PollerConfig};
use crate::handler::{FailureHandler, LogFailureHandler, LogResultSink, ResultSink};
use crate::session::{PollSession, PollState, PollStats};

/// JSON-RPC id used for every request; polls never overlap within a session.
pub const REQUEST_ID: u64 = 1;

pub struct PollLoop {
    session: PollSession,
    transport: Arc<dyn RpcTransport>,
    sink: Arc<dyn ResultSink>,
    failures: Arc<dyn FailureHandler>,
    poll_interval: Duration,
    request_timeout: Duration,
    block_range: BlockRangeMode,
    max_polls: Option<u64>,
}

impl PollLoop {
    /// Create a loop that logs results and failures through `tracing`.
    pub fn new(
        session: PollSession,
        transport: Arc<dyn RpcTransport>,
        config: &PollerConfig,
    ) -> Self {
        Self {
            session,
            transport,
            sink: Arc::new(LogResultSink),
            failures: Arc::new(LogFailureHandler),
            poll_interval: config.poll_interval(),
            request_timeout: config.request_timeout(),
            block_range: config.block_range,
            max_polls: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_failure_handler(mut self, failures: Arc<dyn FailureHandler>) -> Self {
        self.failures = failures;
        self
    }

    /// Stop on its own after `n` requests.
    pub fn with_max_polls(mut self, n: u64) -> Self {
        self.max_polls = Some(n);
        self
    }

    pub fn session(&self) -> &PollSession {
        &self.session
    }

    /// Run until `cancel` fires (or the poll budget is spent).
    pub async fn run(mut self, cancel: CancellationToken) -> PollStats {
        tracing::info!(
            job = %self.session.job_id,
            session = self.session.session_id,
            interval_ms = self.poll_interval.as_millis() as u64,
            url = %self.transport.url(),
            "poll session started"
        );

        loop {
            if let Some(max) = self.max_polls {
                if self.session.stats().polls >= max {
                    break;
                }
            }

            self.session.set_state(PollState::Sleeping);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            self.session.set_state(PollState::Sending);
            self.session.update_stats(|s| s.polls += 1);
            tracing::debug!(
                job = %self.session.job_id,
                session = self.session.session_id,
                poll = self.session.stats().polls,
                "polling"
            );

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.poll_once() => outcome,
            };

            match outcome {
                Ok(result) => {
                    self.session.update_stats(|s| s.results += 1);
                    let exhausted = self.block_range == BlockRangeMode::Advancing
                        && self.advance(&result) == Cursor::Exhausted;
                    self.sink.on_result(&self.session, &result).await;
                    if exhausted {
                        tracing::info!(
                            job = %self.session.job_id,
                            session = self.session.session_id,
                            to_block = %self.session.filter.to_block.unwrap_or_default(),
                            "block range fully scanned"
                        );
                        break;
                    }
                }
                Err(e) => {
                    self.session.update_stats(|s| s.record_failure(e.kind()));
                    self.failures.on_failure(&self.session, &e).await;
                }
            }
        }

        self.session.set_state(PollState::Stopped);
        let stats = self.session.stats();
        tracing::info!(
            job = %self.session.job_id,
            session = self.session.session_id,
            polls = stats.polls,
            results = stats.results,
            failures = stats.failures(),
            "poll session stopped"
        );
        stats
    }

    async fn poll_once(&self) -> Result<Value, TransportError> {
        let call = self
            .transport
            .call(METHOD_GET_LOGS, &self.session.filter, REQUEST_ID);
        let resp = tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            })??;
        resp.into_result()
    }

    /// Move `fromBlock` past the newest log in `result`.
    ///
    /// A numeric `toBlock` bounds the cursor: once the next start would pass
    /// it the range is done and the filter is left as it was.
    fn advance(&mut self, result: &Value) -> Cursor {
        let Some(highest) = highest_block(result) else {
            return Cursor::Unchanged;
        };
        let next = highest.saturating_add(1);
        if let Some(BlockNumberOrTag::Number(end)) = self.session.filter.to_block {
            if next > end {
                return Cursor::Exhausted;
            }
        }
        let behind = match self.session.filter.from_block {
            Some(BlockNumberOrTag::Number(current)) => current < next,
            _ => true,
        };
        if !behind {
            return Cursor::Unchanged;
        }
        tracing::debug!(
            job = %self.session.job_id,
            session = self.session.session_id,
            from_block = next,
            "advancing block cursor"
        );
        self.session.set_from_block(BlockNumberOrTag::Number(next));
        Cursor::Moved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Unchanged,
    Moved,
    /// The scanned range reached a numeric `toBlock`.
    Exhausted,
}

/// Highest `blockNumber` among the log objects of an `eth_getLogs` result.
fn highest_block(result: &Value) -> Option<u64> {
    result
        .as_array()?
        .iter()
        .filter_map(|log| log.get("blockNumber")?.as_str())
        .filter_map(parse_hex_u64)
        .max()
}

/// Parse a hex-encoded string (with or without `0x`) to u64.
fn parse_hex_u64(s: &str) -> Option<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).ok()
}
