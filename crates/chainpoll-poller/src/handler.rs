//! Result and failure handler traits, with `tracing`-backed defaults.

use async_trait::async_trait;
use serde_json::Value;

use chainpoll_core::error::{FailureKind, TransportError};

use crate::session::PollSession;

/// Receives the `result` of every successful poll.
///
/// No deduplication happens upstream: with a static block range the same
/// logs are delivered again on every poll.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn on_result(&self, session: &PollSession, result: &Value);
}

/// Receives every failed poll iteration. The loop carries on afterwards
/// regardless of what the handler does.
#[async_trait]
pub trait FailureHandler: Send + Sync {
    async fn on_failure(&self, session: &PollSession, error: &TransportError);
}

/// Logs results as `info` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogResultSink;

#[async_trait]
impl ResultSink for LogResultSink {
    async fn on_result(&self, session: &PollSession, result: &Value) {
        let logs = result.as_array().map(Vec::len);
        tracing::info!(
            job = %session.job_id,
            session = session.session_id,
            logs,
            %result,
            "poll result"
        );
    }
}

/// Logs failures, one message and level per failure class.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFailureHandler;

#[async_trait]
impl FailureHandler for LogFailureHandler {
    async fn on_failure(&self, session: &PollSession, error: &TransportError) {
        let job = session.job_id.as_str();
        let session_id = session.session_id;
        match error.kind() {
            FailureKind::Transport => tracing::warn!(
                job,
                session = session_id,
                error = %error,
                "transport failure, skipping this poll"
            ),
            FailureKind::MalformedResponse => tracing::warn!(
                job,
                session = session_id,
                error = %error,
                "malformed JSON-RPC response, skipping this poll"
            ),
            FailureKind::Rpc => tracing::error!(
                job,
                session = session_id,
                code = error.rpc_code(),
                error = %error,
                "node returned a JSON-RPC error"
            ),
        }
    }
}
