//! Dispatch errors.

use chainpoll_core::error::FilterError;
use thiserror::Error;

/// Errors returned by [`Supervisor::trigger`](crate::Supervisor::trigger).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown job: {0}")]
    UnknownJob(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("supervisor is shutting down")]
    ShuttingDown,
}
