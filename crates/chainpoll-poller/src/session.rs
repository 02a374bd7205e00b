//! Poll session state and counters.

use std::sync::{Arc, Mutex, PoisonError};

use chainpoll_core::error::FailureKind;
use chainpoll_core::filter::LogFilter;
use chainpoll_core::types::BlockNumberOrTag;

/// Where a poll loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Created, not yet running.
    Idle,
    /// Waiting out the poll interval.
    Sleeping,
    /// A request is in flight.
    Sending,
    /// Cancelled or finished its poll budget.
    Stopped,
}

impl std::fmt::Display for PollState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sleeping => write!(f, "sleeping"),
            Self::Sending => write!(f, "sending"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Per-session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Requests attempted.
    pub polls: u64,
    /// Responses whose `result` reached the sink.
    pub results: u64,
    pub transport_failures: u64,
    pub malformed_responses: u64,
    pub rpc_errors: u64,
}

impl PollStats {
    pub fn record_failure(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::Transport => self.transport_failures += 1,
            FailureKind::MalformedResponse => self.malformed_responses += 1,
            FailureKind::Rpc => self.rpc_errors += 1,
        }
    }

    pub fn failures(&self) -> u64 {
        self.transport_failures + self.malformed_responses + self.rpc_errors
    }
}

/// Point-in-time view of a session, readable while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: PollState,
    pub stats: PollStats,
    pub from_block: Option<BlockNumberOrTag>,
}

/// Runtime state of one poll loop.
///
/// The filter is owned by the session; only `fromBlock` ever changes, and
/// only in advancing mode.
#[derive(Debug)]
pub struct PollSession {
    pub job_id: String,
    pub session_id: u64,
    pub filter: LogFilter,
    shared: Arc<Mutex<SessionSnapshot>>,
}

impl PollSession {
    pub fn new(job_id: impl Into<String>, session_id: u64, filter: LogFilter) -> Self {
        let shared = Arc::new(Mutex::new(SessionSnapshot {
            state: PollState::Idle,
            stats: PollStats::default(),
            from_block: filter.from_block,
        }));
        Self {
            job_id: job_id.into(),
            session_id,
            filter,
            shared,
        }
    }

    /// Handle for observers; stays valid after the session ends.
    pub fn monitor(&self) -> SessionMonitor {
        SessionMonitor(Arc::clone(&self.shared))
    }

    pub fn state(&self) -> PollState {
        self.lock().state
    }

    pub fn stats(&self) -> PollStats {
        self.lock().stats
    }

    pub(crate) fn set_state(&self, state: PollState) {
        self.lock().state = state;
    }

    pub(crate) fn update_stats(&self, f: impl FnOnce(&mut PollStats)) {
        f(&mut self.lock().stats);
    }

    pub(crate) fn set_from_block(&mut self, from: BlockNumberOrTag) {
        self.filter.set_from_block(from);
        self.lock().from_block = Some(from);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionSnapshot> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read-only view onto a running (or finished) session.
#[derive(Debug, Clone)]
pub struct SessionMonitor(Arc<Mutex<SessionSnapshot>>);

impl SessionMonitor {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
