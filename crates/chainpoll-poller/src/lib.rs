//! chainpoll-poller: one long-running `eth_getLogs` poll per triggered job.
//!
//! ## Architecture
//! ```text
//! trigger(job_id)
//!       │
//!       ▼
//! Supervisor ── JobRegistry (Arc, read-only)
//!       │  spawns, keeps PollHandle { CancellationToken, JoinHandle }
//!       ▼
//! PollLoop (one Tokio task per session)
//!   Sleeping ──▶ Sending ──▶ Sleeping ──▶ …      (Stopped on cancel)
//!                   │
//!                   ├── RpcTransport::call(eth_getLogs, filter)
//!                   ├── ResultSink::on_result        (success)
//!                   └── FailureHandler::on_failure   (transport / malformed / rpc)
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod poll_loop;
pub mod session;
pub mod supervisor;

pub use config::{BlockRangeMode, DuplicatePolicy, PollerConfig};
pub use error::DispatchError;
pub use handler::{FailureHandler, LogFailureHandler, LogResultSink, ResultSink};
pub use poll_loop::PollLoop;
pub use session::{PollSession, PollState, PollStats, SessionSnapshot};
pub use supervisor::{PollHandle, Supervisor, TriggerOutcome};
