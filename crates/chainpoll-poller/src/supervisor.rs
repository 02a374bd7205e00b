//! `Supervisor`: starts, tracks and stops poll sessions.
//!
//! The supervisor is the only owner of session handles. Each session gets a
//! child of the supervisor's root cancellation token, so a single
//! [`Supervisor::shutdown`] stops everything.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use chainpoll_core::job::JobRegistry;
use chainpoll_core::transport::RpcTransport;

use crate::config::{DuplicatePolicy, PollerConfig};
use crate::error::DispatchError;
use crate::handler::{FailureHandler, LogFailureHandler, LogResultSink, ResultSink};
use crate::poll_loop::PollLoop;
use crate::session::{PollSession, PollStats, SessionMonitor, SessionSnapshot};

/// Result of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new session was spawned.
    Started { session_id: u64 },
    /// The job already had a live session and the policy is `Ignore`.
    AlreadyRunning { session_id: u64 },
    /// Live sessions were cancelled and a new one spawned.
    Restarted { session_id: u64, replaced: usize },
}

impl TriggerOutcome {
    pub fn session_id(&self) -> u64 {
        match *self {
            Self::Started { session_id }
            | Self::AlreadyRunning { session_id }
            | Self::Restarted { session_id, .. } => session_id,
        }
    }
}

/// Handle to one spawned poll session.
#[derive(Debug)]
pub struct PollHandle {
    pub session_id: u64,
    cancel: CancellationToken,
    monitor: SessionMonitor,
    join: JoinHandle<PollStats>,
}

impl PollHandle {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.monitor.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancel and wait for the loop to return its counters.
    pub async fn stop(self) -> PollStats {
        self.cancel.cancel();
        self.join.await.unwrap_or_else(|e| {
            tracing::error!(session = self.session_id, error = %e, "poll task panicked");
            self.monitor.snapshot().stats
        })
    }
}

/// Spawns poll sessions on trigger and retains their handles per job.
pub struct Supervisor {
    registry: Arc<JobRegistry>,
    transport: Arc<dyn RpcTransport>,
    sink: Arc<dyn ResultSink>,
    failures: Arc<dyn FailureHandler>,
    config: PollerConfig,
    root: CancellationToken,
    next_session: AtomicU64,
    sessions: Mutex<HashMap<String, Vec<PollHandle>>>,
}

impl Supervisor {
    pub fn new(
        registry: Arc<JobRegistry>,
        transport: Arc<dyn RpcTransport>,
        config: PollerConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            sink: Arc::new(LogResultSink),
            failures: Arc::new(LogFailureHandler),
            config,
            root: CancellationToken::new(),
            next_session: AtomicU64::new(0),
            sessions: Mutex::new(HashMap::new()),
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

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Start polling `job_id`, honoring the configured [`DuplicatePolicy`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn trigger(&self, job_id: &str) -> Result<TriggerOutcome, DispatchError> {
        let job = self
            .registry
            .get(job_id)
            .ok_or_else(|| DispatchError::UnknownJob(job_id.to_string()))?;
        job.filter.ensure_block_range()?;

        // Checked under the lock: `shutdown` cancels before it drains.
        let mut sessions = self.lock_sessions();
        if self.root.is_cancelled() {
            return Err(DispatchError::ShuttingDown);
        }
        let handles = sessions.entry(job_id.to_string()).or_default();
        handles.retain(|h| !h.is_finished());

        let mut replaced = None;
        if let Some(live) = handles.last() {
            match self.config.duplicate_policy {
                DuplicatePolicy::Ignore => {
                    tracing::info!(
                        job = job_id,
                        session = live.session_id,
                        "session already running, trigger ignored"
                    );
                    return Ok(TriggerOutcome::AlreadyRunning {
                        session_id: live.session_id,
                    });
                }
                DuplicatePolicy::Restart => {
                    let old = std::mem::take(handles);
                    for h in &old {
                        tracing::info!(job = job_id, session = h.session_id, "restarting session");
                        h.cancel.cancel();
                    }
                    replaced = Some(old.len());
                }
                DuplicatePolicy::Allow => {}
            }
        }

        let session_id = self.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        let session = PollSession::new(job_id, session_id, job.filter.clone());
        let monitor = session.monitor();
        let cancel = self.root.child_token();
        let poll_loop = PollLoop::new(session, Arc::clone(&self.transport), &self.config)
            .with_sink(Arc::clone(&self.sink))
            .with_failure_handler(Arc::clone(&self.failures));
        let join = tokio::spawn(poll_loop.run(cancel.clone()));

        handles.push(PollHandle {
            session_id,
            cancel,
            monitor,
            join,
        });

        Ok(match replaced {
            Some(replaced) => TriggerOutcome::Restarted { session_id, replaced },
            None => TriggerOutcome::Started { session_id },
        })
    }

    /// Snapshots of the live sessions of `job_id`, oldest first.
    pub fn sessions(&self, job_id: &str) -> Vec<(u64, SessionSnapshot)> {
        self.lock_sessions()
            .get(job_id)
            .map(|handles| {
                handles
                    .iter()
                    .filter(|h| !h.is_finished())
                    .map(|h| (h.session_id, h.snapshot()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of live sessions across all jobs.
    pub fn active_sessions(&self) -> usize {
        self.lock_sessions()
            .values()
            .flatten()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Stop every session of `job_id` and wait for them.
    pub async fn stop(&self, job_id: &str) -> Vec<PollStats> {
        let handles = self.lock_sessions().remove(job_id).unwrap_or_default();
        futures::future::join_all(handles.into_iter().map(PollHandle::stop)).await
    }

    /// Cancel all sessions, refuse further triggers, and wait for the tasks.
    pub async fn shutdown(&self) -> Vec<PollStats> {
        self.root.cancel();
        let handles: Vec<PollHandle> = self
            .lock_sessions()
            .drain()
            .flat_map(|(_, handles)| handles)
            .collect();
        tracing::info!(sessions = handles.len(), "stopping all poll sessions");
        futures::future::join_all(handles.into_iter().map(PollHandle::stop)).await
    }

    pub fn is_shutting_down(&self) -> bool {
        self.root.is_cancelled()
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<String, Vec<PollHandle>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use chainpoll_core::error::TransportError;
    use chainpoll_core::job::JobDescriptor;

    const JOB: &str = "6ba16cd62b8b4114b95449e35800cba0";

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RpcTransport for CountingTransport {
        async fn post(&self, _body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(br#"{"jsonrpc":"2.0","id":1,"result":[]}"#.to_vec())
        }
        fn url(&self) -> &str {
            "mock://counting"
        }
    }

    fn supervisor(policy: DuplicatePolicy) -> (Supervisor, Arc<CountingTransport>) {
        let registry = Arc::new(JobRegistry::build(JobDescriptor::builtin()).unwrap());
        let transport = Arc::new(CountingTransport::default());
        let config = PollerConfig {
            poll_interval_ms: 100,
            duplicate_policy: policy,
            ..Default::default()
        };
        (Supervisor::new(registry, transport.clone(), config), transport)
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_job_rejected() {
        let (sup, _) = supervisor(DuplicatePolicy::Ignore);
        assert_eq!(
            sup.trigger("nope").unwrap_err(),
            DispatchError::UnknownJob("nope".into())
        );
        assert_eq!(sup.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ignore_policy_keeps_single_session() {
        let (sup, _) = supervisor(DuplicatePolicy::Ignore);
        let first = sup.trigger(JOB).unwrap();
        assert_eq!(first, TriggerOutcome::Started { session_id: 1 });
        let second = sup.trigger(JOB).unwrap();
        assert_eq!(second, TriggerOutcome::AlreadyRunning { session_id: 1 });
        assert_eq!(sup.active_sessions(), 1);
        sup.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn restart_policy_replaces_session() {
        let (sup, _) = supervisor(DuplicatePolicy::Restart);
        sup.trigger(JOB).unwrap();
        let outcome = sup.trigger(JOB).unwrap();
        assert!(matches!(outcome, TriggerOutcome::Restarted { session_id: 2, .. }));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let live = sup.sessions(JOB);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].0, 2);
        sup.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn allow_policy_runs_concurrent_sessions() {
        let (sup, transport) = supervisor(DuplicatePolicy::Allow);
        sup.trigger(JOB).unwrap();
        sup.trigger(JOB).unwrap();
        assert_eq!(sup.sessions(JOB).len(), 2);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);

        let stats = sup.stop(JOB).await;
        assert_eq!(stats.len(), 2);
        assert!(stats.iter().all(|s| s.polls == 1));
        assert_eq!(sup.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_poll_independently() {
        let (sup, transport) = supervisor(DuplicatePolicy::Ignore);
        for job in sup.registry().iter().map(|j| j.id().to_string()).collect::<Vec<_>>() {
            sup.trigger(&job).unwrap();
        }
        assert_eq!(sup.active_sessions(), 3);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 6);
        sup.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_everything_and_refuses_triggers() {
        let (sup, transport) = supervisor(DuplicatePolicy::Allow);
        sup.trigger(JOB).unwrap();
        sup.trigger("e21f90744a6f4b44bc00086d30717777").unwrap();

        let stats = sup.shutdown().await;
        assert_eq!(stats.len(), 2);
        assert!(sup.is_shutting_down());
        assert_eq!(sup.active_sessions(), 0);
        assert_eq!(sup.trigger(JOB).unwrap_err(), DispatchError::ShuttingDown);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_during_shutdown_keeps_no_handle() {
        let (sup, transport) = supervisor(DuplicatePolicy::Allow);
        // First step of `shutdown`, before the map is drained.
        sup.root.cancel();
        assert_eq!(sup.trigger(JOB).unwrap_err(), DispatchError::ShuttingDown);
        assert!(sup.lock_sessions().is_empty());

        assert!(sup.shutdown().await.is_empty());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_after_stop_starts_fresh_session() {
        let (sup, _) = supervisor(DuplicatePolicy::Ignore);
        sup.trigger(JOB).unwrap();
        sup.stop(JOB).await;
        let outcome = sup.trigger(JOB).unwrap();
        assert_eq!(outcome, TriggerOutcome::Started { session_id: 2 });
        sup.shutdown().await;
    }
}
