//! Trigger server.
//!
//! `/trigger/<job-id>` accepts any method. A registered id is handed to the
//! [`Supervisor`] and answered with an empty `200` whatever the outcome; an
//! id that is not registered gets `404`. The id is percent-decoded before the
//! lookup, so any configured string can be triggered.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};

use chainpoll_poller::{DispatchError, Supervisor};

pub const TRIGGER_PREFIX: &str = "/trigger/";

/// Build the router for the supervisor's registry.
pub fn router(supervisor: Arc<Supervisor>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/trigger/:id", any(trigger))
        .with_state(supervisor)
}

async fn trigger(
    State(supervisor): State<Arc<Supervisor>>,
    Path(job_id): Path<String>,
) -> StatusCode {
    match supervisor.trigger(&job_id) {
        Ok(outcome) => tracing::info!(job = %job_id, ?outcome, "trigger received"),
        Err(DispatchError::UnknownJob(_)) => {
            tracing::debug!(job = %job_id, "trigger for unregistered job");
            return StatusCode::NOT_FOUND;
        }
        Err(e) => tracing::warn!(job = %job_id, error = %e, "trigger rejected"),
    }
    StatusCode::OK
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "chainpoll" }))
}

/// Serve until `shutdown` resolves, then stop every poll session.
pub async fn run(
    listen_addr: &str,
    supervisor: Arc<Supervisor>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    tracing::info!(
        addr = %listener.local_addr().context("reading bound address")?,
        jobs = supervisor.registry().len(),
        "trigger server listening"
    );

    axum::serve(listener, router(Arc::clone(&supervisor)))
        .with_graceful_shutdown(shutdown)
        .await
        .context("trigger server failed")?;

    let stats = supervisor.shutdown().await;
    tracing::info!(sessions = stats.len(), "all poll sessions stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Ctrl-C received, shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chainpoll_core::error::TransportError;
    use chainpoll_core::job::{JobDescriptor, JobRegistry};
    use chainpoll_core::transport::RpcTransport;
    use chainpoll_core::types::BlockNumberOrTag;
    use chainpoll_poller::PollerConfig;

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

    const JOB: &str = "6ba16cd62b8b4114b95449e35800cba0";

    async fn start() -> (String, Arc<Supervisor>) {
        start_with(JobDescriptor::builtin()).await
    }

    async fn start_with(jobs: Vec<JobDescriptor>) -> (String, Arc<Supervisor>) {
        let registry = Arc::new(JobRegistry::build(jobs).unwrap());
        let config = PollerConfig {
            poll_interval_ms: 60_000,
            ..Default::default()
        };
        let supervisor = Arc::new(Supervisor::new(
            registry,
            Arc::new(CountingTransport::default()),
            config,
        ));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::clone(&supervisor));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), supervisor)
    }

    fn job(id: &str) -> JobDescriptor {
        JobDescriptor::new(
            id,
            vec!["0x291D46AE055Dd592B8CC7DdBF232cc206CEfa975".into()],
            BlockNumberOrTag::Number(0x35e8e0c),
            BlockNumberOrTag::Latest,
        )
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (base, _) = start().await;
        let resp = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "status": "ok", "service": "chainpoll" }));
    }

    #[tokio::test]
    async fn trigger_starts_session_with_empty_200() {
        let (base, supervisor) = start().await;
        let resp = reqwest::get(format!("{base}{TRIGGER_PREFIX}{JOB}")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.bytes().await.unwrap().is_empty());
        assert_eq!(supervisor.sessions(JOB).len(), 1);
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn any_method_triggers() {
        let (base, supervisor) = start().await;
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{base}{TRIGGER_PREFIX}e21f90744a6f4b44bc00086d30717777"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let resp = client
            .delete(format!("{base}{TRIGGER_PREFIX}09d1e90f9eaa48ad8042f9e255b21984"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(supervisor.active_sessions(), 2);
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_job_is_not_routed() {
        let (base, supervisor) = start().await;
        let resp = reqwest::get(format!("{base}{TRIGGER_PREFIX}nope")).await.unwrap();
        assert_eq!(resp.status(), 404);
        assert_eq!(supervisor.active_sessions(), 0);
    }

    #[tokio::test]
    async fn trigger_after_shutdown_still_answers_200() {
        let (base, supervisor) = start().await;
        supervisor.shutdown().await;
        let resp = reqwest::get(format!("{base}{TRIGGER_PREFIX}{JOB}")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(supervisor.active_sessions(), 0);
    }

    #[tokio::test]
    async fn colon_id_is_matched_literally() {
        let (base, supervisor) = start_with(vec![job(":job")]).await;

        let resp = reqwest::get(format!("{base}{TRIGGER_PREFIX}not-a-registered-job"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        assert_eq!(supervisor.sessions(":job").len(), 0);

        let resp = reqwest::get(format!("{base}{TRIGGER_PREFIX}:job")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(supervisor.sessions(":job").len(), 1);
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn percent_encoded_id_is_decoded() {
        let (base, supervisor) = start_with(vec![job("my job"), job("a/b")]).await;

        let resp = reqwest::get(format!("{base}{TRIGGER_PREFIX}my%20job")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(supervisor.sessions("my job").len(), 1);

        let resp = reqwest::get(format!("{base}{TRIGGER_PREFIX}a%2Fb")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(supervisor.sessions("a/b").len(), 1);
        supervisor.shutdown().await;
    }
}
