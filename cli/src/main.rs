//! ChainPoll CLI: trigger server and tooling for Chainlink `OracleRequest`
//! log polling.
//!
//! # Commands
//! ```text
//! chainpoll serve   [--config FILE] [--listen ADDR] [--rpc-url URL]
//! chainpoll jobs    [--config FILE] [--json]
//! chainpoll topic   <IDENTIFIER>
//! chainpoll request --job <ID> [--config FILE]
//! chainpoll poll    --job <ID> [--config FILE] [--rpc-url URL] [--count N]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use chainpoll_core::job::JobRegistry;
use chainpoll_core::request::{encode_request, METHOD_GET_LOGS};
use chainpoll_core::topic::{encode_as_topic, oracle_request_topic};
use chainpoll_http::{HttpClientConfig, HttpRpcClient};
use chainpoll_poller::poll_loop::REQUEST_ID;
use chainpoll_poller::{PollLoop, PollSession, Supervisor};

mod config;
mod logging;
mod server;

use config::AppConfig;

#[derive(Parser)]
#[command(
    name = "chainpoll",
    about = "Poll EVM nodes for Chainlink OracleRequest logs, one loop per triggered job",
    long_about = "
ChainPoll: per-job eth_getLogs polling for Chainlink OracleRequest events.
Each job is started by an HTTP hit on /trigger/<job-id> and polls until shutdown.

ENVIRONMENT VARIABLES:
  CHAINPOLL_RPC_URL   JSON-RPC endpoint, overrides poller.rpc_url
  RUST_LOG            tracing filter, overrides the log section
",
    version
)]
struct Cli {
    /// Path to the YAML config file (default: ./chainpoll.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trigger server until Ctrl-C
    Serve {
        /// Bind address, overrides listen_addr
        #[arg(long)]
        listen: Option<String>,
        /// JSON-RPC endpoint
        #[arg(long, env = "CHAINPOLL_RPC_URL")]
        rpc_url: Option<String>,
    },

    /// List registered jobs and their topics
    Jobs {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the bytes32 topic encoding of an identifier
    Topic {
        identifier: String,
    },

    /// Print the exact eth_getLogs request body for a job
    Request {
        #[arg(long)]
        job: String,
    },

    /// Poll one job in the foreground
    Poll {
        #[arg(long)]
        job: String,
        /// JSON-RPC endpoint
        #[arg(long, env = "CHAINPOLL_RPC_URL")]
        rpc_url: Option<String>,
        /// Stop after N requests (default: until Ctrl-C)
        #[arg(long)]
        count: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Topic { identifier } => {
            println!("{}", encode_as_topic(&identifier));
            Ok(())
        }
        Commands::Jobs { json } => {
            let cfg = AppConfig::load(cli.config.as_deref())?;
            cmd_jobs(&build_registry(&cfg)?, json)
        }
        Commands::Request { job } => {
            let cfg = AppConfig::load(cli.config.as_deref())?;
            cmd_request(&build_registry(&cfg)?, &job)
        }
        Commands::Serve { listen, rpc_url } => {
            let cfg = AppConfig::load(cli.config.as_deref())?.with_overrides(rpc_url, listen);
            logging::init_tracing(&cfg.log);
            cmd_serve(cfg).await
        }
        Commands::Poll { job, rpc_url, count } => {
            let cfg = AppConfig::load(cli.config.as_deref())?.with_overrides(rpc_url, None);
            logging::init_tracing(&cfg.log);
            cmd_poll(cfg, &job, count).await
        }
    }
}

fn build_registry(cfg: &AppConfig) -> Result<JobRegistry> {
    JobRegistry::build(cfg.jobs.iter().cloned()).context("building job registry")
}

fn transport(cfg: &AppConfig) -> Result<Arc<HttpRpcClient>> {
    let client = HttpRpcClient::new(
        cfg.poller.rpc_url.clone(),
        HttpClientConfig {
            request_timeout: cfg.poller.request_timeout(),
        },
    )
    .context("creating HTTP transport")?;
    Ok(Arc::new(client))
}

fn cmd_jobs(registry: &JobRegistry, json: bool) -> Result<()> {
    if json {
        let jobs: Vec<_> = registry
            .iter()
            .map(|job| json!({ "id": job.id(), "filter": job.filter }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    println!("event topic: {}", oracle_request_topic());
    println!();
    for job in registry.iter() {
        let d = &job.descriptor;
        println!("{}", job.id());
        println!("  topic:     {}", encode_as_topic(job.id()));
        println!("  range:     {} .. {}", d.from_block, d.to_block);
        for address in &job.filter.addresses {
            println!("  address:   {address}");
        }
    }
    Ok(())
}

fn cmd_request(registry: &JobRegistry, job_id: &str) -> Result<()> {
    let job = registry
        .get(job_id)
        .ok_or_else(|| anyhow!("job '{job_id}' is not registered"))?;
    let body = encode_request(METHOD_GET_LOGS, &job.filter, REQUEST_ID)?;
    println!("{}", String::from_utf8(body)?);
    Ok(())
}

async fn cmd_serve(cfg: AppConfig) -> Result<()> {
    let registry = Arc::new(build_registry(&cfg)?);
    tracing::info!(
        rpc = %cfg.poller.rpc_url,
        jobs = registry.len(),
        interval_ms = cfg.poller.poll_interval_ms,
        policy = ?cfg.poller.duplicate_policy,
        "starting chainpoll"
    );
    let supervisor = Arc::new(Supervisor::new(registry, transport(&cfg)?, cfg.poller.clone()));
    server::run(&cfg.listen_addr, supervisor, server::ctrl_c()).await
}

async fn cmd_poll(cfg: AppConfig, job_id: &str, count: Option<u64>) -> Result<()> {
    let registry = build_registry(&cfg)?;
    let job = registry
        .get(job_id)
        .ok_or_else(|| anyhow!("job '{job_id}' is not registered"))?;
    job.filter.ensure_block_range()?;

    let session = PollSession::new(job_id, 1, job.filter.clone());
    let mut poll_loop = PollLoop::new(session, transport(&cfg)?, &cfg.poller);
    if let Some(n) = count {
        poll_loop = poll_loop.with_max_polls(n);
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        server::ctrl_c().await;
        on_signal.cancel();
    });

    let stats = poll_loop.run(cancel).await;
    println!(
        "polls: {}  results: {}  failures: {} (transport {}, malformed {}, rpc {})",
        stats.polls,
        stats.results,
        stats.failures(),
        stats.transport_failures,
        stats.malformed_responses,
        stats.rpc_errors,
    );
    Ok(())
}
