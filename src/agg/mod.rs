use anyhow::{bail, Context, Result};
use clap::Args;
use futures::future::join_all;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::ingestion::fetch::{Fetcher, DEFAULT_TIMEOUT};
use crate::output::types::Meta;
use crate::store::Store;
use crate::telemetry::{self, emit};
use crate::telemetry::ops::agg::Phase as AggPhase;
use crate::util::time::parse_interval;

pub mod scheduler;
pub mod types;

pub use scheduler::Scheduler;
use types::{AggResult, RunStats};

/// gator agg <interval>
#[derive(Args, Debug)]
pub struct AggCmd {
    /// Time between requests, e.g. 30s, 1m, 1h
    pub interval: String,
    /// Concurrent workers sharing the feed set
    #[arg(long, default_value_t = 1)]
    pub workers: usize,
    /// Per-request timeout for feed downloads (default: 10s)
    #[arg(long)]
    pub timeout: Option<String>,
}

pub async fn run<S: Store>(store: &S, args: AggCmd) -> Result<()> {
    let log = telemetry::agg();
    let interval = parse_interval(&args.interval)?;
    let timeout = match &args.timeout {
        Some(t) => parse_interval(t).context("--timeout")?,
        None => DEFAULT_TIMEOUT,
    };
    if args.workers == 0 { bail!("--workers must be at least 1"); }
    let run_id = Uuid::new_v4().to_string();
    let _g = log.root_span_kv([
        ("interval", args.interval.clone()),
        ("workers", args.workers.to_string()),
        ("timeout_ms", timeout.as_millis().to_string()),
        ("run_id", run_id.clone()),
    ]).entered();

    let fetcher = Fetcher::new(timeout).context("building HTTP client")?;
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() { cancel.cancel(); }
        }
    });

    log.info(format!("🔁 Collecting feeds every {} with {} worker(s); Ctrl-C to stop", args.interval, args.workers));
    let t0 = Instant::now();
    let workers = (0..args.workers).map(|w| {
        let sched = Scheduler::new(store, &fetcher, interval).with_worker(w);
        let cancel = &cancel;
        let span = log.span_kv(&AggPhase::Worker, [("worker", w.to_string())]);
        async move { sched.run(cancel).await }.instrument(span)
    });
    let stats = join_all(workers).await.into_iter().fold(RunStats::default(), RunStats::merge);

    log.totals(stats.ticks, stats.idle, stats.posts_inserted, stats.failures());
    if telemetry::config::json_mode() {
        let result = AggResult { interval_ms: interval.as_millis(), workers: args.workers, stats };
        let meta = Meta { duration_ms: Some(t0.elapsed().as_millis()), run_id: Some(run_id) };
        emit::print_result("agg", &result, Some(meta))?;
    }
    Ok(())
}
