//! Oldest-fetched-first polling loop.
//!
//! Each tick claims exactly one feed (never-fetched first, then the stalest)
//! and runs it through fetch → normalize → ingest. The claim is stamped
//! before the fetch, so a slow or broken feed still counts as visited and
//! comes back around at the normal cadence. Nothing is cached across ticks.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::ingestion::{self, sanitize, FeedSource};
use crate::store::Store;
use crate::telemetry::{self};
use crate::telemetry::ops::agg::Phase as AggPhase;
use crate::util::time::to_chrono;

use super::types::{RunStats, TickOutcome};

pub struct Scheduler<'a, S, F> {
    store: &'a S,
    source: &'a F,
    interval: Duration,
    worker: usize,
}

impl<'a, S: Store, F: FeedSource> Scheduler<'a, S, F> {
    pub fn new(store: &'a S, source: &'a F, interval: Duration) -> Self {
        Self { store, source, interval, worker: 0 }
    }

    pub fn with_worker(mut self, worker: usize) -> Self {
        self.worker = worker;
        self
    }

    // A feed stamped within the last half interval belongs to this cycle
    // already; racing workers move on to the next one instead.
    fn min_age(&self) -> chrono::Duration {
        to_chrono(self.interval / 2)
    }

    pub async fn tick(&self, now: DateTime<Utc>) -> TickOutcome {
        let log = telemetry::agg();

        let claimed = self
            .store
            .claim_next_feed(now, self.min_age())
            .instrument(log.span(&AggPhase::Claim))
            .await;
        let feed = match claimed {
            Ok(Some(feed)) => feed,
            Ok(None) => return TickOutcome::Idle,
            Err(error) => return TickOutcome::ClaimFailed(error),
        };
        log.info_kv("📥 fetching", [("feed", feed.name.clone()), ("url", feed.url.clone())]);

        let raw = match self.source.fetch(&feed.url).instrument(log.span(&AggPhase::Fetch)).await {
            Ok(raw) => raw,
            Err(error) => return TickOutcome::FetchFailed { feed, error },
        };

        let doc = {
            let _s = log.span(&AggPhase::Normalize).entered();
            sanitize::normalize(raw, now)
        };

        match ingestion::ingest(self.store, &feed, &doc).instrument(log.span(&AggPhase::Write)).await {
            Ok(report) => TickOutcome::Ingested { feed, report },
            Err(error) => TickOutcome::WriteFailed { feed, error },
        }
    }

    /// Tick immediately, then every `interval`, until `cancel` fires.
    ///
    /// Cancellation is only observed between ticks; a tick in flight runs to
    /// completion (the fetch is bounded by the fetcher's own timeout).
    pub async fn run(&self, cancel: &CancellationToken) -> RunStats {
        let log = telemetry::agg();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = RunStats::default();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log.info_kv("🛑 stop requested", [("worker", self.worker.to_string())]);
                    break;
                }
                _ = ticker.tick() => {}
            }
            let outcome = self
                .tick(Utc::now())
                .instrument(log.span_kv(&AggPhase::Tick, [("worker", self.worker.to_string())]))
                .await;
            log_outcome(&outcome);
            stats.record(&outcome);
        }
        stats
    }
}

fn log_outcome(outcome: &TickOutcome) {
    let log = telemetry::agg();
    match outcome {
        TickOutcome::Idle => log.debug("💤 no feed due"),
        TickOutcome::Ingested { feed, report } => log.feed_summary(&feed.url, report),
        TickOutcome::FetchFailed { feed, error } => {
            log.warn_kv("⚠️ fetch failed", [("url", feed.url.clone()), ("error", error.to_string())])
        }
        TickOutcome::WriteFailed { feed, error } => {
            log.warn_kv("⚠️ write failed", [("url", feed.url.clone()), ("error", error.to_string())])
        }
        TickOutcome::ClaimFailed(error) => {
            log.warn_kv("⚠️ claim failed, retrying next tick", [("error", error.to_string())])
        }
    }
}
