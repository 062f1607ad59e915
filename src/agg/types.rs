use serde::Serialize;

use crate::ingestion::{FetchError, IngestReport};
use crate::store::{Feed, StoreError};

/// What one scheduler tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// Nothing was due (or there are no feeds).
    Idle,
    Ingested { feed: Feed, report: IngestReport },
    /// The feed stays claimed and is retried on its next turn.
    FetchFailed { feed: Feed, error: FetchError },
    WriteFailed { feed: Feed, error: StoreError },
    ClaimFailed(StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub ticks: u64,
    pub idle: u64,
    pub feeds_ingested: u64,
    pub posts_inserted: usize,
    pub posts_skipped: usize,
    pub fetch_failures: u64,
    pub write_failures: u64,
    pub claim_failures: u64,
}

impl RunStats {
    pub fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Idle => self.idle += 1,
            TickOutcome::Ingested { report, .. } => {
                self.feeds_ingested += 1;
                self.posts_inserted += report.inserted;
                self.posts_skipped += report.skipped;
            }
            TickOutcome::FetchFailed { .. } => self.fetch_failures += 1,
            TickOutcome::WriteFailed { .. } => self.write_failures += 1,
            TickOutcome::ClaimFailed(_) => self.claim_failures += 1,
        }
    }

    pub fn merge(mut self, other: RunStats) -> RunStats {
        self.ticks += other.ticks;
        self.idle += other.idle;
        self.feeds_ingested += other.feeds_ingested;
        self.posts_inserted += other.posts_inserted;
        self.posts_skipped += other.posts_skipped;
        self.fetch_failures += other.fetch_failures;
        self.write_failures += other.write_failures;
        self.claim_failures += other.claim_failures;
        self
    }

    pub fn failures(&self) -> u64 {
        self.fetch_failures + self.write_failures + self.claim_failures
    }
}

#[derive(Serialize)]
pub struct AggResult {
    pub interval_ms: u128,
    pub workers: usize,
    pub stats: RunStats,
}
