use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::Instrument;

use crate::telemetry;
use crate::telemetry::ops::init::Phase as InitPhase;

#[derive(Serialize)]
struct InitResult {
    migrations: usize,
}

pub async fn connect(dsn: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(dsn)
        .await
        .context("connecting to database")
}

pub async fn run(dsn: &str) -> Result<()> {
    let log = telemetry::init();
    let _g = log.root_span().entered();
    let pool = connect(dsn).instrument(log.span(&InitPhase::Connect)).await?;

    // Apply any pending migrations (idempotent)
    let migrator = sqlx::migrate!();
    migrator
        .run(&pool)
        .instrument(log.span(&InitPhase::Migrate))
        .await
        .context("applying migrations")?;

    log.info("✅ Database initialized successfully");
    if telemetry::config::json_mode() {
        log.result(&InitResult { migrations: migrator.iter().count() })?;
    }
    Ok(())
}
