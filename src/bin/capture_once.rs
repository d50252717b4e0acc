//! Run a single capture pass and print what it did.
//!
//! Usage: capture_once [--dry-run]
//!
//! With `--dry-run` pages are written to an in-memory store instead of the
//! database, starting from the beginning of the feed. The database settings
//! (`DATABASE_URL` or `MYSQL_*`) are only required without it.

use anyhow::Context;
use listing_capture::capture::{CaptureOptions, CaptureOrchestrator, RunSummary};
use listing_capture::config::Config;
use listing_capture::db::{Db, MemoryStore};
use listing_capture::feed::ReservoirClient;
use listing_capture::logging::init;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let dry_run = std::env::args().any(|arg| arg == "--dry-run");
    let config = Config::from_env().context("loading configuration")?;
    let client = ReservoirClient::new(&config.feed).context("building feed client")?;
    let options = CaptureOptions::from(&config.capture);

    let summary = if dry_run {
        let orchestrator =
            CaptureOrchestrator::new(client, MemoryStore::new(), config.feed.page_limit, options);
        let summary = orchestrator.run_once().await.context("capture run failed")?;
        println!("Tokens priced in memory: {}", orchestrator.store().prices.len());
        summary
    } else {
        let database = config.database().context("database settings")?;
        let db = Db::new(&database.url)
            .await
            .context("connecting to database")?;
        db.create_tables().await.context("creating tables")?;
        let orchestrator = CaptureOrchestrator::new(client, db, config.feed.page_limit, options);
        orchestrator.run_once().await.context("capture run failed")?
    };

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Pages:          {}", summary.pages);
    println!("Activities:     {}", summary.activities);
    println!("Price facts:    {}", summary.price_facts);
    println!("Rejected:       {}", summary.rejected);
    println!("Skipped events: {}", summary.skipped_events);
}
