use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::capture::{CaptureOptions, CaptureOrchestrator, CapturedBatch};
use crate::config::Config;
use crate::db::{Db, Store};
use crate::error::{Error, Result};
use crate::feed::{FeedSource, ReservoirClient};
use crate::logging::report_error;

const BATCH_CHANNEL_CAPACITY: usize = 100;

pub async fn run(config: Config) -> Result<()> {
    info!("🏷️  Listing capture started");
    info!("================================");

    info!("Feed: {} (page limit {})", config.feed.api_url, config.feed.page_limit);
    info!(
        "Stream: {} | cursor mode: {} | seed from store: {} | interval: {}s",
        config.capture.stream,
        config.capture.cursor_mode.as_str(),
        config.capture.seed_from_store,
        config.capture.interval.as_secs()
    );

    let db = Db::new(&config.database()?.url).await?;
    db.create_tables().await?;

    let client = ReservoirClient::new(&config.feed)?;
    let mut orchestrator = CaptureOrchestrator::new(
        client,
        db,
        config.feed.page_limit,
        CaptureOptions::from(&config.capture),
    );

    let batch_rx = orchestrator.subscribe(BATCH_CHANNEL_CAPACITY);
    let batch_handle = tokio::spawn(log_batches(batch_rx));

    schedule(&orchestrator, config.capture.interval).await;

    drop(orchestrator);
    finish_listener(batch_handle).await;

    info!("Listing capture stopped");
    Ok(())
}

/// Call `run_once` on every tick until ctrl-c. The first tick fires immediately.
///
/// Ticks are awaited in-line, so a run never overlaps the next one; a slow run
/// delays the following tick instead of stacking runs.
pub async fn schedule<F: FeedSource, S: Store>(
    orchestrator: &CaptureOrchestrator<F, S>,
    period: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping scheduler");
                break;
            }
            _ = ticker.tick() => {
                match orchestrator.run_once().await {
                    Ok(summary) => debug!("Run finished: {:?}", summary),
                    Err(Error::RunInProgress) => warn!("Previous capture still running, skipping tick"),
                    Err(e) => report_error(&e),
                }
            }
        }
    }
}

/// Wait for a listener task to drain. Returns false if it panicked or was cancelled.
async fn finish_listener(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Batch listener task failed: {}", e);
            false
        }
    }
}

async fn log_batches(mut rx: mpsc::Receiver<Arc<CapturedBatch>>) {
    while let Some(batch) = rx.recv().await {
        let cleared = batch
            .price_facts
            .iter()
            .filter(|f| f.current_price.is_none())
            .count();
        info!(
            "Page {}: {} listings, {} tokens priced, {} cleared",
            batch.page,
            batch.activities.len(),
            batch.price_facts.len() - cleared,
            cleared
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listener_panic_is_reported_not_swallowed() {
        let handle = tokio::spawn(async { panic!("listener blew up") });

        assert!(!finish_listener(handle).await);
    }

    #[tokio::test]
    async fn drained_listener_finishes_cleanly() {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(log_batches(rx));
        drop(tx);

        assert!(finish_listener(handle).await);
    }
}
