//! Capture run: fetch a page, derive prices, persist, checkpoint, repeat

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::aggregator::{PriceAggregator, PriceFact};
use crate::checkpoint::{CheckpointManager, Cursor};
use crate::config::{CaptureConfig, CursorMode};
use crate::db::Store;
use crate::error::{Error, Result};
use crate::feed::{Activity, FeedSource, FetchedPage, NftKey, PaginatedFetcher, SortDirection};
use crate::state::{CapturePhase, RunGuard};

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub stream: String,
    pub cursor_mode: CursorMode,
    pub seed_from_store: bool,
}

impl From<&CaptureConfig> for CaptureOptions {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            stream: config.stream.clone(),
            cursor_mode: config.cursor_mode,
            seed_from_store: config.seed_from_store,
        }
    }
}

/// A persisted page, as handed to batch listeners.
#[derive(Debug, Clone)]
pub struct CapturedBatch {
    pub page: usize,
    pub activities: Vec<Activity>,
    pub price_facts: Vec<PriceFact>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: usize,
    pub activities: usize,
    pub price_facts: usize,
    pub rejected: usize,
    pub skipped_events: usize,
}

pub struct CaptureOrchestrator<F, S> {
    fetcher: PaginatedFetcher<F>,
    aggregator: PriceAggregator,
    store: S,
    options: CaptureOptions,
    guard: RunGuard,
    listeners: Vec<mpsc::Sender<Arc<CapturedBatch>>>,
}

impl<F: FeedSource, S: Store> CaptureOrchestrator<F, S> {
    pub fn new(source: F, store: S, page_limit: u32, options: CaptureOptions) -> Self {
        let sort_direction = match options.cursor_mode {
            CursorMode::Continuation => SortDirection::Asc,
            CursorMode::Boundary => SortDirection::Desc,
        };

        Self {
            fetcher: PaginatedFetcher::new(source, page_limit, sort_direction),
            aggregator: PriceAggregator::new(),
            store,
            options,
            guard: RunGuard::new(),
            listeners: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn run_guard(&self) -> RunGuard {
        self.guard.clone()
    }

    /// Receive every persisted page. A slow listener misses batches rather than stalling capture.
    pub fn subscribe(&mut self, capacity: usize) -> mpsc::Receiver<Arc<CapturedBatch>> {
        let (tx, rx) = mpsc::channel(capacity);
        self.listeners.push(tx);
        rx
    }

    /// Capture until the feed has nothing more for this run.
    ///
    /// Rejected with [`Error::RunInProgress`] while another run is active. On
    /// failure the checkpoint stays at the last fully persisted page.
    pub async fn run_once(&self) -> Result<RunSummary> {
        let _permit = self.guard.try_acquire().ok_or(Error::RunInProgress)?;
        let stream = self.options.stream.as_str();

        let mut phase = CapturePhase::Idle;
        let mut summary = RunSummary::default();

        match self.capture(&mut phase, &mut summary).await {
            Ok(()) => {
                self.enter(&mut phase, CapturePhase::Done);
                info!(
                    "[{}] Capture complete: {} pages, {} activities, {} price facts, {} rejected",
                    stream, summary.pages, summary.activities, summary.price_facts, summary.rejected
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(
                    "[{}] Capture failed while {} after {} pages",
                    stream,
                    phase.as_str(),
                    summary.pages
                );
                self.enter(&mut phase, CapturePhase::Failed);
                Err(e)
            }
        }
    }

    async fn capture(&self, phase: &mut CapturePhase, summary: &mut RunSummary) -> Result<()> {
        let checkpoint = CheckpointManager::new(&self.store, &self.options.stream);
        let stored = checkpoint.load().await?.unwrap_or_default();

        let (mut continuation, stop_event_id) = match self.options.cursor_mode {
            CursorMode::Continuation => (stored.continuation.clone(), None),
            CursorMode::Boundary => (None, stored.last_event_id.clone()),
        };
        let mut newest_event_id = match self.options.cursor_mode {
            CursorMode::Continuation => stored.last_event_id.clone(),
            CursorMode::Boundary => None,
        };
        // newest first: a token written by an earlier page must not be overwritten by an older one
        let mut written: BTreeMap<NftKey, DateTime<Utc>> = BTreeMap::new();

        loop {
            self.enter(phase, CapturePhase::Fetching);
            let page = self
                .fetcher
                .fetch_next_page(continuation.as_deref(), stop_event_id.as_deref())
                .await?;

            self.enter(phase, CapturePhase::Aggregating);
            let mut facts = self.aggregate(&page).await?;
            if self.options.cursor_mode == CursorMode::Boundary {
                facts = drop_superseded(facts, &mut written);
            }

            self.enter(phase, CapturePhase::Persisting);
            self.store.insert_activities(&page.activities).await?;
            self.store.upsert_price_facts(&facts).await?;

            summary.pages += 1;
            summary.activities += page.activities.len();
            summary.price_facts += facts.len();
            summary.rejected += page.rejected;
            summary.skipped_events += page.skipped;

            match self.options.cursor_mode {
                CursorMode::Continuation => {
                    if page.newest_event_id.is_some() {
                        newest_event_id = page.newest_event_id.clone();
                    }
                    self.enter(phase, CapturePhase::Checkpointing);
                    checkpoint
                        .save(&Cursor {
                            continuation: page.cursor.clone(),
                            last_event_id: newest_event_id.clone(),
                        })
                        .await?;
                }
                CursorMode::Boundary => {
                    // newest first: the run's boundary is the head of its first page
                    if newest_event_id.is_none() {
                        newest_event_id = page.newest_event_id.clone();
                    }
                }
            }

            let more = page.more;
            continuation = page.cursor.clone();
            self.notify(summary.pages, page.activities, facts);

            if !more {
                break;
            }
        }

        if self.options.cursor_mode == CursorMode::Boundary {
            if let Some(last_event_id) = newest_event_id {
                self.enter(phase, CapturePhase::Checkpointing);
                checkpoint
                    .save(&Cursor {
                        continuation: None,
                        last_event_id: Some(last_event_id),
                    })
                    .await?;
            }
        }

        Ok(())
    }

    async fn aggregate(&self, page: &FetchedPage) -> Result<Vec<PriceFact>> {
        let now = Utc::now();

        let facts = if self.options.seed_from_store && !page.activities.is_empty() {
            let keys: Vec<NftKey> = page
                .activities
                .iter()
                .map(|a| a.nft_key.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let seed = self.store.load_price_facts(&keys).await?;
            debug!("Seeded {} of {} tokens from stored prices", seed.len(), keys.len());
            self.aggregator.aggregate_seeded(seed, &page.activities, now)
        } else {
            self.aggregator.aggregate(&page.activities, now)
        };

        Ok(facts.into_values().collect())
    }

    fn notify(&self, page: usize, activities: Vec<Activity>, price_facts: Vec<PriceFact>) {
        if self.listeners.is_empty() {
            return;
        }

        let batch = Arc::new(CapturedBatch {
            page,
            activities,
            price_facts,
        });

        for tx in &self.listeners {
            match tx.try_send(batch.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("[{}] Batch listener is full, dropping page {}", self.options.stream, page);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("[{}] Batch listener closed", self.options.stream);
                }
            }
        }
    }

    fn enter(&self, phase: &mut CapturePhase, next: CapturePhase) {
        debug!(
            "[{}] {} -> {}",
            self.options.stream,
            phase.as_str(),
            next.as_str()
        );
        *phase = next;
    }
}

/// Keep facts newer than what this run already wrote for their token, and record them.
fn drop_superseded(
    facts: Vec<PriceFact>,
    written: &mut BTreeMap<NftKey, DateTime<Utc>>,
) -> Vec<PriceFact> {
    let mut kept = Vec::with_capacity(facts.len());
    for fact in facts {
        match written.get(&fact.nft_key) {
            Some(newest) if fact.last_listing_timestamp <= *newest => {
                debug!("Keeping newer price for {}", fact.nft_key);
            }
            _ => {
                written.insert(fact.nft_key.clone(), fact.last_listing_timestamp);
                kept.push(fact);
            }
        }
    }
    kept
}
