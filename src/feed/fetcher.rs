//! Cursor-driven pagination over the asks feed

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::reservoir::{AskEventKind, OrderEvent};
use super::traits::{Activity, EventsRequest, FeedSource, ListingWindow, NftKey, SortDirection};
use crate::error::{Error, Result};

/// One page of the feed translated into activities.
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    /// Oldest first, whatever the request's sort direction.
    pub activities: Vec<Activity>,
    /// Continuation to resume from: the feed's token, or the incoming one when the feed gave none.
    pub cursor: Option<String>,
    pub more: bool,
    /// Newest event id on the page, of any kind.
    pub newest_event_id: Option<String>,
    /// Events of kinds other than new-order.
    pub skipped: usize,
    /// New-order events dropped because their payload was incomplete.
    pub rejected: usize,
}

pub struct PaginatedFetcher<F> {
    source: F,
    limit: u32,
    sort_direction: SortDirection,
}

impl<F: FeedSource> PaginatedFetcher<F> {
    pub fn new(source: F, limit: u32, sort_direction: SortDirection) -> Self {
        Self {
            source,
            limit,
            sort_direction,
        }
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn set_sort_direction(&mut self, sort_direction: SortDirection) {
        self.sort_direction = sort_direction;
    }

    /// Fetch the page after `cursor`.
    ///
    /// With `stop_event_id`, the page that contains that event ends the run and
    /// events from it onward (already processed) are left out. Feed errors are
    /// returned as-is; nothing is retried here.
    pub async fn fetch_next_page(
        &self,
        cursor: Option<&str>,
        stop_event_id: Option<&str>,
    ) -> Result<FetchedPage> {
        let request = EventsRequest {
            limit: self.limit,
            continuation: cursor.map(str::to_string),
            sort_direction: self.sort_direction,
        };

        let response = self.source.fetch_events(&request).await?;
        let next_cursor = response.next_continuation().map(str::to_string);

        let newest_event_id = match self.sort_direction {
            SortDirection::Asc => response.events.last(),
            SortDirection::Desc => response.events.first(),
        }
        .map(|e| e.event.id.clone());

        let boundary = stop_event_id
            .and_then(|stop| response.events.iter().position(|e| e.event.id == stop));

        let mut more = !response.events.is_empty() && next_cursor.is_some();
        let events = match boundary {
            Some(index) => {
                debug!("Reached stop event at position {} of page", index);
                more = false;
                &response.events[..index]
            }
            None => &response.events[..],
        };

        let mut page = FetchedPage {
            cursor: next_cursor.or_else(|| cursor.map(str::to_string)),
            more,
            newest_event_id,
            ..Default::default()
        };

        for event in events {
            match normalize(event) {
                Ok(Some(activity)) => page.activities.push(activity),
                Ok(None) => page.skipped += 1,
                Err(e) => {
                    warn!("Rejected event {}: {}", event.event.id, e);
                    page.rejected += 1;
                }
            }
        }

        if self.sort_direction == SortDirection::Desc {
            page.activities.reverse();
        }

        debug!(
            "Fetched page: {} activities, {} skipped, {} rejected, more={}",
            page.activities.len(),
            page.skipped,
            page.rejected,
            page.more
        );

        Ok(page)
    }
}

/// Translate a raw feed event into an [`Activity`].
///
/// Returns `Ok(None)` for event kinds other than new-order.
pub fn normalize(event: &OrderEvent) -> Result<Option<Activity>> {
    if event.event.kind != AskEventKind::NewOrder {
        return Ok(None);
    }

    let order = &event.order;
    let missing = |field: &str| Error::Aggregation(format!("order {} has no {}", order.id, field));

    let contract = order.contract.as_deref().ok_or_else(|| missing("contract"))?;
    let token_id = order.token_id().ok_or_else(|| missing("token id"))?;
    let native = order.native_price().ok_or_else(|| missing("native price"))?;
    let created_at = event
        .event
        .created_at
        .as_deref()
        .ok_or_else(|| missing("event timestamp"))?;

    let price = to_price(native)
        .ok_or_else(|| Error::Aggregation(format!("order {} has invalid price {}", order.id, native)))?;

    let observed_at = DateTime::parse_from_rfc3339(created_at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Aggregation(format!("bad createdAt {}: {}", created_at, e)))?;

    Ok(Some(Activity {
        nft_key: NftKey::new(contract, token_id),
        price,
        maker: order.maker.clone().unwrap_or_default().to_lowercase(),
        window: ListingWindow {
            from: unix_seconds(order.valid_from),
            to: unix_seconds(order.valid_until),
        },
        observed_at,
        source_event_id: event.event.id.clone(),
        order_id: order.id.clone(),
    }))
}

fn to_price(native: f64) -> Option<Decimal> {
    if !native.is_finite() || native < 0.0 {
        return None;
    }
    Decimal::from_str(&native.to_string()).ok()
}

// 0 means the order has no bound on that side.
fn unix_seconds(ts: Option<i64>) -> Option<DateTime<Utc>> {
    ts.filter(|&t| t > 0)
        .and_then(|t| DateTime::from_timestamp(t, 0))
}
