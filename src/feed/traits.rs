use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::reservoir::EventsResponse;
use crate::error::Result;

/// Identifies a single token: collection contract plus token id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NftKey {
    pub contract_address: String,
    pub token_index: String,
}

impl NftKey {
    pub fn new(contract_address: impl Into<String>, token_index: impl Into<String>) -> Self {
        Self {
            contract_address: contract_address.into().to_lowercase(),
            token_index: token_index.into(),
        }
    }
}

impl std::fmt::Display for NftKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.contract_address, self.token_index)
    }
}

/// Validity window of a listing. `to == None` never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ListingWindow {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.to, Some(to) if to < now)
    }
}

/// A normalized new-listing fact taken from one feed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub nft_key: NftKey,
    pub price: Decimal,
    pub maker: String,
    pub window: ListingWindow,
    pub observed_at: DateTime<Utc>,
    pub source_event_id: String,
    pub order_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsRequest {
    pub limit: u32,
    pub continuation: Option<String>,
    pub sort_direction: SortDirection,
}

/// Source of raw ask-event pages.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_events(&self, request: &EventsRequest) -> Result<EventsResponse>;
}
