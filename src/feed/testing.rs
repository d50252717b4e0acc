//! Scripted feed and event builders shared by the unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::reservoir::{
    AskEventKind, Criteria, CriteriaData, CriteriaToken, EventInfo, EventsResponse, Order,
    OrderEvent, OrderPrice, PriceAmount,
};
use super::traits::{EventsRequest, FeedSource};
use crate::error::{Error, Result};

/// Serves queued pages in order, recording every request. Runs dry with a feed error.
#[derive(Clone, Default)]
pub struct ScriptedFeed {
    pages: Arc<Mutex<VecDeque<Result<EventsResponse>>>>,
    requests: Arc<Mutex<Vec<EventsRequest>>>,
}

impl ScriptedFeed {
    pub fn new(pages: Vec<EventsResponse>) -> Self {
        let feed = Self::default();
        for p in pages {
            feed.push(p);
        }
        feed
    }

    pub fn push(&self, page: EventsResponse) {
        self.pages.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_error(&self, message: &str) {
        self.pages
            .lock()
            .unwrap()
            .push_back(Err(Error::Feed(message.to_string())));
    }

    pub fn requests(&self) -> Vec<EventsRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    async fn fetch_events(&self, request: &EventsRequest) -> Result<EventsResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Feed("connection refused".into())))
    }
}

pub fn page(events: Vec<OrderEvent>, continuation: Option<&str>) -> EventsResponse {
    EventsResponse {
        events,
        continuation: continuation.map(str::to_string),
    }
}

pub fn new_order(
    event_id: &str,
    contract: &str,
    token_id: &str,
    native_price: f64,
    valid_until: Option<i64>,
    created_at: &str,
) -> OrderEvent {
    OrderEvent {
        order: Order {
            id: format!("order-{}", event_id),
            status: Some("active".into()),
            contract: Some(contract.to_string()),
            maker: Some("0xMaker".into()),
            price: Some(OrderPrice {
                currency: None,
                amount: Some(PriceAmount {
                    raw: None,
                    decimal: Some(native_price),
                    usd: None,
                    native: Some(native_price),
                }),
            }),
            quantity_remaining: Some(1),
            valid_from: Some(1_600_000_000),
            valid_until,
            kind: Some("seaport-v1.5".into()),
            source: Some("opensea.io".into()),
            criteria: Some(Criteria {
                kind: Some("token".into()),
                data: Some(CriteriaData {
                    token: Some(CriteriaToken {
                        token_id: Some(token_id.to_string()),
                    }),
                }),
            }),
        },
        event: EventInfo {
            id: event_id.to_string(),
            kind: AskEventKind::NewOrder,
            tx_hash: None,
            created_at: Some(created_at.to_string()),
        },
    }
}

pub fn other_event(event_id: &str) -> OrderEvent {
    OrderEvent {
        order: Order {
            id: format!("order-{}", event_id),
            status: Some("inactive".into()),
            contract: None,
            maker: None,
            price: None,
            quantity_remaining: None,
            valid_from: None,
            valid_until: None,
            kind: None,
            source: None,
            criteria: None,
        },
        event: EventInfo {
            id: event_id.to_string(),
            kind: AskEventKind::Cancel,
            tx_hash: None,
            created_at: Some("2023-11-14T22:13:20Z".into()),
        },
    }
}
