use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsResponse {
    #[serde(default)]
    pub events: Vec<OrderEvent>,
    #[serde(default)]
    pub continuation: Option<String>,
}

impl EventsResponse {
    /// Continuation token, treating an empty string as absent.
    pub fn next_continuation(&self) -> Option<&str> {
        self.continuation.as_deref().filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderEvent {
    pub order: Order,
    pub event: EventInfo,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub contract: Option<String>,
    #[serde(default)]
    pub maker: Option<String>,
    #[serde(default)]
    pub price: Option<OrderPrice>,
    #[serde(default)]
    pub quantity_remaining: Option<i64>,
    #[serde(default)]
    pub valid_from: Option<i64>, // Unix timestamp in seconds
    #[serde(default)]
    pub valid_until: Option<i64>, // Unix timestamp in seconds, 0 for no expiry
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub criteria: Option<Criteria>,
}

impl Order {
    pub fn token_id(&self) -> Option<&str> {
        self.criteria
            .as_ref()?
            .data
            .as_ref()?
            .token
            .as_ref()?
            .token_id
            .as_deref()
    }

    pub fn native_price(&self) -> Option<f64> {
        self.price.as_ref()?.amount.as_ref()?.native
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderPrice {
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub amount: Option<PriceAmount>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Currency {
    pub contract: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceAmount {
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub decimal: Option<f64>,
    #[serde(default)]
    pub usd: Option<f64>,
    #[serde(default)]
    pub native: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Criteria {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<CriteriaData>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CriteriaData {
    #[serde(default)]
    pub token: Option<CriteriaToken>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaToken {
    #[serde(default)]
    pub token_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    pub id: String,
    pub kind: AskEventKind,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AskEventKind {
    NewOrder,
    Expiry,
    Sale,
    Cancel,
    BalanceChange,
    ApprovalChange,
    Bootstrap,
    Revalidation,
    Reprice,
    #[serde(other)]
    Other,
}
