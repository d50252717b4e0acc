use async_trait::async_trait;

use crate::aggregator::PriceFact;
use crate::checkpoint::Cursor;
use crate::error::Result;
use crate::feed::{Activity, NftKey};

/// Persistence operations the capture pipeline relies on.
#[async_trait]
pub trait Store: Send + Sync {
    /// Append activities; ones already stored (same source event id) are left untouched.
    async fn insert_activities(&self, activities: &[Activity]) -> Result<u64>;

    /// Write price facts, overwriting price and timestamp of existing tokens.
    async fn upsert_price_facts(&self, facts: &[PriceFact]) -> Result<()>;

    async fn load_price_facts(&self, keys: &[NftKey]) -> Result<Vec<PriceFact>>;

    async fn load_cursor(&self, stream: &str) -> Result<Option<Cursor>>;

    async fn save_cursor(&self, stream: &str, cursor: &Cursor) -> Result<()>;
}
