use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::store::Store;
use crate::aggregator::PriceFact;
use crate::checkpoint::Cursor;
use crate::error::Result;
use crate::feed::{Activity, NftKey};

/// In-process store with the same conflict rules as the database.
#[derive(Default)]
pub struct MemoryStore {
    pub activities: DashMap<String, Activity>,
    pub prices: DashMap<NftKey, PriceFact>,
    pub cursors: DashMap<String, Cursor>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price(&self, key: &NftKey) -> Option<PriceFact> {
        self.prices.get(key).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_activities(&self, activities: &[Activity]) -> Result<u64> {
        let mut inserted = 0;
        for activity in activities {
            if let Entry::Vacant(slot) = self.activities.entry(activity.source_event_id.clone()) {
                slot.insert(activity.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn upsert_price_facts(&self, facts: &[PriceFact]) -> Result<()> {
        for fact in facts {
            self.prices.insert(fact.nft_key.clone(), fact.clone());
        }
        Ok(())
    }

    async fn load_price_facts(&self, keys: &[NftKey]) -> Result<Vec<PriceFact>> {
        Ok(keys.iter().filter_map(|key| self.price(key)).collect())
    }

    async fn load_cursor(&self, stream: &str) -> Result<Option<Cursor>> {
        Ok(self.cursors.get(stream).map(|entry| entry.value().clone()))
    }

    async fn save_cursor(&self, stream: &str, cursor: &Cursor) -> Result<()> {
        self.cursors.insert(stream.to_string(), cursor.clone());
        Ok(())
    }
}
