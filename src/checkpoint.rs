//! Resumable position in the feed, one per stream

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::Store;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Opaque token issued by the feed.
    pub continuation: Option<String>,
    /// Newest event already processed.
    pub last_event_id: Option<String>,
}

impl Cursor {
    pub fn is_empty(&self) -> bool {
        self.continuation.is_none() && self.last_event_id.is_none()
    }
}

pub struct CheckpointManager<'a, S> {
    store: &'a S,
    stream: &'a str,
}

impl<'a, S: Store> CheckpointManager<'a, S> {
    pub fn new(store: &'a S, stream: &'a str) -> Self {
        Self { store, stream }
    }

    /// `None` means start from the beginning of the feed.
    pub async fn load(&self) -> Result<Option<Cursor>> {
        let cursor = self
            .store
            .load_cursor(self.stream)
            .await?
            .filter(|c| !c.is_empty());
        debug!("[{}] Loaded cursor {:?}", self.stream, cursor);
        Ok(cursor)
    }

    /// Only call once the page this cursor points past has been written.
    pub async fn save(&self, cursor: &Cursor) -> Result<()> {
        self.store.save_cursor(self.stream, cursor).await?;
        debug!("[{}] Saved cursor {:?}", self.stream, cursor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn empty_store_loads_nothing() {
        let store = MemoryStore::new();
        let checkpoint = CheckpointManager::new(&store, "asks");

        assert_eq!(checkpoint.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn saved_cursor_is_loaded_back() {
        let store = MemoryStore::new();
        let cursor = Cursor {
            continuation: Some("c42".into()),
            last_event_id: Some("e42".into()),
        };

        CheckpointManager::new(&store, "asks").save(&cursor).await.unwrap();

        let loaded = CheckpointManager::new(&store, "asks").load().await.unwrap();
        assert_eq!(loaded, Some(cursor));
    }

    #[tokio::test]
    async fn last_write_wins_and_streams_are_separate() {
        let store = MemoryStore::new();
        let asks = CheckpointManager::new(&store, "asks");
        let other = CheckpointManager::new(&store, "bids");

        asks.save(&Cursor { continuation: Some("c1".into()), last_event_id: None }).await.unwrap();
        asks.save(&Cursor { continuation: Some("c2".into()), last_event_id: None }).await.unwrap();

        assert_eq!(asks.load().await.unwrap().unwrap().continuation.as_deref(), Some("c2"));
        assert_eq!(other.load().await.unwrap(), None);
    }
}
