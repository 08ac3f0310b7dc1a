//! In-process store
//!
//! Keeps serialized blobs in a map so records go through the same JSON
//! encoding as the durable backends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::SyncStore;
use crate::error::StoreError;
use crate::sync::{SyncId, SyncRecord};

#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Raw stored blob, exactly as persisted
    pub fn raw(&self, key: &str) -> Option<String> {
        self.blobs.read().get(key).cloned()
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, id: &SyncId) -> Result<Option<SyncRecord>, StoreError> {
        let blob = self.blobs.read().get(id.as_str()).cloned();
        blob.map(|b| serde_json::from_str(&b))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn set(&self, id: &SyncId, record: &SyncRecord) -> Result<(), StoreError> {
        let blob = serde_json::to_string(record)?;
        self.blobs.write().insert(id.as_str().to_string(), blob);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::sync::SyncPayload;

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryStore::new();
        let found = store.get(&SyncId::normalize("ABCDE")).await.unwrap();
        assert!(found.is_none());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new();
        let id = SyncId::normalize("abcde");
        let record = SyncRecord::from_payload(SyncPayload::default(), Utc::now());

        store.set(&id, &record).await.unwrap();

        assert!(store.raw("ABCDE").is_some());
        assert_eq!(store.len(), 1);
        assert_eq!(store.writes(), 1);

        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.created_at.timestamp_millis(), record.created_at.timestamp_millis());
    }
}
