//! Sync operations over an injected store
//!
//! The service holds no record state of its own. Every call reads from and
//! writes to the store, so any number of requests may run at once.
//!
//! Updates are a plain read-merge-write with no version check. Two updates
//! racing on the same code both merge against the same snapshot and the
//! last write replaces the other wholesale.

use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::code::{CodeGenerator, CodeSource, SyncId};
use super::merge::merge_records;
use super::types::{SyncPayload, SyncRecord};
use crate::error::{AppError, Result};
use crate::storage::SyncStore;

#[derive(Clone)]
pub struct SyncService {
    store: Arc<dyn SyncStore>,
    codes: Arc<dyn CodeSource>,
    clock: Arc<dyn Clock>,
}

impl SyncService {
    /// Service with a random code generator and the system clock
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        Self::with_parts(store, Arc::new(CodeGenerator::new()), Arc::new(SystemClock))
    }

    pub fn with_parts(
        store: Arc<dyn SyncStore>,
        codes: Arc<dyn CodeSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, codes, clock }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Create a record under a fresh code.
    ///
    /// The code is not checked against existing records; a collision
    /// overwrites the earlier record.
    pub async fn create(&self, payload: SyncPayload) -> Result<SyncId> {
        let id = self.codes.generate();
        let record = SyncRecord::from_payload(payload, self.clock.now());

        self.store.set(&id, &record).await?;

        tracing::info!(
            "Created sync record {} ({} gifts, {} expenses, {} transfers)",
            id,
            record.gifts.len(),
            record.expenses.len(),
            record.transfers.len()
        );
        Ok(id)
    }

    /// Fetch the record for a client-supplied code
    pub async fn read(&self, raw_id: &str) -> Result<SyncRecord> {
        let id = SyncId::normalize(raw_id);
        let record = self.store.get(&id).await?.ok_or(AppError::NotFound)?;
        tracing::debug!("Read sync record {}", id);
        Ok(record)
    }

    /// Merge a submission into an existing record and persist the result.
    ///
    /// Never creates a record: an unknown code fails before anything is written.
    pub async fn update(&self, raw_id: &str, payload: SyncPayload) -> Result<SyncRecord> {
        let id = SyncId::normalize(raw_id);
        let existing = self.store.get(&id).await?.ok_or_else(|| {
            tracing::debug!("Update for unknown sync record {}", id);
            AppError::NotFound
        })?;

        let merged = merge_records(&existing, &payload, self.clock.now());
        self.store.set(&id, &merged).await?;

        tracing::info!(
            "Merged update into sync record {} ({} gifts, {} expenses, {} transfers)",
            id,
            merged.gifts.len(),
            merged.expenses.len(),
            merged.transfers.len()
        );
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::storage::MemoryStore;
    use crate::sync::clock::FixedClock;
    use crate::sync::Item;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use tokio::sync::Barrier;

    fn payload(value: Value) -> SyncPayload {
        serde_json::from_value(value).unwrap()
    }

    fn items(value: Value) -> Vec<Item> {
        serde_json::from_value(value).unwrap()
    }

    fn service_with(store: Arc<MemoryStore>) -> SyncService {
        SyncService::with_parts(
            store,
            Arc::new(CodeGenerator::seeded(1)),
            Arc::new(FixedClock(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())),
        )
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone());

        let id = service
            .create(payload(json!({"gifts": [{"id": 1, "amount": 5}]})))
            .await
            .unwrap();
        assert!(id.is_well_formed());

        let record = service.read(id.as_str()).await.unwrap();
        assert_eq!(record.gifts, items(json!([{"id": 1, "amount": 5}])));
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_read_is_case_insensitive() {
        let service = service_with(Arc::new(MemoryStore::new()));
        let id = service.create(SyncPayload::default()).await.unwrap();

        let upper = service.read(id.as_str()).await.unwrap();
        let lower = service.read(&id.as_str().to_lowercase()).await.unwrap();
        assert_eq!(upper, lower);
    }

    #[tokio::test]
    async fn test_read_unknown() {
        let service = service_with(Arc::new(MemoryStore::new()));
        let err = service.read("ABCDE").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_update_unknown_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone());

        let err = service
            .update("ABCDE", payload(json!({"gifts": [{"id": 1}]})))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound));
        assert_eq!(store.writes(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone());
        let id = service
            .create(payload(json!({"gifts": [{"id": 1, "amount": 5}], "syncCode": "fam"})))
            .await
            .unwrap();

        let merged = service
            .update(
                &id.as_str().to_lowercase(),
                payload(json!({
                    "gifts": [{"id": 1, "amount": 10}, {"id": 2, "amount": 3}],
                    "syncCode": "other"
                })),
            )
            .await
            .unwrap();

        let expected = items(json!([{"id": 1, "amount": 10}, {"id": 2, "amount": 3}]));
        assert_eq!(merged.gifts, expected);
        assert_eq!(merged.sync_code.as_deref(), Some("fam"));

        let stored = service.read(id.as_str()).await.unwrap();
        assert_eq!(stored, merged);
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_create_collision_overwrites() {
        let store = Arc::new(MemoryStore::new());
        let codes = Arc::new(CodeGenerator::with_rng(rand::rngs::mock::StepRng::new(0, 0)));
        let service = SyncService::with_parts(store.clone(), codes, Arc::new(SystemClock));

        let first = service.create(payload(json!({"syncCode": "a"}))).await.unwrap();
        let second = service.create(payload(json!({"syncCode": "b"}))).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        let record = service.read(first.as_str()).await.unwrap();
        assert_eq!(record.sync_code.as_deref(), Some("b"));
    }

    /// Store whose writes always fail
    struct ReadOnlyStore(MemoryStore);

    #[async_trait]
    impl SyncStore for ReadOnlyStore {
        fn backend(&self) -> &'static str {
            "read-only"
        }

        async fn get(&self, id: &SyncId) -> std::result::Result<Option<SyncRecord>, StoreError> {
            self.0.get(id).await
        }

        async fn set(&self, _id: &SyncId, _record: &SyncRecord) -> std::result::Result<(), StoreError> {
            Err(StoreError::ObjectStore("read-only bucket".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_write_is_reported() {
        let inner = MemoryStore::new();
        let id = SyncId::normalize("AB3K9");
        inner
            .set(&id, &SyncRecord::from_payload(payload(json!({"gifts": [{"id": 1}]})), Utc::now()))
            .await
            .unwrap();

        let service = SyncService::new(Arc::new(ReadOnlyStore(inner)));

        let err = service.create(SyncPayload::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::ObjectStore(_))));

        let err = service
            .update("AB3K9", payload(json!({"gifts": [{"id": 2}]})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));

        let record = service.read("AB3K9").await.unwrap();
        assert_eq!(record.gifts.len(), 1);
    }

    /// Holds every reader until `parties` reads are in flight
    struct GatedStore {
        inner: Arc<MemoryStore>,
        gate: Barrier,
    }

    #[async_trait]
    impl SyncStore for GatedStore {
        fn backend(&self) -> &'static str {
            "gated"
        }

        async fn get(&self, id: &SyncId) -> std::result::Result<Option<SyncRecord>, StoreError> {
            let record = self.inner.get(id).await;
            self.gate.wait().await;
            record
        }

        async fn set(&self, id: &SyncId, record: &SyncRecord) -> std::result::Result<(), StoreError> {
            self.inner.set(id, record).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_updates_lose_one_side() {
        let inner = Arc::new(MemoryStore::new());
        let id = SyncId::normalize("AB3K9");
        inner
            .set(&id, &SyncRecord::from_payload(payload(json!({"gifts": [{"id": "base"}]})), Utc::now()))
            .await
            .unwrap();

        let gated = Arc::new(GatedStore {
            inner: inner.clone(),
            gate: Barrier::new(2),
        });
        let service = SyncService::new(gated);

        let left = service.clone();
        let right = service.clone();
        let (a, b) = tokio::join!(
            left.update("AB3K9", payload(json!({"gifts": [{"id": "from-a"}]}))),
            right.update("AB3K9", payload(json!({"gifts": [{"id": "from-b"}]}))),
        );
        a.unwrap();
        b.unwrap();

        let stored = inner.get(&id).await.unwrap().unwrap();
        let ids: Vec<Value> = stored.gifts.iter().map(|item| item.id().clone()).collect();

        // Both merged against the same snapshot; the later write wins wholesale
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], json!("base"));
        assert!(ids[1] == json!("from-a") || ids[1] == json!("from-b"));
        assert_eq!(inner.writes(), 3);
    }
}
