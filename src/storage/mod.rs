//! Persistent key-value storage for sync records
//!
//! One JSON blob per sync code, inside a namespace dedicated to sync data.
//! Backends offer plain get/set only: there is no compare-and-swap, so a
//! read-merge-write by the caller can lose a concurrent update.
//!
//! Supports an in-process map, SQLite, and S3-compatible object storage.

mod memory;
mod s3_client;
mod sqlite;

pub use memory::MemoryStore;
pub use s3_client::{S3Client, S3Store};
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::sync::{SyncId, SyncRecord};

/// Trait for sync record storage backends
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// Fetch the record stored under `id`, if any
    async fn get(&self, id: &SyncId) -> Result<Option<SyncRecord>, StoreError>;

    /// Store `record` under `id`, replacing whatever was there
    async fn set(&self, id: &SyncId, record: &SyncRecord) -> Result<(), StoreError>;
}
