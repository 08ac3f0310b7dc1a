//! Record merging
//!
//! Reconciles a stored record with a client's submitted lists. Each ledger
//! list is merged as a union keyed by item id:
//!
//! - items only in the stored record are kept where they are
//! - items only in the submission are appended in submission order
//! - items in both take the submitted value but keep the stored position
//!
//! The stored record is privileged, so merging is not commutative.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::types::{Category, Item, ItemKey, SyncPayload, SyncRecord};

/// Insertion-ordered association of item ids to their latest value.
///
/// Overwriting an existing id replaces the value in place; the id keeps the
/// slot it was first inserted into.
#[derive(Debug, Default)]
struct OrderedItems {
    order: Vec<ItemKey>,
    values: HashMap<ItemKey, Item>,
}

impl OrderedItems {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
            values: HashMap::with_capacity(capacity),
        }
    }

    fn upsert(&mut self, item: &Item) {
        let key = item.key();
        if self.values.insert(key.clone(), item.clone()).is_none() {
            self.order.push(key);
        }
    }

    fn into_items(mut self) -> Vec<Item> {
        self.order
            .iter()
            .filter_map(|key| self.values.remove(key))
            .collect()
    }
}

/// Union one category's lists, later entries winning on value
pub fn merge_items(existing: &[Item], incoming: &[Item]) -> Vec<Item> {
    let mut merged = OrderedItems::with_capacity(existing.len() + incoming.len());
    for item in existing.iter().chain(incoming) {
        merged.upsert(item);
    }
    merged.into_items()
}

/// Merge a submission into the stored record.
///
/// `createdAt` is carried over, the stored `syncCode` wins unless it is unset
/// or empty, and `updatedAt` becomes `now` (never moving backwards).
pub fn merge_records(existing: &SyncRecord, incoming: &SyncPayload, now: DateTime<Utc>) -> SyncRecord {
    let sync_code = match existing.sync_code.as_deref() {
        Some(code) if !code.is_empty() => existing.sync_code.clone(),
        _ => incoming.sync_code.clone(),
    };

    let mut merged = SyncRecord {
        gifts: Vec::new(),
        expenses: Vec::new(),
        transfers: Vec::new(),
        sync_code,
        created_at: existing.created_at,
        updated_at: now.max(existing.updated_at),
    };

    for category in Category::ALL {
        *merged.items_mut(category) =
            merge_items(existing.items(category), incoming.items(category));
    }

    merged
}
