//! Sync data types
//!
//! Defines the persisted record shape shared by every device in a group:
//! - Ledger items, opaque apart from their `id`
//! - The per-group sync record with creation/update timestamps
//! - The partial payload clients submit on create and update

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single ledger entry.
///
/// Only `id` is interpreted; every other field is carried through as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    /// Build an item from a JSON value, rejecting non-objects and objects without `id`
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// The application-defined id of this item
    pub fn id(&self) -> &Value {
        // Presence is checked at deserialization time
        self.0.get("id").unwrap_or(&Value::Null)
    }

    /// Comparable key for this item's id.
    ///
    /// Numbers compare by numeric value (`1`, `1.0` and `-0` vs `0` are equal),
    /// everything else by its JSON text, so `1` and `"1"` are different items.
    pub fn key(&self) -> ItemKey {
        let id = self.id();
        match id.as_f64() {
            // Adding zero folds -0.0 into 0.0
            Some(number) if id.is_number() => ItemKey(format!("{}", number + 0.0)),
            _ => ItemKey(id.to_string()),
        }
    }

    /// Look up a pass-through field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        if !fields.contains_key("id") {
            return Err(serde::de::Error::missing_field("id"));
        }
        Ok(Self(fields))
    }
}

/// Canonical form of an item id, used as the merge key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(String);

/// The three ledger lists carried by a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Gifts,
    Expenses,
    Transfers,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Gifts, Category::Expenses, Category::Transfers];
}

/// The persisted state of one shared group.
///
/// The sync code that addresses a record is the store key and is not part of the blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    #[serde(default)]
    pub gifts: Vec<Item>,
    #[serde(default)]
    pub expenses: Vec<Item>,
    #[serde(default)]
    pub transfers: Vec<Item>,
    /// Opaque code chosen by the creating device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_code: Option<String>,
    /// Fixed at creation
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Bumped on every successful write
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl SyncRecord {
    /// Build a fresh record from a create payload
    pub fn from_payload(payload: SyncPayload, now: DateTime<Utc>) -> Self {
        Self {
            gifts: payload.gifts.unwrap_or_default(),
            expenses: payload.expenses.unwrap_or_default(),
            transfers: payload.transfers.unwrap_or_default(),
            sync_code: payload.sync_code,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn items(&self, category: Category) -> &[Item] {
        match category {
            Category::Gifts => &self.gifts,
            Category::Expenses => &self.expenses,
            Category::Transfers => &self.transfers,
        }
    }

    pub fn items_mut(&mut self, category: Category) -> &mut Vec<Item> {
        match category {
            Category::Gifts => &mut self.gifts,
            Category::Expenses => &mut self.expenses,
            Category::Transfers => &mut self.transfers,
        }
    }
}

/// Client-submitted changes. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gifts: Option<Vec<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expenses: Option<Vec<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfers: Option<Vec<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_code: Option<String>,
}

impl SyncPayload {
    /// Decode a request body
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Items submitted for a category; an omitted list contributes nothing
    pub fn items(&self, category: Category) -> &[Item] {
        let list = match category {
            Category::Gifts => &self.gifts,
            Category::Expenses => &self.expenses,
            Category::Transfers => &self.transfers,
        };
        list.as_deref().unwrap_or(&[])
    }
}

impl From<&SyncRecord> for SyncPayload {
    fn from(record: &SyncRecord) -> Self {
        Self {
            gifts: Some(record.gifts.clone()),
            expenses: Some(record.expenses.clone()),
            transfers: Some(record.transfers.clone()),
            sync_code: record.sync_code.clone(),
        }
    }
}
