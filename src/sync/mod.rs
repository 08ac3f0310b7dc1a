//! Sync module for shared ledger records
//!
//! Provides:
//! - Short shareable codes naming one record
//! - Union-by-id merging of ledger lists
//! - Create/read/update over an injected key-value store
//!
//! # Sync Protocol
//!
//! 1. A device without a code creates a record and receives a fresh code
//! 2. Devices sharing the code read the current record
//! 3. Devices submit local lists; the server merges them into the stored record
//!
//! # Merge Rules
//!
//! - Items are matched by `id` within each list
//! - The submitted value wins for shared ids, the stored position is kept
//! - New items are appended in submission order

mod clock;
mod code;
mod merge;
mod service;
mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use code::{generate_with, CodeGenerator, CodeSource, SyncId, ALPHABET, CODE_LEN};
pub use merge::{merge_items, merge_records};
pub use service::SyncService;
pub use types::{Category, Item, ItemKey, SyncPayload, SyncRecord};
