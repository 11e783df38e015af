//! Cached resource stores.
//!
//! A `ResourceStore` mirrors one remote collection in memory:
//!
//! - the snapshot is served from cache while it is younger than the store's TTL
//! - concurrent fetches share a single in-flight request
//! - successful mutations patch the snapshot in place, failed ones never touch it
//!
//! Everything is generic over a `Resource` (the item type and its endpoint)
//! and a `ResourceApi` (the transport).

pub mod entry;
pub mod mutation;
pub mod pending;
pub mod resource_store;

#[cfg(test)]
pub(crate) mod testing;

use serde::{de::DeserializeOwned, Serialize};

pub use entry::CacheEntry;
pub use mutation::InsertPosition;
pub use resource_store::{ResourceStore, Snapshot, StoreFailure, StoreOperation};

/// An item type backed by a REST collection.
pub trait Resource: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Body sent when creating an item.
    type Create: Serialize + Send + Sync;

    /// Body sent when updating an item.
    type Patch: Serialize + Send + Sync;

    /// Name used in logs and failure events (e.g. "tours").
    const NAME: &'static str;

    /// Collection path relative to the API base URL.
    const PATH: &'static str;

    /// Where newly created items land in the cached collection.
    const INSERT_AT: InsertPosition;

    /// Unique identifier of this item within its collection.
    fn id(&self) -> &str;
}
