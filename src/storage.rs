//! Storage providers ([stores](store), the [`CacheChain`] and [storage adapters](storage_adapter)).
//!
//! A storage provider is a key-value mapping from a [`StoreKey`] to bytes with capacity introspection.
//! The same interface is used for the durable backend (e.g. a [`FilesystemStore`](store::FilesystemStore)) and for the bounded in-memory tiers of a [`CacheChain`] (e.g. a [`MemoryStore`](store::MemoryStore) created with [`new_with_capacity`](store::MemoryStore::new_with_capacity)).
//!
//! The storage layout of a key written by the [engine](crate::engine) is:
//!  - `<key>/c<index>`: chunk payloads, see [`chunk_key`],
//!  - `<key>/index_map`: the index map of the key, see [`index_map_key`], and
//!  - `<key>/index/<segment>`: sealed index map segments, see [`index_segment_key`].

mod cache_chain;
pub mod storage_adapter;
mod storage_sync;
pub mod store;
mod store_key;
mod store_prefix;

#[cfg(test)]
pub(crate) mod store_test;

use std::sync::Arc;

use thiserror::Error;

pub use cache_chain::{CacheChain, CacheChainError};
pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

pub use self::storage_sync::{
    CapacityTraits, ListableStorageTraits, ReadableStorageTraits, StorageProviderTraits,
    WritableStorageTraits,
};

/// The type for bytes used in synchronous store set and get methods.
///
/// An alias for [`bytes::Bytes`].
pub type Bytes = bytes::Bytes;

/// An alias for bytes which may or may not be available.
///
/// When a value is read from a store, it returns `MaybeBytes` which is [`None`] if the key is not available.
pub type MaybeBytes = Option<Bytes>;

/// [`Arc`] wrapped readable storage.
pub type ReadableStorage = Arc<dyn ReadableStorageTraits>;

/// [`Arc`] wrapped writable storage.
pub type WritableStorage = Arc<dyn WritableStorageTraits>;

/// [`Arc`] wrapped storage provider.
pub type StorageProvider = Arc<dyn StorageProviderTraits>;

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A required key was not found.
    #[error("key {0} not found")]
    KeyNotFound(StoreKey),
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// A write would exceed the capacity of a bounded store.
    #[error("writing {size} bytes to {key} would exceed the store capacity of {capacity} bytes")]
    CapacityExceeded {
        /// The key.
        key: StoreKey,
        /// The size of the value.
        size: u64,
        /// The store capacity.
        capacity: u64,
    },
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid store prefix.
    #[error("invalid store prefix {0}")]
    StorePrefixError(#[from] StorePrefixError),
    /// An invalid store key.
    #[error("invalid store key {0}")]
    InvalidStoreKey(#[from] StoreKeyError),
    /// The requested method is not supported.
    #[error("{0}")]
    Unsupported(String),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// Return the key of chunk `chunk_index` of `key`.
#[must_use]
pub fn chunk_key(key: &StoreKey, chunk_index: u64) -> StoreKey {
    unsafe { StoreKey::new_unchecked(format!("{key}/c{chunk_index}")) }
}

/// Return the index map key of `key`.
#[must_use]
pub fn index_map_key(key: &StoreKey) -> StoreKey {
    unsafe { StoreKey::new_unchecked(format!("{key}/index_map")) }
}

/// Return the key of sealed index map segment `segment` of `key`.
#[must_use]
pub fn index_segment_key(key: &StoreKey, segment: u64) -> StoreKey {
    unsafe { StoreKey::new_unchecked(format!("{key}/index/{segment}")) }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn storage_keys() -> Result<(), Box<dyn Error>> {
        let key: StoreKey = "dataset/images".try_into()?;
        assert_eq!(chunk_key(&key, 0).as_str(), "dataset/images/c0");
        assert_eq!(chunk_key(&key, 12).as_str(), "dataset/images/c12");
        assert_eq!(index_map_key(&key).as_str(), "dataset/images/index_map");
        assert_eq!(index_segment_key(&key, 3).as_str(), "dataset/images/index/3");
        assert!(chunk_key(&key, 1).has_prefix(&key.to_prefix()));
        Ok(())
    }
}
