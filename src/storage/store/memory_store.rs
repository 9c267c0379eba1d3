//! An in-memory store.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::storage::{
    Bytes, CapacityTraits, ListableStorageTraits, MaybeBytes, ReadableStorageTraits,
    StorageError, StoreKey, StoreKeys, StorePrefix, WritableStorageTraits,
};

#[derive(Debug, Default)]
struct MemoryStoreData {
    values: BTreeMap<StoreKey, Bytes>,
    used_space: u64,
}

/// An in-memory store.
///
/// A memory store is unbounded by default.
/// A store created with [`MemoryStore::new_with_capacity`] is bounded and refuses writes beyond its capacity, which makes it suitable as a [`CacheChain`](crate::storage::CacheChain) tier.
#[derive(Debug)]
pub struct MemoryStore {
    data: Mutex<MemoryStoreData>,
    capacity: Option<u64>,
}

impl MemoryStore {
    /// Create a new unbounded memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Mutex::default(),
            capacity: None,
        }
    }

    /// Create a new memory store which can hold at most `capacity` bytes.
    #[must_use]
    pub fn new_with_capacity(capacity: u64) -> Self {
        Self {
            data: Mutex::default(),
            capacity: Some(capacity),
        }
    }

    /// Returns the number of keys in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.lock().values.len()
    }

    /// Returns true if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.lock().values.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        // Bytes clones are reference counted, the caller never aliases a mutable buffer
        Ok(self.data.lock().values.get(key).cloned())
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        Ok(self
            .data
            .lock()
            .values
            .get(key)
            .map(|value| value.len() as u64))
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        let mut data = self.data.lock();
        let existing = data.values.get(key).map_or(0, |value| value.len() as u64);
        let size = value.len() as u64;
        let used_space = data.used_space - existing + size;
        if let Some(capacity) = self.capacity {
            if used_space > capacity {
                return Err(StorageError::CapacityExceeded {
                    key: key.clone(),
                    size,
                    capacity,
                });
            }
        }
        data.values.insert(key.clone(), value);
        data.used_space = used_space;
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        let mut data = self.data.lock();
        if let Some(value) = data.values.remove(key) {
            data.used_space -= value.len() as u64;
        }
        Ok(())
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        let mut data = self.data.lock();
        let MemoryStoreData { values, used_space } = &mut *data;
        values.retain(|key, value| {
            if key.has_prefix(prefix) {
                *used_space -= value.len() as u64;
                false
            } else {
                true
            }
        });
        Ok(())
    }
}

impl ListableStorageTraits for MemoryStore {
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        Ok(self
            .data
            .lock()
            .values
            .keys()
            .filter(|key| key.has_prefix(prefix))
            .cloned()
            .collect())
    }
}

impl CapacityTraits for MemoryStore {
    fn capacity(&self) -> Option<u64> {
        self.capacity
    }

    fn used_space(&self) -> u64 {
        self.data.lock().used_space
    }
}
