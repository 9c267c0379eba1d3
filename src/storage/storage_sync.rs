use super::{Bytes, MaybeBytes, StorageError, StoreKey, StoreKeys, StorePrefix};

/// Readable storage traits.
pub trait ReadableStorageTraits: Send + Sync {
    /// Retrieve the value (bytes) associated with a given [`StoreKey`].
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError>;

    /// Retrieve the value (bytes) associated with a given [`StoreKey`], which must exist.
    ///
    /// # Errors
    /// Returns [`StorageError::KeyNotFound`] if the key is not found, or a [`StorageError`] if there is an underlying storage error.
    fn get_required(&self, key: &StoreKey) -> Result<Bytes, StorageError> {
        self.get(key)?
            .ok_or_else(|| StorageError::KeyNotFound(key.clone()))
    }

    /// Return the size in bytes of the value at `key`.
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError>;

    /// Returns true if the store holds a value at `key`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn contains(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.size_key(key)?.is_some())
    }
}

/// Writable storage traits.
pub trait WritableStorageTraits: Send + Sync {
    /// Store bytes at a [`StoreKey`], replacing any existing value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on failure to store.
    /// A bounded store returns [`StorageError::CapacityExceeded`] if the value does not fit.
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError>;

    /// Erase a [`StoreKey`].
    ///
    /// Succeeds if the key does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn erase(&self, key: &StoreKey) -> Result<(), StorageError>;

    /// Erase a list of [`StoreKey`].
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn erase_values(&self, keys: &[StoreKey]) -> Result<(), StorageError> {
        keys.iter().try_for_each(|key| self.erase(key))
    }

    /// Erase all [`StoreKey`] under [`StorePrefix`].
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError>;
}

/// Listable storage traits.
pub trait ListableStorageTraits: Send + Sync {
    /// Retrieve all [`StoreKeys`] in the store.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn list(&self) -> Result<StoreKeys, StorageError> {
        self.list_prefix(&StorePrefix::root())
    }

    /// Retrieve all [`StoreKeys`] with a given [`StorePrefix`].
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError>;
}

/// Capacity traits.
///
/// The durable backend is unbounded. The tiers of a [`CacheChain`](super::CacheChain) are bounded.
pub trait CapacityTraits: Send + Sync {
    /// Returns the total capacity of the store in bytes, or [`None`] if it is unbounded.
    fn capacity(&self) -> Option<u64>;

    /// Returns the number of bytes currently stored.
    fn used_space(&self) -> u64;

    /// Returns true if `num_bytes` more bytes can be stored.
    ///
    /// This is always true for an unbounded store, otherwise it is true iff `used_space + num_bytes <= capacity`.
    fn has_space(&self, num_bytes: u64) -> bool {
        self.capacity().map_or(true, |capacity| {
            self.used_space()
                .checked_add(num_bytes)
                .is_some_and(|required| required <= capacity)
        })
    }
}

/// A storage provider: a readable, writable, listable store with capacity introspection.
pub trait StorageProviderTraits:
    ReadableStorageTraits + WritableStorageTraits + ListableStorageTraits + CapacityTraits
{
    /// Retrieve every `(key, value)` pair in the store, in key order.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn entries(&self) -> Result<Vec<(StoreKey, Bytes)>, StorageError> {
        let mut entries = Vec::new();
        for key in self.list()? {
            // a key may be erased between listing and reading
            if let Some(value) = self.get(&key)? {
                entries.push((key, value));
            }
        }
        Ok(entries)
    }
}

impl core::fmt::Debug for dyn StorageProviderTraits {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "storage provider (used {} of {:?})",
            self.used_space(),
            self.capacity()
        )
    }
}

impl<T> StorageProviderTraits for T where
    T: ReadableStorageTraits + WritableStorageTraits + ListableStorageTraits + CapacityTraits
{
}
