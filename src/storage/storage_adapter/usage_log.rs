//! A storage adapter which logs storage method calls.

use std::{io::Write, sync::Arc};

use itertools::Itertools;
use parking_lot::Mutex;

use crate::storage::{
    Bytes, CapacityTraits, ListableStorageTraits, MaybeBytes, ReadableStorageTraits,
    StorageError, StoreKey, StoreKeys, StorePrefix, WritableStorageTraits,
};

/// The usage log storage adapter. Logs storage method calls.
///
/// It is intended to aid in debugging and tuning cache tiers by revealing storage access patterns.
///
/// ### Example (log to stdout)
/// ```rust
/// # use std::sync::Arc;
/// # use parking_lot::Mutex;
/// # use chunk_engine::storage::store::MemoryStore;
/// # use chunk_engine::storage::storage_adapter::usage_log::UsageLogStorageAdapter;
/// let store = Arc::new(MemoryStore::new());
/// let log_writer = Arc::new(Mutex::new(std::io::stdout()));
/// let store = Arc::new(UsageLogStorageAdapter::new(store, log_writer, || {
///     "[backend] ".to_string()
/// }));
/// ```
///
/// Writing and reading a sample through the above [`UsageLogStorageAdapter`] prints outputs like:
/// ```text
/// [backend] get(images/index_map) -> len=Ok(None)
/// [backend] set(images/c0, len=4096) -> Ok(())
/// [backend] set(images/c1, len=1200) -> Ok(())
/// [backend] set(images/index_map, len=231) -> Ok(())
/// [backend] get(images/index_map) -> len=Ok(Some(231))
/// [backend] get(images/c0) -> len=Ok(Some(4096))
/// ```
pub struct UsageLogStorageAdapter<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    handle: Arc<Mutex<dyn Write + Send + Sync>>,
    prefix_func: fn() -> String,
}

impl<TStorage: ?Sized> core::fmt::Debug for UsageLogStorageAdapter<TStorage> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        writeln!(f, "usage log")
    }
}

impl<TStorage: ?Sized> UsageLogStorageAdapter<TStorage> {
    /// Create a new usage log storage adapter.
    pub fn new(
        storage: Arc<TStorage>,
        handle: Arc<Mutex<dyn Write + Send + Sync>>,
        prefix_func: fn() -> String,
    ) -> Self {
        Self {
            storage,
            handle,
            prefix_func,
        }
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> ReadableStorageTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let result = self.storage.get(key);
        writeln!(
            self.handle.lock(),
            "{}get({key}) -> len={:?}",
            (self.prefix_func)(),
            result.as_ref().map(|v| v.as_ref().map(Bytes::len))
        )?;
        result
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let result = self.storage.size_key(key);
        writeln!(
            self.handle.lock(),
            "{}size_key({key}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }
}

impl<TStorage: ?Sized + WritableStorageTraits> WritableStorageTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        let len = value.len();
        let result = self.storage.set(key, value);
        writeln!(
            self.handle.lock(),
            "{}set({key}, len={len}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        let result = self.storage.erase(key);
        writeln!(
            self.handle.lock(),
            "{}erase({key}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }

    fn erase_values(&self, keys: &[StoreKey]) -> Result<(), StorageError> {
        let result = self.storage.erase_values(keys);
        writeln!(
            self.handle.lock(),
            "{}erase_values([{}]) -> {result:?}",
            (self.prefix_func)(),
            keys.iter().format(", ")
        )?;
        result
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        let result = self.storage.erase_prefix(prefix);
        writeln!(
            self.handle.lock(),
            "{}erase_prefix({prefix}) -> {result:?}",
            (self.prefix_func)()
        )?;
        result
    }
}

impl<TStorage: ?Sized + ListableStorageTraits> ListableStorageTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn list(&self) -> Result<StoreKeys, StorageError> {
        let result = self.storage.list();
        writeln!(
            self.handle.lock(),
            "{}list() -> [{}]",
            (self.prefix_func)(),
            result.as_ref().map_or(String::new(), |keys| keys.iter().join(", "))
        )?;
        result
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let result = self.storage.list_prefix(prefix);
        writeln!(
            self.handle.lock(),
            "{}list_prefix({prefix}) -> [{}]",
            (self.prefix_func)(),
            result.as_ref().map_or(String::new(), |keys| keys.iter().join(", "))
        )?;
        result
    }
}

impl<TStorage: ?Sized + CapacityTraits> CapacityTraits for UsageLogStorageAdapter<TStorage> {
    fn capacity(&self) -> Option<u64> {
        self.storage.capacity()
    }

    fn used_space(&self) -> u64 {
        self.storage.used_space()
    }

    fn has_space(&self, num_bytes: u64) -> bool {
        self.storage.has_space(num_bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::storage::store::MemoryStore;

    #[test]
    fn usage_log() -> Result<(), Box<dyn Error>> {
        let log = Arc::new(Mutex::new(Vec::<u8>::new()));
        let store = UsageLogStorageAdapter::new(
            Arc::new(MemoryStore::new_with_capacity(8)),
            log.clone(),
            || "[tier] ".to_string(),
        );
        store.set(&"a/c0".try_into()?, vec![0; 4].into())?;
        store.get(&"a/c0".try_into()?)?;
        store.get(&"a/c1".try_into()?)?;
        assert!(store.set(&"a/c1".try_into()?, vec![0; 5].into()).is_err());
        store.list()?;
        assert_eq!(store.used_space(), 4);
        assert!(store.has_space(4));

        let log = String::from_utf8(log.lock().clone())?;
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines[0], "[tier] set(a/c0, len=4) -> Ok(())");
        assert_eq!(lines[1], "[tier] get(a/c0) -> len=Ok(Some(4))");
        assert_eq!(lines[2], "[tier] get(a/c1) -> len=Ok(None)");
        assert!(lines[3].starts_with("[tier] set(a/c1, len=5) -> Err(CapacityExceeded"));
        assert_eq!(lines[4], "[tier] list() -> [a/c0]");
        Ok(())
    }
}
