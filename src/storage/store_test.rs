use std::error::Error;

use super::{
    CapacityTraits, ListableStorageTraits, ReadableStorageTraits, StorageProviderTraits,
    StorePrefix, WritableStorageTraits,
};

/// Create a store with the following data
/// ```text
/// - a/
///   - b [0, 1, 2, 3]
///   - c [0]
///   - d/
///     - e
/// - i/
///   - j/
///     - k [0, 1]
/// ```
pub fn store_write<T: WritableStorageTraits>(store: &T) -> Result<(), Box<dyn Error>> {
    store.erase_prefix(&StorePrefix::root())?;

    store.set(&"a/b".try_into()?, vec![255, 255, 255].into())?;
    store.set(&"a/b".try_into()?, vec![0, 1, 2, 3].into())?;
    store.set(&"a/c".try_into()?, vec![0].into())?;
    store.set(&"a/d/e".try_into()?, vec![].into())?;
    store.set(&"i/j/k".try_into()?, vec![0, 1].into())?;

    store.set(&"erase".try_into()?, vec![].into())?;
    store.erase(&"erase".try_into()?)?;
    store.erase(&"erase".try_into()?)?; // succeeds

    store.set(&"erase_values_0".try_into()?, vec![].into())?;
    store.set(&"erase_values_1".try_into()?, vec![].into())?;
    store.erase_values(&["erase_values_0".try_into()?, "erase_values_1".try_into()?])?;

    store.set(&"erase_prefix/0".try_into()?, vec![].into())?;
    store.set(&"erase_prefix/1".try_into()?, vec![].into())?;
    store.erase_prefix(&"erase_prefix/".try_into()?)?;

    Ok(())
}

/// Read from the store and check the data matches the expected values after [`store_write`].
pub fn store_read<T: ReadableStorageTraits>(store: &T) -> Result<(), Box<dyn Error>> {
    assert!(store.get(&"notfound".try_into()?)?.is_none());
    assert!(store.size_key(&"notfound".try_into()?)?.is_none());
    assert!(!store.contains(&"notfound".try_into()?)?);
    assert!(store.get_required(&"notfound".try_into()?).is_err());
    assert_eq!(
        store.get(&"a/b".try_into()?)?,
        Some(vec![0, 1, 2, 3].into())
    );
    assert_eq!(store.get_required(&"a/c".try_into()?)?, vec![0]);
    assert!(store.contains(&"a/d/e".try_into()?)?);
    assert_eq!(store.size_key(&"a/b".try_into()?)?, Some(4));
    assert_eq!(store.size_key(&"a/c".try_into()?)?, Some(1));
    assert_eq!(store.size_key(&"a/d/e".try_into()?)?, Some(0));
    assert_eq!(store.size_key(&"i/j/k".try_into()?)?, Some(2));
    Ok(())
}

/// List the store and check the data matches the expected values after [`store_write`].
pub fn store_list<T: ListableStorageTraits>(store: &T) -> Result<(), Box<dyn Error>> {
    assert_eq!(
        store.list()?,
        &[
            "a/b".try_into()?,
            "a/c".try_into()?,
            "a/d/e".try_into()?,
            "i/j/k".try_into()?
        ]
    );
    assert_eq!(
        store.list_prefix(&"a/".try_into()?)?,
        &["a/b".try_into()?, "a/c".try_into()?, "a/d/e".try_into()?]
    );
    assert_eq!(
        store.list_prefix(&"i/".try_into()?)?,
        &["i/j/k".try_into()?]
    );
    assert_eq!(store.list_prefix(&"notfound/".try_into()?)?, &[]);
    Ok(())
}

/// Check the entries and used space of the store after [`store_write`].
pub fn store_entries<T: StorageProviderTraits>(store: &T) -> Result<(), Box<dyn Error>> {
    let entries = store.entries()?;
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].0, "a/b".try_into()?);
    assert_eq!(entries[0].1, vec![0, 1, 2, 3]);
    assert_eq!(entries[3].0, "i/j/k".try_into()?);
    assert_eq!(entries[3].1, vec![0, 1]);
    assert_eq!(CapacityTraits::used_space(store), 7);
    Ok(())
}
