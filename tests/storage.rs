use std::{num::NonZeroUsize, sync::Arc};

use chunk_engine::{
    array::ArrayData,
    engine::{read_sample, ChunkEngineBuilder, EngineError},
    storage::{
        chunk_key, index_map_key,
        storage_adapter::{
            performance_metrics::PerformanceMetricsStorageAdapter,
            usage_log::UsageLogStorageAdapter,
        },
        store::{FilesystemStore, MemoryStore},
        CacheChain, CacheChainError, CapacityTraits, ListableStorageTraits,
        ReadableStorageTraits, StorageProvider, StorageProviderTraits, StoreKey,
    },
};

fn bytes_array(num_bytes: usize) -> ArrayData {
    let bytes: Vec<u8> = (0..num_bytes).map(|i| (i % 251) as u8).collect();
    ArrayData::new_with_elements(vec![num_bytes as u64], &bytes).unwrap()
}

#[test]
fn cache_capacity_exhausted_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(MemoryStore::new());
    let tiers = [
        Arc::new(MemoryStore::new_with_capacity(100)),
        Arc::new(MemoryStore::new_with_capacity(1000)),
    ];
    let engine = ChunkEngineBuilder::new()
        .chunk_size(NonZeroUsize::new(4096).unwrap())
        .cache_tiers(tiers.iter().map(|tier| -> StorageProvider { tier.clone() }).collect())
        .build(backend.clone());
    let key = StoreKey::new("tensor")?;

    // fits in the second tier
    engine.write_sample(&key, &bytes_array(500), false)?;
    assert_eq!(tiers[0].used_space(), 0);
    assert_eq!(tiers[1].used_space(), 500);

    // 4096 byte chunks do not fit in any tier, even after flushing
    let result = engine.write_sample(&key, &bytes_array(5000), false);
    assert!(matches!(
        result,
        Err(EngineError::CacheChainError(CacheChainError::CapacityExhausted { .. }))
    ));
    assert!(!backend.contains(&chunk_key(&key, 1))?);
    assert_eq!(engine.num_samples(&key)?, 1);

    // the failed write did not disturb the key
    engine.write_sample(&key, &bytes_array(100), false)?;
    assert_eq!(engine.read_sample(&key, 0)?, bytes_array(500).normalize(false)?);
    assert_eq!(engine.read_sample(&key, 1)?, bytes_array(100).normalize(false)?);
    Ok(())
}

#[test]
fn cache_flush_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let backend = MemoryStore::new();
    let tier = Arc::new(MemoryStore::new_with_capacity(1024));
    let cache_chain = CacheChain::new(vec![tier.clone()]);

    cache_chain.flush(&backend)?;
    assert!(backend.is_empty());
    assert_eq!(cache_chain.used_space(), 0);

    let key = StoreKey::new("a/c0")?;
    cache_chain.write_with_caching(&key, vec![1u8; 10].into(), &backend)?;
    cache_chain.flush(&backend)?;
    let entries = backend.entries()?;
    cache_chain.flush(&backend)?;
    assert_eq!(backend.entries()?, entries);
    assert_eq!(tier.used_space(), 0);
    assert_eq!(cache_chain.used_space(), 0);
    Ok(())
}

#[test]
fn cache_flush_when_full() -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(MemoryStore::new());
    let tier = Arc::new(MemoryStore::new_with_capacity(10));
    let engine = ChunkEngineBuilder::new()
        .chunk_size(NonZeroUsize::new(4).unwrap())
        .cache_tiers(vec![tier.clone()])
        .build(backend.clone());
    let key = StoreKey::new("tensor")?;

    // 3 chunks (4 + 4 + 2 bytes) fill the tier
    engine.write_sample(&key, &bytes_array(10), false)?;
    assert_eq!(tier.used_space(), 10);
    assert!(!backend.contains(&chunk_key(&key, 0))?);

    // continuing the last chunk needs 2 more bytes, so the tier is flushed
    engine.write_sample(&key, &bytes_array(3), false)?;
    assert!(backend.contains(&chunk_key(&key, 0))?);
    assert!(tier.used_space() < 10);

    engine.flush()?;
    assert_eq!(tier.used_space(), 0);
    assert_eq!(read_sample(&key, 0, backend.as_ref())?, bytes_array(10).normalize(false)?);
    assert_eq!(read_sample(&key, 1, backend.as_ref())?, bytes_array(3).normalize(false)?);
    Ok(())
}

#[test]
fn filesystem_backend() -> Result<(), Box<dyn std::error::Error>> {
    let path = tempfile::TempDir::new()?;
    let key = StoreKey::new("group/tensor")?;
    {
        let backend = Arc::new(FilesystemStore::new(path.path())?);
        let engine = ChunkEngineBuilder::new()
            .chunk_size(NonZeroUsize::new(64).unwrap())
            .cache_tiers(vec![Arc::new(MemoryStore::new_with_capacity(256))])
            .build(backend);
        for num_bytes in [10, 100, 1000] {
            engine.write_sample(&key, &bytes_array(num_bytes), false)?;
        }
        engine.flush()?;
    }

    // reopen
    let backend = FilesystemStore::new(path.path())?;
    assert!(path.path().join("group/tensor/index_map").is_file());
    assert!(path.path().join("group/tensor/c0").is_file());
    assert!(backend.contains(&index_map_key(&key))?);
    assert_eq!(backend.list()?.len(), 1 + 1110usize.div_ceil(64));
    for (i, num_bytes) in [10, 100, 1000].into_iter().enumerate() {
        let sample = read_sample(&key, i as u64, &backend)?;
        assert_eq!(sample, bytes_array(num_bytes).normalize(false)?);
    }
    Ok(())
}

#[test]
fn usage_log_storage_adapter() -> Result<(), Box<dyn std::error::Error>> {
    let log = Arc::new(parking_lot::Mutex::new(Vec::<u8>::new()));
    let backend = Arc::new(UsageLogStorageAdapter::new(
        Arc::new(MemoryStore::new()),
        log.clone(),
        || "[usage] ".to_string(),
    ));
    let engine = ChunkEngineBuilder::new()
        .chunk_size(NonZeroUsize::new(8).unwrap())
        .build(backend);
    let key = StoreKey::new("tensor")?;
    engine.write_sample(&key, &bytes_array(12), false)?;
    engine.read_sample(&key, 0)?;

    let log = String::from_utf8(log.lock().clone())?;
    assert!(log.contains("[usage] get(tensor/index_map) -> len=Ok(None)"));
    assert!(log.contains("[usage] set(tensor/c0, len=8) -> Ok(())"));
    assert!(log.contains("[usage] set(tensor/c1, len=4) -> Ok(())"));
    assert!(log.lines().all(|line| line.starts_with("[usage] ")));
    Ok(())
}

#[test]
fn performance_metrics_storage_adapter() -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(PerformanceMetricsStorageAdapter::new(Arc::new(MemoryStore::new())));
    let engine = ChunkEngineBuilder::new()
        .chunk_size(NonZeroUsize::new(1024).unwrap())
        .build(backend.clone());
    let key = StoreKey::new("tensor")?;
    engine.write_sample(&key, &bytes_array(4096), false)?;
    // four chunks and the index map
    assert_eq!(backend.writes(), 5);
    assert!(backend.bytes_written() > 4096);

    let (reads, bytes_read) = (backend.reads(), backend.bytes_read());
    engine.read_sample(&key, 0)?;
    // the index map and four chunks
    assert_eq!(backend.reads() - reads, 5);
    assert!(backend.bytes_read() - bytes_read > 4096);
    assert_eq!(backend.writes(), 5);
    Ok(())
}
