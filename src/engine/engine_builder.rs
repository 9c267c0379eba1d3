use std::{num::NonZeroUsize, sync::Arc};

use crate::{
    codec::{ChunkCodec, IdentityCodec},
    config::global_config,
    storage::{CacheChain, StorageProvider},
};

use super::ChunkEngine;

/// A [`ChunkEngine`] builder.
///
/// The builder is initialised from the [global configuration](crate::config::Config).
///  - The default codec is `identity`, so chunks are stored uncompressed.
///  - There are no cache tiers, so chunks are written straight to the durable backend.
///
/// Use the methods in the builder to change the configuration away from these defaults, and then build the engine over a durable backend with [`ChunkEngineBuilder::build`].
///
/// For example:
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # use std::{num::NonZeroUsize, sync::Arc};
/// use chunk_engine::{engine::ChunkEngineBuilder, storage::store::MemoryStore};
/// let backend = Arc::new(MemoryStore::new());
/// let engine = ChunkEngineBuilder::new()
///     .chunk_size(NonZeroUsize::new(4096).unwrap())
///     .cache_tiers(vec![Arc::new(MemoryStore::new_with_capacity(1 << 20))])
///     .flush_after_write(true)
///     .build(backend);
/// # #[cfg(feature = "zstd")]
/// let engine = ChunkEngineBuilder::new()
///     .codec(Arc::new(chunk_engine::codec::ZstdCodec::new(5)))
///     .build(Arc::new(MemoryStore::new()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChunkEngineBuilder {
    /// Chunk size for new keys.
    pub chunk_size: NonZeroUsize,
    /// Chunk codec.
    pub codec: ChunkCodec,
    /// Cache tiers, in the order they are tried.
    pub cache_tiers: Vec<StorageProvider>,
    /// Index map entries per sealed segment for new keys.
    pub index_map_segment_entries: NonZeroUsize,
    /// Flush the cache chain after every write.
    pub flush_after_write: bool,
    /// Maximum number of chunks encoded or decoded concurrently.
    pub codec_concurrent_limit: usize,
}

impl Default for ChunkEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkEngineBuilder {
    /// Create a new chunk engine builder from the global configuration.
    #[must_use]
    pub fn new() -> Self {
        let config = global_config();
        Self {
            chunk_size: NonZeroUsize::new(config.chunk_size()).unwrap_or(NonZeroUsize::MIN),
            codec: Arc::new(IdentityCodec::new()),
            cache_tiers: Vec::new(),
            index_map_segment_entries: NonZeroUsize::new(config.index_map_segment_entries())
                .unwrap_or(NonZeroUsize::MIN),
            flush_after_write: config.flush_after_write(),
            codec_concurrent_limit: config.codec_concurrent_limit(),
        }
    }

    /// Set the chunk size for new keys.
    ///
    /// Keys which already hold samples keep the chunk size they were created with.
    pub fn chunk_size(&mut self, chunk_size: NonZeroUsize) -> &mut Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the chunk codec.
    pub fn codec(&mut self, codec: ChunkCodec) -> &mut Self {
        self.codec = codec;
        self
    }

    /// Set the cache tiers.
    pub fn cache_tiers(&mut self, cache_tiers: Vec<StorageProvider>) -> &mut Self {
        self.cache_tiers = cache_tiers;
        self
    }

    /// Set the number of index map entries per sealed segment for new keys.
    pub fn index_map_segment_entries(&mut self, entries: NonZeroUsize) -> &mut Self {
        self.index_map_segment_entries = entries;
        self
    }

    /// Set whether the cache chain is flushed after every write.
    pub fn flush_after_write(&mut self, flush_after_write: bool) -> &mut Self {
        self.flush_after_write = flush_after_write;
        self
    }

    /// Set the codec concurrent limit.
    pub fn codec_concurrent_limit(&mut self, concurrent_limit: usize) -> &mut Self {
        self.codec_concurrent_limit = concurrent_limit;
        self
    }

    /// Build into a [`ChunkEngine`] over the durable `backend`.
    #[must_use]
    pub fn build(&self, backend: StorageProvider) -> ChunkEngine {
        ChunkEngine {
            backend,
            cache_chain: CacheChain::new(self.cache_tiers.clone()),
            codec: self.codec.clone(),
            chunk_size: self.chunk_size,
            index_map_segment_entries: self.index_map_segment_entries,
            flush_after_write: self.flush_after_write,
            codec_concurrent_limit: self.codec_concurrent_limit,
            key_locks: parking_lot::Mutex::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::store::MemoryStore;

    use super::*;

    #[test]
    fn engine_builder() {
        let mut builder = ChunkEngineBuilder::new();
        builder
            .chunk_size(NonZeroUsize::new(16).unwrap())
            .cache_tiers(vec![Arc::new(MemoryStore::new_with_capacity(64))])
            .flush_after_write(true)
            .codec_concurrent_limit(2);
        let engine = builder.build(Arc::new(MemoryStore::new()));
        assert_eq!(engine.chunk_size().get(), 16);
        assert_eq!(engine.codec().identifier(), "identity");
        assert_eq!(engine.cache_chain().tiers().len(), 1);
        assert!(engine.flush_after_write());
    }
}
