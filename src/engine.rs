//! The chunk engine.
//!
//! A [`ChunkEngine`] appends array samples to keys of a durable storage backend and reads them back by index.
//!
//! Writing a sample:
//!  - normalises its shape with [`normalize_shape`](crate::array::normalize_shape),
//!  - splits its bytes into chunks with [`generate_chunks`](crate::chunk::generate_chunks), continuing the incomplete last chunk of the key if there is one,
//!  - encodes every full chunk with the engine [codec](crate::codec),
//!  - writes the chunks through the [`CacheChain`], and
//!  - appends an [`IndexEntry`] per sample to the [index map](index_map) of the key, which is written to the durable backend last.
//!
//! Reading a sample loads its index entry, fetches its chunks from the cache chain or the durable backend, decodes them, and reassembles the sample.
//!
//! Chunks held by the cache chain are not durable until the chain is flushed with [`ChunkEngine::flush`], either explicitly or when it runs out of space.
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # use std::{num::NonZeroUsize, sync::Arc};
//! use chunk_engine::{
//!     array::ArrayData,
//!     engine::ChunkEngineBuilder,
//!     storage::{store::MemoryStore, StoreKey},
//! };
//! let backend = Arc::new(MemoryStore::new());
//! let engine = ChunkEngineBuilder::new()
//!     .chunk_size(NonZeroUsize::new(4096).unwrap())
//!     .build(backend);
//!
//! let key = StoreKey::new("images")?;
//! let image = ArrayData::new_with_elements(vec![3, 28, 28], &vec![0u8; 3 * 28 * 28])?;
//! let samples = engine.write_sample(&key, &image, false)?;
//! assert_eq!(samples, 0..1);
//!
//! let sample = engine.read_sample(&key, 0)?;
//! assert_eq!(sample.shape(), &[1, 3, 28, 28]);
//! engine.flush()?;
//! # Ok(())
//! # }
//! ```

mod engine_builder;
mod engine_errors;
pub mod index_map;
mod sample_reader;
mod sample_writer;

pub use engine_builder::ChunkEngineBuilder;
pub use engine_errors::EngineError;
pub use index_map::{IndexEntry, IndexMapMetadata};

use std::{collections::HashMap, num::NonZeroUsize, ops::Range, sync::Arc};

use parking_lot::Mutex;

use crate::{
    array::{ArrayData, Element},
    codec::{codec_from_metadata, ChunkCodec},
    config::global_config,
    metadata::Metadata,
    storage::{CacheChain, StorageProvider, StorageProviderTraits, StoreKey},
};

use sample_reader::SampleReader;
use sample_writer::SampleWriter;

/// A chunk engine.
///
/// Writes to a key are serialised with a per-key lock, so multiple threads can share an engine.
/// Reads of a key also take its lock, since a concurrent write may rewrite the incomplete last chunk of the key.
/// The engine cannot serialise writers in other engines or processes sharing the same backend.
///
/// Dropping the engine flushes its cache chain to the backend.
#[derive(Debug)]
pub struct ChunkEngine {
    backend: StorageProvider,
    cache_chain: CacheChain,
    codec: ChunkCodec,
    chunk_size: NonZeroUsize,
    index_map_segment_entries: NonZeroUsize,
    flush_after_write: bool,
    codec_concurrent_limit: usize,
    key_locks: Mutex<HashMap<StoreKey, Arc<Mutex<()>>>>,
}

impl ChunkEngine {
    /// Create a chunk engine over the durable `backend` with the default configuration.
    ///
    /// See [`ChunkEngineBuilder`].
    #[must_use]
    pub fn new(backend: StorageProvider) -> Self {
        ChunkEngineBuilder::new().build(backend)
    }

    /// Returns the durable backend.
    #[must_use]
    pub fn backend(&self) -> &StorageProvider {
        &self.backend
    }

    /// Returns the cache chain.
    #[must_use]
    pub const fn cache_chain(&self) -> &CacheChain {
        &self.cache_chain
    }

    /// Returns the codec.
    #[must_use]
    pub fn codec(&self) -> &ChunkCodec {
        &self.codec
    }

    /// Returns the chunk size for new keys.
    #[must_use]
    pub const fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }

    /// Returns true if the cache chain is flushed after every write.
    #[must_use]
    pub const fn flush_after_write(&self) -> bool {
        self.flush_after_write
    }

    fn key_mutex(&self, key: &StoreKey) -> Arc<Mutex<()>> {
        self.key_locks.lock().entry(key.clone()).or_default().clone()
    }

    fn writer(&self) -> SampleWriter<'_> {
        SampleWriter {
            backend: self.backend.as_ref(),
            cache_chain: &self.cache_chain,
            codec: &self.codec,
            chunk_size: self.chunk_size,
            index_map_segment_entries: self.index_map_segment_entries,
            codec_concurrent_limit: self.codec_concurrent_limit,
        }
    }

    fn reader(&self) -> SampleReader<'_> {
        SampleReader {
            backend: self.backend.as_ref(),
            cache_chain: &self.cache_chain,
            codec: Some(&self.codec),
            codec_concurrent_limit: self.codec_concurrent_limit,
        }
    }

    /// Append `array` to `key`.
    ///
    /// If `batched` is true, the leading dimension of `array` indexes samples and one sample is appended per row.
    /// Otherwise `array` is appended as a single sample.
    /// Returns the indices of the appended samples.
    ///
    /// # Errors
    /// Returns an [`EngineError`] if:
    ///  - `batched` is true and `array` has no dimensions,
    ///  - the data type of `array` differs from that of the samples already in `key`,
    ///  - a chunk does not fit in any cache tier, in which case nothing is written, or
    ///  - there is an underlying codec or storage error.
    pub fn write_sample(
        &self,
        key: &StoreKey,
        array: &ArrayData,
        batched: bool,
    ) -> Result<Range<u64>, EngineError> {
        let mutex = self.key_mutex(key);
        let _lock = mutex.lock();
        let samples = self.writer().write(key, array, batched)?;
        if self.flush_after_write {
            self.cache_chain.flush(self.backend.as_ref())?;
        }
        Ok(samples)
    }

    /// Read sample `sample_index` of `key`.
    ///
    /// The returned array has the normalised shape recorded when the sample was written.
    ///
    /// # Errors
    /// Returns an [`EngineError`] if:
    ///  - `key` has no index map,
    ///  - `sample_index` is out of range,
    ///  - the codec recorded for `key` is not supported, or
    ///  - there is an underlying codec or storage error.
    pub fn read_sample(
        &self,
        key: &StoreKey,
        sample_index: u64,
    ) -> Result<ArrayData, EngineError> {
        let mutex = self.key_mutex(key);
        let _lock = mutex.lock();
        self.reader().read(key, sample_index)
    }

    /// Read sample `sample_index` of `key` into a vector of elements.
    ///
    /// # Errors
    /// Returns an [`EngineError`] if the sample cannot be read or `T` does not match its data type.
    pub fn read_sample_elements<T: Element>(
        &self,
        key: &StoreKey,
        sample_index: u64,
    ) -> Result<Vec<T>, EngineError> {
        Ok(self.read_sample(key, sample_index)?.to_elements::<T>()?)
    }

    #[cfg(feature = "ndarray")]
    /// Read sample `sample_index` of `key` into an [`ndarray::ArrayD`].
    ///
    /// # Errors
    /// Returns an [`EngineError`] if the sample cannot be read or `T` does not match its data type.
    pub fn read_sample_ndarray<T: Element>(
        &self,
        key: &StoreKey,
        sample_index: u64,
    ) -> Result<ndarray::ArrayD<T>, EngineError> {
        Ok(self.read_sample(key, sample_index)?.to_ndarray::<T>()?)
    }

    /// Returns the number of samples in `key`, zero if nothing has been written to it.
    ///
    /// # Errors
    /// Returns an [`EngineError`] if the index map of `key` cannot be read.
    pub fn num_samples(&self, key: &StoreKey) -> Result<u64, EngineError> {
        Ok(IndexMapMetadata::load(self.backend.as_ref(), key)?
            .as_ref()
            .map_or(0, IndexMapMetadata::num_samples))
    }

    /// Transfer every chunk held by the cache chain to the durable backend.
    ///
    /// # Errors
    /// Returns an [`EngineError`] if a cache tier or the backend fails.
    pub fn flush(&self) -> Result<(), EngineError> {
        self.cache_chain.flush(self.backend.as_ref())?;
        Ok(())
    }
}

impl Drop for ChunkEngine {
    /// Flush the cache chain, so index maps in the backend never outlive the chunks they reference.
    fn drop(&mut self) {
        if let Err(err) = self.cache_chain.flush(self.backend.as_ref()) {
            tracing::error!("failed to flush the cache chain of a dropped chunk engine: {err}");
        }
    }
}

/// Append `array` to `key` of `backend` through `cache_chain`.
///
/// This is the free-standing form of [`ChunkEngine::write_sample`].
/// New keys are created with `chunk_size` and the [global configuration](crate::config::Config).
/// Writes to the same key must be serialised by the caller.
/// The index map is written to `backend` directly, so `cache_chain` must be flushed before the samples are read from `backend` alone.
///
/// # Errors
/// See [`ChunkEngine::write_sample`].
pub fn write_sample(
    array: &ArrayData,
    key: &StoreKey,
    codec: &ChunkCodec,
    chunk_size: NonZeroUsize,
    backend: &dyn StorageProviderTraits,
    cache_chain: &CacheChain,
    batched: bool,
) -> Result<Range<u64>, EngineError> {
    let config = global_config();
    let writer = SampleWriter {
        backend,
        cache_chain,
        codec,
        chunk_size,
        index_map_segment_entries: NonZeroUsize::new(config.index_map_segment_entries())
            .unwrap_or(NonZeroUsize::MIN),
        codec_concurrent_limit: config.codec_concurrent_limit(),
    };
    drop(config);
    writer.write(key, array, batched)
}

/// Read sample `sample_index` of `key` from `backend`.
///
/// This is the free-standing form of [`ChunkEngine::read_sample`].
/// Only the durable backend is consulted, so the cache chain the sample was written through must have been flushed.
/// The codec is recreated from the metadata recorded in the index map of `key`.
///
/// # Errors
/// See [`ChunkEngine::read_sample`].
pub fn read_sample(
    key: &StoreKey,
    sample_index: u64,
    backend: &dyn StorageProviderTraits,
) -> Result<ArrayData, EngineError> {
    let cache_chain = CacheChain::default();
    let reader = SampleReader {
        backend,
        cache_chain: &cache_chain,
        codec: None,
        codec_concurrent_limit: global_config().codec_concurrent_limit(),
    };
    reader.read(key, sample_index)
}

/// Return `codec` if it matches the codec `metadata` recorded for a key, otherwise create the recorded codec.
fn resolve_codec(codec: &ChunkCodec, metadata: &Metadata) -> Result<ChunkCodec, EngineError> {
    if codec.identifier() == metadata.name() {
        Ok(codec.clone())
    } else {
        codec_from_metadata(metadata).map_err(|_| {
            EngineError::Unsupported(format!(
                "the codec {metadata} recorded for the key is not registered and differs from the engine codec {}",
                codec.identifier()
            ))
        })
    }
}
