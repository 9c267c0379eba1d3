//! Chunk engine global configuration options.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options for the chunk engine.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
/// Values are read when a [`ChunkEngineBuilder`](crate::engine::ChunkEngineBuilder) is created, so changes only affect engines built afterwards.
///
/// ## Chunk Size
/// > default: `16 MiB`
///
/// The size in bytes of every chunk except possibly the last chunk of a key.
///
/// ## Index Map Segment Entries
/// > default: `1024`
///
/// The number of index map entries held in the open tail of a key's index map before they are sealed into an immutable segment.
/// Smaller values make each index map rewrite cheaper, larger values reduce the number of stored segments.
///
/// ## Flush After Write
/// > default: [`false`]
///
/// If enabled, the cache chain is flushed to the durable backend at the end of every sample write.
/// Otherwise cached chunks stay in the cache chain until it runs out of space or is flushed explicitly.
///
/// ## Codec Concurrent Limit
/// > default: [`std::thread::available_parallelism`]`()`
///
/// The maximum number of chunks encoded or decoded concurrently within one sample write or read.
/// The concurrent limit is disabled if set to zero.
#[derive(Debug)]
pub struct Config {
    chunk_size: usize,
    index_map_segment_entries: usize,
    flush_after_write: bool,
    codec_concurrent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chunk_size: 16 * 1024 * 1024,
            index_map_segment_entries: 1024,
            flush_after_write: false,
            codec_concurrent_limit: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

impl Config {
    /// Get the [chunk size](#chunk-size) configuration.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Set the [chunk size](#chunk-size) configuration.
    ///
    /// A `chunk_size` of zero is ignored.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        if chunk_size > 0 {
            self.chunk_size = chunk_size;
        }
    }

    /// Get the [index map segment entries](#index-map-segment-entries) configuration.
    #[must_use]
    pub fn index_map_segment_entries(&self) -> usize {
        self.index_map_segment_entries
    }

    /// Set the [index map segment entries](#index-map-segment-entries) configuration.
    ///
    /// A value of zero is ignored.
    pub fn set_index_map_segment_entries(&mut self, entries: usize) {
        if entries > 0 {
            self.index_map_segment_entries = entries;
        }
    }

    /// Get the [flush after write](#flush-after-write) configuration.
    #[must_use]
    pub fn flush_after_write(&self) -> bool {
        self.flush_after_write
    }

    /// Set the [flush after write](#flush-after-write) configuration.
    pub fn set_flush_after_write(&mut self, flush_after_write: bool) {
        self.flush_after_write = flush_after_write;
    }

    /// Get the [codec concurrent limit](#codec-concurrent-limit) configuration.
    #[must_use]
    pub fn codec_concurrent_limit(&self) -> usize {
        self.codec_concurrent_limit
    }

    /// Set the [codec concurrent limit](#codec-concurrent-limit) configuration.
    pub fn set_codec_concurrent_limit(&mut self, concurrent_limit: usize) {
        self.codec_concurrent_limit = concurrent_limit;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global chunk engine configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global chunk engine configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}
