//! A rust library for storing numeric array samples as fixed size chunks in pluggable key-value stores.
//!
//! Samples (images, tensors, etc.) are appended to a key and read back individually by index, without loading the rest of the key into memory.
//! The bytes of every sample written to a key form one stream, which is split into chunks of a fixed size.
//! Full chunks are compressed with a pluggable [codec](crate::codec) and written through a [cache chain](crate::storage::CacheChain) of bounded stores before reaching the durable backend.
//! An [index map](crate::engine::index_map) per key records which chunks hold each sample, along with its data type and shape.
//!
//! ## Getting Started
//! - [`engine::ChunkEngine`] and [`storage`] are good places to start.
//! - Stores: [`MemoryStore`](storage::store::MemoryStore) and [`FilesystemStore`](storage::store::FilesystemStore).
//! - Storage adapters: [`UsageLogStorageAdapter`](storage::storage_adapter::usage_log::UsageLogStorageAdapter) logs every storage call, [`PerformanceMetricsStorageAdapter`](storage::storage_adapter::performance_metrics::PerformanceMetricsStorageAdapter) counts bytes and operations.
//!
//! ## Example
//! ```rust
//! # use std::sync::Arc;
//! use chunk_engine::{
//!     array::ArrayData,
//!     engine::ChunkEngineBuilder,
//!     storage::{store::MemoryStore, StoreKey},
//! };
//! let backend = Arc::new(MemoryStore::new());
//! let cache = Arc::new(MemoryStore::new_with_capacity(64 * 1024 * 1024));
//! let engine = ChunkEngineBuilder::new()
//!     .cache_tiers(vec![cache])
//!     .build(backend);
//!
//! // A batch of ten 3x100x100 samples
//! let batch = ArrayData::new_with_elements(vec![10, 3, 100, 100, 1], &vec![0.5f32; 10 * 3 * 100 * 100])?;
//! let key = StoreKey::new("images")?;
//! assert_eq!(engine.write_sample(&key, &batch, true)?, 0..10);
//!
//! let sample = engine.read_sample(&key, 3)?;
//! assert_eq!(sample.shape(), &[1, 3, 100, 100]);
//!
//! // Move cached chunks to the durable backend
//! engine.flush()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate Features
//! #### Default
//!  - `ndarray`: [`ndarray`] utility functions for [`ArrayData`](crate::array::ArrayData) and [`ChunkEngine`](crate::engine::ChunkEngine).
//!  - Codecs: `gzip`, `zstd`.
//!
//! ## Logging
//! The crate emits [`tracing`] events for cache placement, cache flushes, chunk continuation, and index map segment sealing.
//! No subscriber is installed.
//!
//! ## Licence
//! `chunk_engine` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod array;
pub mod chunk;
pub mod codec;
pub mod config;
pub mod engine;
pub mod metadata;
pub mod plugin;
pub mod storage;
