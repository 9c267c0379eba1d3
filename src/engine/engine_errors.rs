use thiserror::Error;

use crate::{
    array::ArrayError,
    codec::CodecError,
    plugin::PluginCreateError,
    storage::{CacheChainError, StorageError, StoreKey},
};

/// A chunk engine error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// A cache chain error.
    #[error(transparent)]
    CacheChainError(#[from] CacheChainError),
    /// A codec error.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// An array error.
    #[error(transparent)]
    ArrayError(#[from] ArrayError),
    /// A codec could not be created from the metadata recorded for a key.
    #[error(transparent)]
    PluginCreateError(#[from] PluginCreateError),
    /// The index map of a key could not be serialised or deserialised.
    #[error("index map serialization error: {_0}")]
    IndexMapSerialization(#[from] serde_json::Error),
    /// A key has no index map, so no samples have been written to it.
    #[error("index map not found for key {_0}")]
    IndexMapNotFound(StoreKey),
    /// The index map of a key is inconsistent with its stored chunks.
    #[error("index map of key {_0} is invalid: {_1}")]
    InvalidIndexMap(StoreKey, String),
    /// A sample index is out of range.
    #[error("sample index {index} is out of range for {num_samples} samples")]
    SampleIndexOutOfRange {
        /// The requested sample index.
        index: u64,
        /// The number of samples of the key.
        num_samples: u64,
    },
    /// An unsupported operation.
    #[error("unsupported operation: {_0}")]
    Unsupported(String),
}
