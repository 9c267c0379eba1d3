//! Chunk codecs.
//!
//! A chunk codec is a bidirectional `bytes -> bytes` transform applied to every *full* chunk before it is written (encode) and after it is read (decode).
//! The trailing incomplete chunk of a key is never encoded, since a later sample may still extend it.
//!
//! Codecs are opaque to the engine. The following are included:
//!  - [`IdentityCodec`]: stores chunks unmodified.
//!  - [`GzipCodec`] (feature `gzip`): gzip compression via [`flate2`].
//!  - [`ZstdCodec`] (feature `zstd`): Zstandard compression via [`zstd`](::zstd).
//!  - [`FunctionCodec`]: wraps a caller supplied pair of compress/decompress functions.
//!
//! Every codec except [`FunctionCodec`] is registered as a [`CodecPlugin`], so it can be recreated from the [`Metadata`] recorded in a key's index map with [`codec_from_metadata`].

mod function;
mod identity;

#[cfg(feature = "gzip")]
mod gzip;
#[cfg(feature = "zstd")]
mod zstd;

pub use function::{FunctionCodec, TransformFn};
pub use identity::IdentityCodec;

#[cfg(feature = "gzip")]
pub use gzip::{GzipCodec, GzipCodecConfiguration, GzipCompressionLevelError};
#[cfg(feature = "zstd")]
pub use self::zstd::{ZstdCodec, ZstdCodecConfiguration};

use std::sync::Arc;

use thiserror::Error;

use crate::{
    metadata::Metadata,
    plugin::{Plugin, PluginCreateError},
};

/// A codec plugin.
pub type CodecPlugin = Plugin<ChunkCodec>;
inventory::collect!(CodecPlugin);

/// An [`Arc`] wrapped chunk codec.
pub type ChunkCodec = Arc<dyn ChunkCodecTraits>;

/// Chunk codec traits.
pub trait ChunkCodecTraits: core::fmt::Debug + Send + Sync {
    /// Returns the identifier of the codec.
    fn identifier(&self) -> &'static str;

    /// Create the metadata recorded in the index map of keys written with this codec.
    fn create_metadata(&self) -> Metadata;

    /// Encode a full chunk.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the codec fails.
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError>;

    /// Decode a full chunk.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the codec fails or `encoded_value` is malformed.
    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError>;
}

/// Create a chunk codec from metadata.
///
/// # Errors
///
/// Returns [`PluginCreateError`] if the metadata is invalid or not associated with a registered codec plugin.
pub fn codec_from_metadata(metadata: &Metadata) -> Result<ChunkCodec, PluginCreateError> {
    for plugin in inventory::iter::<CodecPlugin> {
        if plugin.match_name(metadata.name()) {
            return plugin.create(metadata);
        }
    }
    Err(PluginCreateError::Unsupported {
        name: metadata.name().to_string(),
        plugin_type: "codec".to_string(),
    })
}

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The decoded size of a chunk did not match what was expected.
    #[error("the size of a decoded chunk is {_0}, expected {_1}")]
    UnexpectedChunkDecodedSize(usize, usize),
    /// Other
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for CodecError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_from_metadata_identity() {
        let codec = codec_from_metadata(&Metadata::new("identity")).unwrap();
        assert_eq!(codec.identifier(), "identity");
        assert_eq!(codec.encode(vec![1, 2, 3]).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn codec_from_metadata_unsupported() {
        let err = codec_from_metadata(&Metadata::new("lz5")).unwrap_err();
        assert_eq!(err.to_string(), "codec lz5 is not supported");
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn codec_from_metadata_recreates_configuration() {
        let codec = ZstdCodec::new(7);
        let metadata = codec.create_metadata();
        let recreated = codec_from_metadata(&metadata).unwrap();
        assert_eq!(recreated.create_metadata(), metadata);
    }
}
