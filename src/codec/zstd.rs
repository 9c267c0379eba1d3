//! The `zstd` chunk codec.
//!
//! Applies [Zstandard](https://tools.ietf.org/html/rfc8878) compression.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ::zstd::zstd_safe;

use crate::{metadata::Metadata, plugin::PluginCreateError};

use super::{ChunkCodec, ChunkCodecTraits, CodecError, CodecPlugin};

const IDENTIFIER: &str = "zstd";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_zstd, create_codec_zstd)
}

fn is_name_zstd(name: &str) -> bool {
    name.eq(IDENTIFIER)
}

fn create_codec_zstd(metadata: &Metadata) -> Result<ChunkCodec, PluginCreateError> {
    let configuration: ZstdCodecConfiguration = metadata.to_configuration()?;
    Ok(Arc::new(ZstdCodec::new(configuration.level)))
}

/// `zstd` codec configuration parameters.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct ZstdCodecConfiguration {
    /// The compression level.
    pub level: zstd_safe::CompressionLevel,
}

/// A Zstd codec implementation.
#[derive(Clone, Debug)]
pub struct ZstdCodec {
    compression: zstd_safe::CompressionLevel,
}

impl ZstdCodec {
    /// Create a new `zstd` codec.
    #[must_use]
    pub const fn new(compression: zstd_safe::CompressionLevel) -> Self {
        Self { compression }
    }
}

impl ChunkCodecTraits for ZstdCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn create_metadata(&self) -> Metadata {
        let mut configuration = serde_json::Map::new();
        configuration.insert("level".to_string(), self.compression.into());
        Metadata::new_with_configuration(IDENTIFIER, configuration)
    }

    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        ::zstd::encode_all(decoded_value.as_slice(), self.compression).map_err(CodecError::IOError)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        ::zstd::decode_all(encoded_value.as_slice()).map_err(CodecError::IOError)
    }
}
