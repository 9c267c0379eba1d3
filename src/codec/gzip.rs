//! The `gzip` chunk codec.
//!
//! Applies gzip compression via [`flate2`].

use std::{
    io::{Cursor, Read},
    sync::Arc,
};

use derive_more::From;
use flate2::bufread::{GzDecoder, GzEncoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{metadata::Metadata, plugin::PluginCreateError};

use super::{ChunkCodec, ChunkCodecTraits, CodecError, CodecPlugin};

const IDENTIFIER: &str = "gzip";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_gzip, create_codec_gzip)
}

fn is_name_gzip(name: &str) -> bool {
    name.eq(IDENTIFIER)
}

fn create_codec_gzip(metadata: &Metadata) -> Result<ChunkCodec, PluginCreateError> {
    let configuration: GzipCodecConfiguration = metadata.to_configuration()?;
    let codec = GzipCodec::new(configuration.level).map_err(|err| err.to_string())?;
    Ok(Arc::new(codec))
}

/// `gzip` codec configuration parameters.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct GzipCodecConfiguration {
    /// The compression level, in `0..=9`.
    pub level: u32,
}

/// An invalid `gzip` compression level.
#[derive(Debug, Error, From)]
#[error("invalid gzip compression level {0}, must be in 0..=9")]
pub struct GzipCompressionLevelError(u32);

/// A `gzip` codec implementation.
#[derive(Clone, Debug)]
pub struct GzipCodec {
    compression_level: u32,
}

impl GzipCodec {
    /// Create a new `gzip` codec.
    ///
    /// # Errors
    /// Returns [`GzipCompressionLevelError`] if `compression_level` is not valid.
    pub fn new(compression_level: u32) -> Result<Self, GzipCompressionLevelError> {
        if compression_level > 9 {
            return Err(GzipCompressionLevelError(compression_level));
        }
        Ok(Self { compression_level })
    }
}

impl ChunkCodecTraits for GzipCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn create_metadata(&self) -> Metadata {
        let mut configuration = serde_json::Map::new();
        configuration.insert("level".to_string(), self.compression_level.into());
        Metadata::new_with_configuration(IDENTIFIER, configuration)
    }

    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = GzEncoder::new(
            Cursor::new(decoded_value),
            flate2::Compression::new(self.compression_level),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut decoder = GzDecoder::new(Cursor::new(encoded_value));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
