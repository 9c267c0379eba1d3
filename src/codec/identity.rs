//! The `identity` chunk codec.

use std::sync::Arc;

use crate::{metadata::Metadata, plugin::PluginCreateError};

use super::{ChunkCodec, ChunkCodecTraits, CodecError, CodecPlugin};

const IDENTIFIER: &str = "identity";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_identity, create_codec_identity)
}

fn is_name_identity(name: &str) -> bool {
    name.eq(IDENTIFIER)
}

fn create_codec_identity(_metadata: &Metadata) -> Result<ChunkCodec, PluginCreateError> {
    Ok(Arc::new(IdentityCodec))
}

/// A codec which stores chunks unmodified.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityCodec;

impl IdentityCodec {
    /// Create a new `identity` codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ChunkCodecTraits for IdentityCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn create_metadata(&self) -> Metadata {
        Metadata::new(IDENTIFIER)
    }

    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(decoded_value)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(encoded_value)
    }
}
