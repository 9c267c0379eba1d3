//! A chunk codec defined by a pair of functions.

use crate::metadata::Metadata;

use super::{ChunkCodecTraits, CodecError};

/// A `bytes -> bytes` transform.
pub type TransformFn = fn(Vec<u8>) -> Result<Vec<u8>, CodecError>;

/// A chunk codec built from a caller supplied compress function and its inverse.
///
/// A [`FunctionCodec`] is not a registered codec plugin.
/// Keys written with it record `identifier` in their index map, and can only be read by an engine configured with a codec of the same identifier.
#[derive(Clone, Debug)]
pub struct FunctionCodec {
    identifier: &'static str,
    encode_fn: TransformFn,
    decode_fn: TransformFn,
}

impl FunctionCodec {
    /// Create a new function codec.
    #[must_use]
    pub const fn new(
        identifier: &'static str,
        encode_fn: TransformFn,
        decode_fn: TransformFn,
    ) -> Self {
        Self {
            identifier,
            encode_fn,
            decode_fn,
        }
    }
}

impl ChunkCodecTraits for FunctionCodec {
    fn identifier(&self) -> &'static str {
        self.identifier
    }

    fn create_metadata(&self) -> Metadata {
        Metadata::new(self.identifier)
    }

    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        (self.encode_fn)(decoded_value)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        (self.decode_fn)(encoded_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reverse(mut bytes: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        bytes.reverse();
        Ok(bytes)
    }

    #[test]
    fn codec_function_round_trip() {
        let codec = FunctionCodec::new("reverse", reverse, reverse);
        assert_eq!(codec.identifier(), "reverse");
        assert_eq!(codec.create_metadata(), Metadata::new("reverse"));
        let encoded = codec.encode(vec![1, 2, 3]).unwrap();
        assert_eq!(encoded, vec![3, 2, 1]);
        assert_eq!(codec.decode(encoded).unwrap(), vec![1, 2, 3]);
    }
}
