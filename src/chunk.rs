//! Chunk generation.
//!
//! [`generate_chunks`] splits the bytes of a sample into fixed size chunks.
//! A sample can continue the incomplete last chunk of the previous sample written to the same key: the first slice then holds just enough bytes to fill that chunk.
//!
//! ```
//! # use std::num::NonZeroUsize;
//! # use chunk_engine::chunk::generate_chunks;
//! let chunk_size = NonZeroUsize::new(4).unwrap();
//! let chunks: Vec<&[u8]> = generate_chunks(b"1234567", chunk_size, None).collect();
//! assert_eq!(chunks, [b"1234".as_slice(), b"567"]);
//!
//! // The last chunk holds 3 bytes, so the next sample fills it with one byte
//! let chunks: Vec<&[u8]> = generate_chunks(b"89", chunk_size, Some(3)).collect();
//! assert_eq!(chunks, [b"8".as_slice(), b"9"]);
//! ```

use std::{iter::FusedIterator, num::NonZeroUsize};

/// Returns a lazy iterator over the chunks of `bytes`.
///
/// `last_chunk_num_bytes` is the number of bytes in the last chunk of the key the bytes are appended to, if any.
/// If it is less than `chunk_size`, the first slice holds `min(chunk_size - last_chunk_num_bytes, bytes.len())` bytes and extends that chunk.
/// Every following slice is `chunk_size` bytes except the last, which holds the remainder.
///
/// No slices are produced for empty `bytes`.
#[must_use]
pub fn generate_chunks(
    bytes: &[u8],
    chunk_size: NonZeroUsize,
    last_chunk_num_bytes: Option<usize>,
) -> ChunkGenerator<'_> {
    ChunkGenerator::new(bytes, chunk_size, last_chunk_num_bytes)
}

/// An iterator over the chunks of a byte slice.
///
/// See [`generate_chunks`].
#[derive(Clone, Debug)]
pub struct ChunkGenerator<'a> {
    bytes: &'a [u8],
    chunk_size: usize,
    continuation_num_bytes: Option<usize>,
}

impl<'a> ChunkGenerator<'a> {
    /// Create a new chunk generator.
    #[must_use]
    pub fn new(
        bytes: &'a [u8],
        chunk_size: NonZeroUsize,
        last_chunk_num_bytes: Option<usize>,
    ) -> Self {
        let chunk_size = chunk_size.get();
        let continuation_num_bytes = last_chunk_num_bytes
            .filter(|&num_bytes| num_bytes > 0 && num_bytes < chunk_size)
            .map(|num_bytes| chunk_size - num_bytes);
        Self {
            bytes,
            chunk_size,
            continuation_num_bytes,
        }
    }

    /// Returns true if the next slice extends the last chunk of the key rather than starting a new chunk.
    #[must_use]
    pub fn continues_last_chunk(&self) -> bool {
        self.continuation_num_bytes.is_some() && !self.bytes.is_empty()
    }

    /// Returns the bytes that have not been yielded yet.
    #[must_use]
    pub const fn remainder(&self) -> &'a [u8] {
        self.bytes
    }
}

impl<'a> Iterator for ChunkGenerator<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }
        let len = self
            .continuation_num_bytes
            .take()
            .unwrap_or(self.chunk_size)
            .min(self.bytes.len());
        let (chunk, remainder) = self.bytes.split_at(len);
        self.bytes = remainder;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }
}

impl ExactSizeIterator for ChunkGenerator<'_> {
    fn len(&self) -> usize {
        if self.bytes.is_empty() {
            return 0;
        }
        match self.continuation_num_bytes {
            Some(first) if first >= self.bytes.len() => 1,
            Some(first) => 1 + (self.bytes.len() - first).div_ceil(self.chunk_size),
            None => self.bytes.len().div_ceil(self.chunk_size),
        }
    }
}

impl FusedIterator for ChunkGenerator<'_> {}
