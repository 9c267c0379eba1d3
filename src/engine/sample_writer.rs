use std::{num::NonZeroUsize, ops::Range};

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;

use crate::{
    array::{normalize_shape, num_bytes, ArrayData, ArrayError, ArrayShape},
    chunk::generate_chunks,
    codec::{ChunkCodec, CodecError},
    storage::{
        chunk_key, Bytes, CacheChain, CacheChainError, StorageError, StorageProviderTraits,
        StoreKey,
    },
};

use super::{
    index_map::{IndexEntry, IndexMapMetadata},
    resolve_codec, EngineError,
};

/// Appends samples to keys through a cache chain.
///
/// A sample writer does not serialise writes to the same key.
pub(crate) struct SampleWriter<'a> {
    pub backend: &'a dyn StorageProviderTraits,
    pub cache_chain: &'a CacheChain,
    pub codec: &'a ChunkCodec,
    pub chunk_size: NonZeroUsize,
    pub index_map_segment_entries: NonZeroUsize,
    pub codec_concurrent_limit: usize,
}

/// A chunk prepared for writing.
struct StagedChunk {
    index: u64,
    num_bytes: usize,
    encoded: Vec<u8>,
}

impl SampleWriter<'_> {
    /// Append `array` to `key`, returning the indices of the appended samples.
    pub fn write(
        &self,
        key: &StoreKey,
        array: &ArrayData,
        batched: bool,
    ) -> Result<Range<u64>, EngineError> {
        let shape = normalize_shape(array.shape(), batched)?;
        let data_type = array.data_type();

        let mut index_map = IndexMapMetadata::load(self.backend, key)?.unwrap_or_else(|| {
            IndexMapMetadata::new(
                self.codec.create_metadata(),
                self.chunk_size,
                self.index_map_segment_entries,
            )
        });
        match index_map.data_type {
            Some(key_data_type) if key_data_type != data_type => {
                return Err(EngineError::Unsupported(format!(
                    "cannot write {data_type} samples to key {key} with data type {key_data_type}"
                )));
            }
            _ => {}
        }
        let codec = resolve_codec(self.codec, &index_map.codec)?;
        let chunk_size = index_map.chunk_size(key)?;

        // Stage every chunk before any I/O
        let staged = self.stage_chunks(key, &index_map, &codec, array.bytes(), chunk_size)?;
        if let Some(capacity) = self.cache_chain.largest_capacity() {
            if let Some(chunk) = staged
                .iter()
                .find(|chunk| chunk.encoded.len() as u64 > capacity)
            {
                return Err(CacheChainError::CapacityExhausted {
                    key: chunk_key(key, chunk.index),
                    size: chunk.encoded.len() as u64,
                }
                .into());
            }
        }

        let offset = index_map.num_bytes();
        if let Some(last) = staged.last() {
            index_map.num_chunks = last.index + 1;
            index_map.last_chunk_num_bytes = last.num_bytes as u64;
        }
        for chunk in staged {
            self.cache_chain.write_with_caching(
                &chunk_key(key, chunk.index),
                Bytes::from(chunk.encoded),
                self.backend,
            )?;
        }

        // Append one entry per row of the normalised array
        let (&num_samples, sample_shape) =
            shape.split_first().ok_or(ArrayError::BatchedScalar)?;
        let sample_shape: ArrayShape = std::iter::once(1)
            .chain(sample_shape.iter().copied())
            .collect();
        let sample_num_bytes = num_bytes(&sample_shape, data_type)?;
        let first_sample = index_map.num_samples();
        for sample in 0..num_samples {
            let entry = IndexEntry::new(
                offset + sample * sample_num_bytes,
                sample_num_bytes,
                index_map.chunk_size,
                data_type,
                sample_shape.clone(),
            );
            if let Some((segment, entries)) = index_map.push(entry) {
                IndexMapMetadata::store_segment(self.backend, key, segment, &entries)?;
            }
        }
        index_map.data_type = Some(data_type);
        index_map.store(self.backend, key)?;

        tracing::debug!(
            "wrote {num_samples} samples of shape {sample_shape:?} to {key}, {} chunks",
            index_map.num_chunks
        );
        Ok(first_sample..first_sample + num_samples)
    }

    /// Split `bytes` into chunks continuing the last chunk of `key`, and encode every full chunk.
    fn stage_chunks(
        &self,
        key: &StoreKey,
        index_map: &IndexMapMetadata,
        codec: &ChunkCodec,
        bytes: &[u8],
        chunk_size: NonZeroUsize,
    ) -> Result<Vec<StagedChunk>, EngineError> {
        let incomplete_chunk_num_bytes = index_map.incomplete_chunk_num_bytes();
        let generator = generate_chunks(
            bytes,
            chunk_size,
            incomplete_chunk_num_bytes.and_then(|num_bytes| usize::try_from(num_bytes).ok()),
        );
        let continues_last_chunk = generator.continues_last_chunk();
        let first_chunk = if continues_last_chunk {
            index_map.num_chunks - 1
        } else {
            index_map.num_chunks
        };

        let mut decoded_chunks = Vec::with_capacity(generator.len());
        for (i, slice) in generator.enumerate() {
            let index = first_chunk + i as u64;
            if i == 0 && continues_last_chunk {
                let last_chunk_key = chunk_key(key, index);
                let last_chunk = self
                    .cache_chain
                    .get_through(&last_chunk_key, self.backend)?
                    .ok_or_else(|| StorageError::KeyNotFound(last_chunk_key.clone()))?;
                if Some(last_chunk.len() as u64) != incomplete_chunk_num_bytes {
                    return Err(EngineError::InvalidIndexMap(
                        key.clone(),
                        format!(
                            "chunk {last_chunk_key} has {} bytes, expected {}",
                            last_chunk.len(),
                            index_map.last_chunk_num_bytes
                        ),
                    ));
                }
                tracing::trace!(
                    "continuing chunk {last_chunk_key} ({} bytes) with {} bytes",
                    last_chunk.len(),
                    slice.len()
                );
                let mut chunk = Vec::with_capacity(last_chunk.len() + slice.len());
                chunk.extend_from_slice(&last_chunk);
                chunk.extend_from_slice(slice);
                decoded_chunks.push((index, chunk));
            } else {
                decoded_chunks.push((index, slice.to_vec()));
            }
        }

        let concurrent_limit = match self.codec_concurrent_limit {
            0 => decoded_chunks.len().max(1),
            limit => limit,
        };
        let chunk_size = chunk_size.get();
        iter_concurrent_limit!(concurrent_limit, decoded_chunks, map, |(index, chunk)| {
            let num_bytes = chunk.len();
            let encoded = if num_bytes == chunk_size {
                codec.encode(chunk)?
            } else {
                chunk
            };
            Ok::<_, CodecError>(StagedChunk {
                index,
                num_bytes,
                encoded,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(EngineError::from)
    }
}
