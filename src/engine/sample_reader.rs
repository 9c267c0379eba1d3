use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;

use crate::{
    array::ArrayData,
    codec::{codec_from_metadata, ChunkCodec, CodecError},
    storage::{chunk_key, CacheChain, StorageError, StorageProviderTraits, StoreKey},
};

use super::{
    index_map::{IndexEntry, IndexMapMetadata},
    resolve_codec, EngineError,
};

/// Reads samples from the cache chain and the durable backend.
pub(crate) struct SampleReader<'a> {
    pub backend: &'a dyn StorageProviderTraits,
    pub cache_chain: &'a CacheChain,
    pub codec: Option<&'a ChunkCodec>,
    pub codec_concurrent_limit: usize,
}

impl SampleReader<'_> {
    /// Load the index map of `key`.
    pub fn index_map(&self, key: &StoreKey) -> Result<IndexMapMetadata, EngineError> {
        IndexMapMetadata::load(self.backend, key)?
            .ok_or_else(|| EngineError::IndexMapNotFound(key.clone()))
    }

    /// Read sample `sample_index` of `key`.
    pub fn read(&self, key: &StoreKey, sample_index: u64) -> Result<ArrayData, EngineError> {
        let index_map = self.index_map(key)?;
        let entry = index_map.entry(self.backend, key, sample_index)?;
        let bytes = self.read_entry_bytes(key, &index_map, &entry)?;
        Ok(ArrayData::new(entry.data_type, entry.shape, bytes)?)
    }

    /// Fetch and decode the chunks of `entry`, and extract its bytes.
    fn read_entry_bytes(
        &self,
        key: &StoreKey,
        index_map: &IndexMapMetadata,
        entry: &IndexEntry,
    ) -> Result<Vec<u8>, EngineError> {
        let num_bytes = entry.num_bytes()?;
        if num_bytes == 0 {
            return Ok(Vec::new());
        }
        if entry.end_chunk >= index_map.num_chunks || entry.start_chunk > entry.end_chunk {
            return Err(EngineError::InvalidIndexMap(
                key.clone(),
                format!(
                    "chunks {}..={} are out of range for {} chunks",
                    entry.start_chunk, entry.end_chunk, index_map.num_chunks
                ),
            ));
        }

        let codec = match self.codec {
            Some(codec) => resolve_codec(codec, &index_map.codec)?,
            None => codec_from_metadata(&index_map.codec)?,
        };
        let chunk_size = index_map.chunk_size(key)?.get();

        let chunk_indices: Vec<u64> = (entry.start_chunk..=entry.end_chunk).collect();
        let concurrent_limit = match self.codec_concurrent_limit {
            0 => chunk_indices.len(),
            limit => limit,
        };
        let retrieve_chunk = |chunk_index: u64| -> Result<Vec<u8>, EngineError> {
            let key = chunk_key(key, chunk_index);
            let encoded = self
                .cache_chain
                .get_through(&key, self.backend)?
                .ok_or(StorageError::KeyNotFound(key))?;
            if !index_map.is_chunk_encoded(chunk_index) {
                return Ok(encoded.to_vec());
            }
            let decoded = codec.decode(encoded.to_vec())?;
            if decoded.len() == chunk_size {
                Ok(decoded)
            } else {
                Err(CodecError::UnexpectedChunkDecodedSize(decoded.len(), chunk_size).into())
            }
        };
        let chunks = iter_concurrent_limit!(concurrent_limit, chunk_indices, map, retrieve_chunk)
            .collect::<Result<Vec<_>, EngineError>>()?;

        let bytes = chunks.concat();
        let start = usize::try_from(entry.start_byte).unwrap_or(usize::MAX);
        let end = usize::try_from(num_bytes)
            .ok()
            .and_then(|num_bytes| start.checked_add(num_bytes));
        match end {
            Some(end) if end <= bytes.len() => {
                tracing::trace!(
                    "read {num_bytes} bytes from chunks {}..={} of {key}",
                    entry.start_chunk,
                    entry.end_chunk
                );
                Ok(bytes[start..end].to_vec())
            }
            _ => Err(EngineError::InvalidIndexMap(
                key.clone(),
                format!(
                    "a sample of {num_bytes} bytes at byte {} of chunk {} exceeds the stored chunks",
                    entry.start_byte, entry.start_chunk
                ),
            )),
        }
    }
}
