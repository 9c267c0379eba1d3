//! The index map of a key.
//!
//! The index map records, for every sample written to a key, the range of chunks holding the sample bytes along with the data type and shape needed to reassemble it.
//! It also holds the state needed to append to the key: the chunk size, the running chunk count, and the length of the last chunk.
//!
//! The bytes of every sample written to a key form one contiguous byte stream, split into chunks of `chunk_size` bytes.
//! So a sample is fully located by its byte offset in that stream, and consecutive samples may share their boundary chunk.
//!
//! Entries are held in an open tail at `<key>/index_map`.
//! When the tail holds `entries_per_segment` entries, they are sealed into an immutable segment at `<key>/index/<segment>` and the tail is cleared.
//! This bounds the size of the blob rewritten on every append.

use std::num::NonZeroUsize;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{
    array::{num_bytes, ArrayShape, DataType},
    metadata::Metadata,
    storage::{
        index_map_key, index_segment_key, Bytes, ReadableStorageTraits, StoreKey,
        WritableStorageTraits,
    },
};

use super::EngineError;

/// An index map entry describing one sample.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct IndexEntry {
    /// The index of the chunk holding the first byte of the sample.
    pub start_chunk: u64,
    /// The index of the chunk holding the last byte of the sample.
    ///
    /// Equal to `start_chunk` for a sample with no bytes.
    pub end_chunk: u64,
    /// The offset of the first byte of the sample within `start_chunk`.
    pub start_byte: u64,
    /// The data type of the sample.
    pub data_type: DataType,
    /// The normalised shape of the sample.
    pub shape: ArrayShape,
}

impl IndexEntry {
    /// Create the entry of a sample of `num_bytes` bytes starting at byte `offset` of the byte stream of a key.
    #[must_use]
    pub fn new(
        offset: u64,
        num_bytes: u64,
        chunk_size: u64,
        data_type: DataType,
        shape: ArrayShape,
    ) -> Self {
        let start_chunk = offset / chunk_size;
        let end_chunk = if num_bytes == 0 {
            start_chunk
        } else {
            (offset + num_bytes - 1) / chunk_size
        };
        Self {
            start_chunk,
            end_chunk,
            start_byte: offset % chunk_size,
            data_type,
            shape,
        }
    }

    /// Returns the number of bytes of the sample.
    ///
    /// # Errors
    /// Returns an [`ArrayError`](crate::array::ArrayError) if the shape is too large.
    pub fn num_bytes(&self) -> Result<u64, crate::array::ArrayError> {
        num_bytes(&self.shape, self.data_type)
    }
}

/// The index map metadata of a key.
///
/// An example `JSON` document after writing two `[1, 3]` `uint8` samples with a chunk size of `4`:
/// ```json
/// {
///     "codec": {
///         "name": "zstd",
///         "configuration": {
///             "level": 5
///         }
///     },
///     "chunk_size": 4,
///     "num_chunks": 2,
///     "last_chunk_num_bytes": 2,
///     "data_type": "uint8",
///     "entries_per_segment": 1024,
///     "num_segments": 0,
///     "entries": [
///         {"start_chunk": 0, "end_chunk": 0, "start_byte": 0, "data_type": "uint8", "shape": [1, 3]},
///         {"start_chunk": 0, "end_chunk": 1, "start_byte": 3, "data_type": "uint8", "shape": [1, 3]}
///     ]
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct IndexMapMetadata {
    /// The codec applied to every full chunk.
    pub codec: Metadata,
    /// The size of every chunk except possibly the last.
    pub chunk_size: u64,
    /// The number of chunks.
    pub num_chunks: u64,
    /// The number of bytes in the last chunk, zero if there are no chunks.
    ///
    /// The last chunk is stored without encoding if this is less than `chunk_size`.
    pub last_chunk_num_bytes: u64,
    /// The data type of the samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    /// The number of entries in a sealed segment.
    pub entries_per_segment: u64,
    /// The number of sealed segments.
    pub num_segments: u64,
    /// The entries which are not part of a sealed segment.
    pub entries: Vec<IndexEntry>,
}

impl IndexMapMetadata {
    /// Create the index map of an empty key.
    #[must_use]
    pub fn new(
        codec: Metadata,
        chunk_size: NonZeroUsize,
        entries_per_segment: NonZeroUsize,
    ) -> Self {
        Self {
            codec,
            chunk_size: chunk_size.get() as u64,
            num_chunks: 0,
            last_chunk_num_bytes: 0,
            data_type: None,
            entries_per_segment: entries_per_segment.get() as u64,
            num_segments: 0,
            entries: Vec::new(),
        }
    }

    /// Returns the number of samples.
    #[must_use]
    pub fn num_samples(&self) -> u64 {
        self.num_segments * self.entries_per_segment + self.entries.len() as u64
    }

    /// Returns the total number of sample bytes written to the key.
    #[must_use]
    pub fn num_bytes(&self) -> u64 {
        if self.num_chunks == 0 {
            0
        } else {
            (self.num_chunks - 1) * self.chunk_size + self.last_chunk_num_bytes
        }
    }

    /// Returns the chunk size.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidIndexMap`] if the chunk size is zero or cannot be addressed on this platform.
    pub fn chunk_size(&self, key: &StoreKey) -> Result<NonZeroUsize, EngineError> {
        usize::try_from(self.chunk_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                EngineError::InvalidIndexMap(
                    key.clone(),
                    format!("unsupported chunk size {}", self.chunk_size),
                )
            })
    }

    /// Returns the length of the last chunk if it is incomplete.
    #[must_use]
    pub fn incomplete_chunk_num_bytes(&self) -> Option<u64> {
        (self.num_chunks > 0 && self.last_chunk_num_bytes < self.chunk_size)
            .then_some(self.last_chunk_num_bytes)
    }

    /// Returns true if chunk `chunk_index` is stored encoded.
    ///
    /// Every chunk is encoded except an incomplete last chunk.
    #[must_use]
    pub fn is_chunk_encoded(&self, chunk_index: u64) -> bool {
        chunk_index + 1 < self.num_chunks || self.last_chunk_num_bytes == self.chunk_size
    }

    /// Append `entry`.
    ///
    /// If the tail becomes full, it is sealed and returned along with its segment index.
    /// The segment must be stored before the index map.
    pub fn push(&mut self, entry: IndexEntry) -> Option<(u64, Vec<IndexEntry>)> {
        self.entries.push(entry);
        if self.entries.len() as u64 >= self.entries_per_segment {
            let segment = self.num_segments;
            self.num_segments += 1;
            tracing::debug!(
                "sealing index map segment {segment} with {} entries",
                self.entries.len()
            );
            Some((segment, std::mem::take(&mut self.entries)))
        } else {
            None
        }
    }

    fn validate(&self, key: &StoreKey) -> Result<(), EngineError> {
        let invalid = |reason: &str| EngineError::InvalidIndexMap(key.clone(), reason.to_string());
        self.chunk_size(key)?;
        if self.entries_per_segment == 0 {
            Err(invalid("entries_per_segment must be greater than zero"))
        } else if self.entries.len() as u64 >= self.entries_per_segment {
            Err(invalid("the open segment exceeds entries_per_segment"))
        } else if self.last_chunk_num_bytes > self.chunk_size {
            Err(invalid("last_chunk_num_bytes exceeds chunk_size"))
        } else if (self.num_chunks == 0) != (self.last_chunk_num_bytes == 0) {
            Err(invalid("last_chunk_num_bytes is inconsistent with num_chunks"))
        } else {
            Ok(())
        }
    }

    /// Load the index map of `key` from `storage`.
    ///
    /// Returns [`None`] if no samples have been written to `key`.
    ///
    /// # Errors
    /// Returns an [`EngineError`] if the index map cannot be read or is invalid.
    pub fn load<TStorage: ?Sized + ReadableStorageTraits>(
        storage: &TStorage,
        key: &StoreKey,
    ) -> Result<Option<Self>, EngineError> {
        let Some(bytes) = storage.get(&index_map_key(key))? else {
            return Ok(None);
        };
        let index_map: Self = serde_json::from_slice(&bytes)?;
        index_map.validate(key)?;
        Ok(Some(index_map))
    }

    /// Store the index map of `key` in `storage`.
    ///
    /// # Errors
    /// Returns an [`EngineError`] if the index map cannot be serialised or written.
    pub fn store<TStorage: ?Sized + WritableStorageTraits>(
        &self,
        storage: &TStorage,
        key: &StoreKey,
    ) -> Result<(), EngineError> {
        let bytes = serde_json::to_vec(self)?;
        storage.set(&index_map_key(key), Bytes::from(bytes))?;
        Ok(())
    }

    /// Store sealed segment `segment` of `key` in `storage`.
    ///
    /// # Errors
    /// Returns an [`EngineError`] if the segment cannot be serialised or written.
    pub fn store_segment<TStorage: ?Sized + WritableStorageTraits>(
        storage: &TStorage,
        key: &StoreKey,
        segment: u64,
        entries: &[IndexEntry],
    ) -> Result<(), EngineError> {
        let bytes = serde_json::to_vec(entries)?;
        storage.set(&index_segment_key(key, segment), Bytes::from(bytes))?;
        Ok(())
    }

    /// Retrieve the entry of sample `index`, reading its sealed segment from `storage` if needed.
    ///
    /// # Errors
    /// Returns [`EngineError::SampleIndexOutOfRange`] if `index` is not less than the number of samples.
    /// Returns an [`EngineError`] if a sealed segment is missing or cannot be read.
    pub fn entry<TStorage: ?Sized + ReadableStorageTraits>(
        &self,
        storage: &TStorage,
        key: &StoreKey,
        index: u64,
    ) -> Result<IndexEntry, EngineError> {
        let num_samples = self.num_samples();
        if index >= num_samples {
            return Err(EngineError::SampleIndexOutOfRange { index, num_samples });
        }

        let segment = index / self.entries_per_segment;
        let offset = usize::try_from(index % self.entries_per_segment)
            .map_err(|_| EngineError::SampleIndexOutOfRange { index, num_samples })?;
        if segment == self.num_segments {
            return Ok(self.entries[offset].clone());
        }

        let segment_key = index_segment_key(key, segment);
        let bytes = storage.get(&segment_key)?.ok_or_else(|| {
            EngineError::InvalidIndexMap(key.clone(), format!("missing segment {segment_key}"))
        })?;
        let mut entries: Vec<IndexEntry> = serde_json::from_slice(&bytes)?;
        if entries.len() as u64 != self.entries_per_segment {
            return Err(EngineError::InvalidIndexMap(
                key.clone(),
                format!("segment {segment_key} has {} entries", entries.len()),
            ));
        }
        Ok(entries.swap_remove(offset))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::storage::{store::MemoryStore, ReadableStorageTraits};

    use super::*;

    fn index_map(chunk_size: usize, entries_per_segment: usize) -> IndexMapMetadata {
        IndexMapMetadata::new(
            Metadata::new("identity"),
            NonZeroUsize::new(chunk_size).unwrap(),
            NonZeroUsize::new(entries_per_segment).unwrap(),
        )
    }

    #[test]
    fn index_entry_location() {
        let entry = IndexEntry::new(0, 3, 4, DataType::UInt8, vec![1, 3]);
        assert_eq!((entry.start_chunk, entry.end_chunk, entry.start_byte), (0, 0, 0));
        let entry = IndexEntry::new(3, 3, 4, DataType::UInt8, vec![1, 3]);
        assert_eq!((entry.start_chunk, entry.end_chunk, entry.start_byte), (0, 1, 3));
        let entry = IndexEntry::new(8, 9, 4, DataType::UInt8, vec![1, 9]);
        assert_eq!((entry.start_chunk, entry.end_chunk, entry.start_byte), (2, 4, 0));
        let entry = IndexEntry::new(6, 0, 4, DataType::UInt8, vec![1, 0]);
        assert_eq!((entry.start_chunk, entry.end_chunk, entry.start_byte), (1, 1, 2));
        assert_eq!(entry.num_bytes().unwrap(), 0);
    }

    #[test]
    fn index_map_chunk_state() {
        let mut index_map = index_map(4, 8);
        assert_eq!(index_map.num_bytes(), 0);
        assert_eq!(index_map.incomplete_chunk_num_bytes(), None);

        index_map.num_chunks = 2;
        index_map.last_chunk_num_bytes = 3;
        assert_eq!(index_map.num_bytes(), 7);
        assert_eq!(index_map.incomplete_chunk_num_bytes(), Some(3));
        assert!(index_map.is_chunk_encoded(0));
        assert!(!index_map.is_chunk_encoded(1));

        index_map.last_chunk_num_bytes = 4;
        assert_eq!(index_map.incomplete_chunk_num_bytes(), None);
        assert!(index_map.is_chunk_encoded(1));
    }

    #[test]
    fn index_map_segments() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        let key = StoreKey::new("tensor")?;
        let mut index_map = index_map(4, 2);
        for i in 0..5 {
            let entry = IndexEntry::new(i, 1, 4, DataType::UInt8, vec![1, 1]);
            if let Some((segment, entries)) = index_map.push(entry) {
                IndexMapMetadata::store_segment(&store, &key, segment, &entries)?;
            }
        }
        assert_eq!(index_map.num_segments, 2);
        assert_eq!(index_map.entries.len(), 1);
        assert_eq!(index_map.num_samples(), 5);
        index_map.store(&store, &key)?;
        assert!(store.contains(&StoreKey::new("tensor/index/0")?)?);
        assert!(store.contains(&StoreKey::new("tensor/index/1")?)?);
        assert!(!store.contains(&StoreKey::new("tensor/index/2")?)?);

        let loaded = IndexMapMetadata::load(&store, &key)?.unwrap();
        assert_eq!(loaded, index_map);
        for i in 0..5 {
            let entry = loaded.entry(&store, &key, i)?;
            assert_eq!(entry.start_chunk, i / 4);
            assert_eq!(entry.start_byte, i % 4);
        }
        assert!(matches!(
            loaded.entry(&store, &key, 5),
            Err(EngineError::SampleIndexOutOfRange {
                index: 5,
                num_samples: 5
            })
        ));

        store.erase(&StoreKey::new("tensor/index/1")?)?;
        assert!(matches!(
            loaded.entry(&store, &key, 2),
            Err(EngineError::InvalidIndexMap(..))
        ));
        Ok(())
    }

    #[test]
    fn index_map_load() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        let key = StoreKey::new("tensor")?;
        assert!(IndexMapMetadata::load(&store, &key)?.is_none());

        let mut index_map = index_map(4, 2);
        index_map.num_chunks = 1;
        index_map.store(&store, &key)?;
        assert!(matches!(
            IndexMapMetadata::load(&store, &key),
            Err(EngineError::InvalidIndexMap(..))
        ));

        store.set(&index_map_key(&key), Bytes::from_static(b"{}"))?;
        assert!(matches!(
            IndexMapMetadata::load(&store, &key),
            Err(EngineError::IndexMapSerialization(_))
        ));
        Ok(())
    }

    #[test]
    fn index_map_json() -> Result<(), Box<dyn Error>> {
        let mut index_map = index_map(4, 1024);
        index_map.data_type = Some(DataType::UInt8);
        index_map.push(IndexEntry::new(0, 3, 4, DataType::UInt8, vec![1, 3]));
        let json = index_map.to_string();
        assert!(json.starts_with(r#"{"codec":"identity","chunk_size":4,"num_chunks":0"#));
        assert!(json.contains(r#""data_type":"uint8""#));
        let parsed: IndexMapMetadata = serde_json::from_str(&json)?;
        assert_eq!(parsed, index_map);
        Ok(())
    }
}
