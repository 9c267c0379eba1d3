//! A filesystem store.

use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use walkdir::WalkDir;

use crate::storage::{
    Bytes, CapacityTraits, ListableStorageTraits, MaybeBytes, ReadableStorageTraits,
    StorageError, StoreKey, StoreKeyError, StoreKeys, StorePrefix, WritableStorageTraits,
};

/// A synchronous file system store.
///
/// Each key is stored in a file at `<base_path>/<key>`.
/// The store is unbounded, so it is suitable as the durable backend of the [engine](crate::engine).
#[derive(Debug)]
pub struct FilesystemStore {
    base_path: PathBuf,
    readonly: bool,
    files: Mutex<HashMap<StoreKey, Arc<RwLock<()>>>>,
}

impl FilesystemStore {
    /// Create a new file system store at a given `base_path`.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `base_directory`:
    ///   - is not valid, or
    ///   - it points to an existing file rather than a directory.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, FilesystemStoreCreateError> {
        let base_path = base_path.as_ref().to_path_buf();
        if base_path.to_str().is_none() || base_path.is_file() {
            return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
        }

        let readonly = if base_path.exists() {
            // the path already exists, check if it is read only
            let md = std::fs::metadata(&base_path).map_err(FilesystemStoreCreateError::IOError)?;
            md.permissions().readonly()
        } else {
            // the path does not exist, so try and create it. If this succeeds, the filesystem is not read only
            std::fs::create_dir_all(&base_path).map_err(FilesystemStoreCreateError::IOError)?;
            std::fs::remove_dir(&base_path)?;
            false
        };

        Ok(Self {
            base_path,
            readonly,
            files: Mutex::default(),
        })
    }

    /// Returns the base path of the store.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Maps a [`StoreKey`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn key_to_fspath(&self, key: &StoreKey) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(key.as_str());
        path
    }

    /// Maps a filesystem [`PathBuf`] to a [`StoreKey`].
    fn fspath_to_key(&self, path: &Path) -> Result<StoreKey, StoreKeyError> {
        let path = pathdiff::diff_paths(path, &self.base_path)
            .ok_or_else(|| StoreKeyError::from(path.to_string_lossy().to_string()))?;
        let path_str = path.to_string_lossy().replace('\\', "/");
        StoreKey::new(path_str)
    }

    /// Maps a store [`StorePrefix`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn prefix_to_fs_path(&self, prefix: &StorePrefix) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(prefix.as_str());
        path
    }

    fn get_file_mutex(&self, key: &StoreKey) -> Arc<RwLock<()>> {
        self.files
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::default()))
            .clone()
    }

    fn walk_files(path: PathBuf) -> impl Iterator<Item = walkdir::DirEntry> {
        WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
    }
}

impl ReadableStorageTraits for FilesystemStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let file = self.get_file_mutex(key);
        let _lock = file.read();

        let mut file = match File::open(self.key_to_fspath(key)) {
            Ok(file) => file,
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    return Ok(None);
                }
                return Err(err.into());
            }
        };
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(Some(Bytes::from(buffer)))
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let key_path = self.key_to_fspath(key);
        match std::fs::metadata(key_path) {
            Ok(metadata) if metadata.is_file() => Ok(Some(metadata.len())),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl WritableStorageTraits for FilesystemStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }

        let file = self.get_file_mutex(key);
        let _lock = file.write();

        // Create directories
        let key_path = self.key_to_fspath(key);
        if let Some(parent) = key_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(key_path)?;
        file.write_all(&value)?;
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }

        let file = self.get_file_mutex(key);
        let _lock = file.write();

        match std::fs::remove_file(self.key_to_fspath(key)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }

        let _lock = self.files.lock(); // lock all operations

        let prefix_path = self.prefix_to_fs_path(prefix);
        let result = if prefix.as_str().is_empty() {
            // keep the base directory
            std::fs::read_dir(&prefix_path).and_then(|dir| {
                dir.map(|entry| {
                    let path = entry?.path();
                    if path.is_dir() {
                        std::fs::remove_dir_all(path)
                    } else {
                        std::fs::remove_file(path)
                    }
                })
                .collect::<std::io::Result<()>>()
            })
        } else {
            std::fs::remove_dir_all(prefix_path)
        };
        match result {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

impl ListableStorageTraits for FilesystemStore {
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        Ok(Self::walk_files(self.prefix_to_fs_path(prefix))
            .filter_map(|entry| self.fspath_to_key(entry.path()).ok())
            .collect())
    }
}

impl CapacityTraits for FilesystemStore {
    fn capacity(&self) -> Option<u64> {
        None
    }

    fn used_space(&self) -> u64 {
        Self::walk_files(self.base_path.clone())
            .filter_map(|entry| entry.metadata().ok())
            .map(|metadata| metadata.len())
            .sum()
    }
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The path is not valid on this system.
    #[error("base path {0} is not valid")]
    InvalidBasePath(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store_test;
    use std::error::Error;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn filesystem() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        store_test::store_write(&store)?;
        store_test::store_read(&store)?;
        store_test::store_list(&store)?;
        store_test::store_entries(&store)?;
        assert!(store.has_space(u64::MAX));
        assert_eq!(
            store.key_to_fspath(&"a/b".try_into()?),
            path.path().join("a").join("b")
        );
        Ok(())
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn filesystem_reopen() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        {
            let store = FilesystemStore::new(path.path())?;
            store.set(&"images/c0".try_into()?, vec![1, 2, 3].into())?;
        }
        let store = FilesystemStore::new(path.path())?;
        assert_eq!(store.get(&"images/c0".try_into()?)?, Some(vec![1, 2, 3].into()));
        Ok(())
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn filesystem_invalid_base_path() -> Result<(), Box<dyn Error>> {
        let file = tempfile::NamedTempFile::new()?;
        assert!(FilesystemStore::new(file.path()).is_err());
        Ok(())
    }
}
