use parking_lot::Mutex;
use thiserror::Error;

use super::{Bytes, MaybeBytes, StorageError, StorageProvider, StorageProviderTraits, StoreKey};

/// A cache chain error.
#[derive(Debug, Error)]
pub enum CacheChainError {
    /// A value could not be placed in any tier even after flushing the chain.
    ///
    /// The value is larger than the capacity of the largest tier.
    #[error("caching failed even after flushing: {size} bytes for {key} do not fit in any cache tier")]
    CapacityExhausted {
        /// The key.
        key: StoreKey,
        /// The size of the value.
        size: u64,
    },
    /// An underlying storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

/// An ordered sequence of [storage providers](StorageProvider) used as write buffers in front of a durable backend.
///
/// Writes are placed in the first tier with space for them (first-fit).
/// When no tier has space, the chain is flushed to the backend and placement is retried once.
///
/// An empty chain writes straight through to the backend.
///
/// Cached values are invisible to a reader that only consults the backend, so readers should use [`CacheChain::get`] before falling back to the backend, or the chain must be [flushed](CacheChain::flush) first.
#[derive(Debug)]
pub struct CacheChain {
    tiers: Vec<StorageProvider>,
    write_lock: Mutex<()>,
}

impl Default for CacheChain {
    fn default() -> Self {
        Self::new(vec![])
    }
}

impl CacheChain {
    /// Create a new cache chain from `tiers`, in the order they are tried.
    #[must_use]
    pub fn new(tiers: Vec<StorageProvider>) -> Self {
        Self {
            tiers,
            write_lock: Mutex::default(),
        }
    }

    /// Returns the tiers of the chain.
    #[must_use]
    pub fn tiers(&self) -> &[StorageProvider] {
        &self.tiers
    }

    /// Returns true if the chain has no tiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Returns the total number of bytes held across all tiers.
    #[must_use]
    pub fn used_space(&self) -> u64 {
        self.tiers.iter().map(|tier| tier.used_space()).sum()
    }

    /// Returns the largest value size the chain can accept after a flush.
    ///
    /// Returns [`None`] if there is no limit, which is the case for an empty chain or a chain with an unbounded tier.
    #[must_use]
    pub fn largest_capacity(&self) -> Option<u64> {
        let mut largest = None;
        for tier in &self.tiers {
            let capacity = tier.capacity()?;
            largest = Some(largest.map_or(capacity, |largest: u64| largest.max(capacity)));
        }
        largest
    }

    /// Write `value` at `key` through the chain.
    ///
    /// # Errors
    /// Returns [`CacheChainError::CapacityExhausted`] if `value` does not fit in any tier even after flushing the chain to `backend`.
    /// Nothing is written for `key` in that case.
    /// Returns [`CacheChainError::StorageError`] if a tier or the backend fails.
    pub fn write_with_caching(
        &self,
        key: &StoreKey,
        value: Bytes,
        backend: &dyn StorageProviderTraits,
    ) -> Result<(), CacheChainError> {
        if self.tiers.is_empty() {
            backend.set(key, value)?;
            return Ok(());
        }

        let _lock = self.write_lock.lock();
        if let Some(tier) = self.place(key, &value)? {
            tracing::debug!("cached {key} ({} bytes) in tier {tier}", value.len());
            return Ok(());
        }

        tracing::debug!(
            "no cache tier has space for {key} ({} bytes), flushing",
            value.len()
        );
        self.flush_impl(backend)?;
        if let Some(tier) = self.place(key, &value)? {
            tracing::debug!("cached {key} ({} bytes) in tier {tier}", value.len());
            Ok(())
        } else {
            Err(CacheChainError::CapacityExhausted {
                key: key.clone(),
                size: value.len() as u64,
            })
        }
    }

    /// Place `value` in the first tier with space for it and remove stale copies of `key` from every other tier.
    ///
    /// Returns the index of the tier, or [`None`] if no tier accepted the value.
    fn place(&self, key: &StoreKey, value: &Bytes) -> Result<Option<usize>, StorageError> {
        let size = value.len() as u64;
        let mut placed = None;
        for (index, tier) in self.tiers.iter().enumerate() {
            if !tier.has_space(size) {
                continue;
            }
            match tier.set(key, value.clone()) {
                Ok(()) => {
                    placed = Some(index);
                    break;
                }
                Err(StorageError::CapacityExceeded { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        if let Some(placed) = placed {
            for (index, tier) in self.tiers.iter().enumerate() {
                if index != placed {
                    tier.erase(key)?;
                }
            }
        }
        Ok(placed)
    }

    /// Transfer every cached value to `backend` and empty every tier.
    ///
    /// Each value is removed from its tier immediately after it has been written to the backend.
    /// Flushing an empty chain does nothing.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if a tier or the backend fails.
    /// Values transferred before the failure are removed from the chain, the rest remain cached.
    pub fn flush(&self, backend: &dyn StorageProviderTraits) -> Result<(), StorageError> {
        let _lock = self.write_lock.lock();
        self.flush_impl(backend)
    }

    fn flush_impl(&self, backend: &dyn StorageProviderTraits) -> Result<(), StorageError> {
        for (index, tier) in self.tiers.iter().enumerate() {
            let entries = tier.entries()?;
            if entries.is_empty() {
                continue;
            }
            tracing::debug!("flushing {} values from cache tier {index}", entries.len());
            for (key, value) in entries {
                backend.set(&key, value)?;
                tier.erase(&key)?;
            }
        }
        Ok(())
    }

    /// Retrieve the value of `key` from the first tier holding it.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if a tier fails.
    pub fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        for tier in &self.tiers {
            if let Some(value) = tier.get(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Retrieve the value of `key` from the chain, falling back to `backend`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if a tier or the backend fails.
    pub fn get_through(
        &self,
        key: &StoreKey,
        backend: &dyn StorageProviderTraits,
    ) -> Result<MaybeBytes, StorageError> {
        match self.get(key)? {
            Some(value) => Ok(Some(value)),
            None => backend.get(key),
        }
    }

    /// Returns true if any tier holds `key`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if a tier fails.
    pub fn contains(&self, key: &StoreKey) -> Result<bool, StorageError> {
        for tier in &self.tiers {
            if tier.contains(key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
