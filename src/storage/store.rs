//! Stores.
//!
//! A [`MemoryStore`] is used for the bounded tiers of a [`CacheChain`](super::CacheChain) or as an ephemeral backend.
//! A [`FilesystemStore`] is a durable backend with one file per key.

mod filesystem_store;
mod memory_store;

pub use filesystem_store::{FilesystemStore, FilesystemStoreCreateError};
pub use memory_store::MemoryStore;
