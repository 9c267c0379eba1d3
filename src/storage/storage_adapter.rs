//! Storage adapters.
//!
//! Storage adapters can be layered on stores, including the durable backend and the tiers of a [`CacheChain`](super::CacheChain).

pub mod performance_metrics;
pub mod usage_log;
