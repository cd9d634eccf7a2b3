//! Utilities for testing seed runs without real databases.
//!
//! - [`store`] wraps [`crate::store::memory::MemoryStore`] with injected failures, panics and
//!   latency.
//! - [`source`] provides record sources that fail after a fixed number of records.
//! - [`progress`] provides a progress sink that counts increments.
//! - [`hierarchy`] checks the ordering and shape of applied command streams.

use seed_config::shared::{QueueConfig, SeedConfig, SeedShapeConfig};

pub mod hierarchy;
pub mod progress;
pub mod source;
pub mod store;

/// Builds a seed configuration with default queues and no deadline.
pub fn seed_config(
    container_count: u64,
    groups_per_container: u64,
    items_per_group: u64,
) -> SeedConfig {
    SeedConfig {
        shape: SeedShapeConfig {
            container_count,
            groups_per_container,
            items_per_group,
        },
        queues: QueueConfig::default(),
        deadline_ms: None,
    }
}
