use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Number of records produced at each level of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedShapeConfig {
    pub container_count: u64,
    pub groups_per_container: u64,
    pub items_per_group: u64,
}

impl SeedShapeConfig {
    /// Total number of insert commands each store receives for this shape.
    ///
    /// Exact for any shape accepted by [`SeedConfig::validate`], saturates at `u64::MAX`
    /// otherwise.
    pub fn total_work_units(&self) -> u64 {
        self.checked_total_work_units().unwrap_or(u64::MAX)
    }

    /// Same as [`SeedShapeConfig::total_work_units`], returning `None` on overflow.
    pub fn checked_total_work_units(&self) -> Option<u64> {
        let groups = self.container_count.checked_mul(self.groups_per_container)?;
        let items = groups.checked_mul(self.items_per_group)?;

        self.container_count.checked_add(groups)?.checked_add(items)
    }
}

/// Capacities of the bounded queues between pipeline units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "QueueConfig::default_container_capacity")]
    pub container_capacity: usize,
    #[serde(default = "QueueConfig::default_group_capacity")]
    pub group_capacity: usize,
    #[serde(default = "QueueConfig::default_item_capacity")]
    pub item_capacity: usize,
    /// Capacity of each of the two command queues feeding the ingestion workers.
    #[serde(default = "QueueConfig::default_command_capacity")]
    pub command_capacity: usize,
}

impl QueueConfig {
    pub const DEFAULT_CONTAINER_CAPACITY: usize = 10;
    pub const DEFAULT_GROUP_CAPACITY: usize = 200;
    pub const DEFAULT_ITEM_CAPACITY: usize = 200;
    pub const DEFAULT_COMMAND_CAPACITY: usize = 1000;

    fn default_container_capacity() -> usize {
        Self::DEFAULT_CONTAINER_CAPACITY
    }

    fn default_group_capacity() -> usize {
        Self::DEFAULT_GROUP_CAPACITY
    }

    fn default_item_capacity() -> usize {
        Self::DEFAULT_ITEM_CAPACITY
    }

    fn default_command_capacity() -> usize {
        Self::DEFAULT_COMMAND_CAPACITY
    }

    /// Tokio channels panic on a zero capacity, so every queue must hold at least one element.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let capacities = [
            ("container_capacity", self.container_capacity),
            ("group_capacity", self.group_capacity),
            ("item_capacity", self.item_capacity),
            ("command_capacity", self.command_capacity),
        ];

        for (name, capacity) in capacities {
            if capacity == 0 {
                return Err(ValidationError::ZeroQueueCapacity(name));
            }
        }

        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            container_capacity: Self::DEFAULT_CONTAINER_CAPACITY,
            group_capacity: Self::DEFAULT_GROUP_CAPACITY,
            item_capacity: Self::DEFAULT_ITEM_CAPACITY,
            command_capacity: Self::DEFAULT_COMMAND_CAPACITY,
        }
    }
}

/// Settings of a single seed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedConfig {
    pub shape: SeedShapeConfig,
    #[serde(default)]
    pub queues: QueueConfig,
    /// Optional wall clock budget after which the run is cancelled.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl SeedConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.queues.validate()?;

        if self.shape.checked_total_work_units().is_none() {
            return Err(ValidationError::ShapeTooLarge);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_work_units_counts_every_level() {
        let shape = SeedShapeConfig {
            container_count: 2,
            groups_per_container: 2,
            items_per_group: 2,
        };

        assert_eq!(shape.total_work_units(), 14);
    }

    #[test]
    fn empty_shape_has_no_work() {
        let shape = SeedShapeConfig {
            container_count: 0,
            groups_per_container: 1000,
            items_per_group: 10,
        };

        assert_eq!(shape.total_work_units(), 0);
    }

    #[test]
    fn overflowing_shape_is_rejected() {
        let config = SeedConfig {
            shape: SeedShapeConfig {
                container_count: u64::MAX / 2,
                groups_per_container: 3,
                items_per_group: 1,
            },
            queues: QueueConfig::default(),
            deadline_ms: None,
        };

        assert_eq!(config.shape.checked_total_work_units(), None);
        assert_eq!(config.shape.total_work_units(), u64::MAX);
        assert_eq!(config.validate(), Err(ValidationError::ShapeTooLarge));
    }

    #[test]
    fn overflow_in_the_final_sum_is_detected() {
        let shape = SeedShapeConfig {
            container_count: u64::MAX / 2,
            groups_per_container: 1,
            items_per_group: 1,
        };

        assert_eq!(shape.checked_total_work_units(), None);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let queues = QueueConfig {
            group_capacity: 0,
            ..QueueConfig::default()
        };

        assert_eq!(
            queues.validate(),
            Err(ValidationError::ZeroQueueCapacity("group_capacity"))
        );
    }

    #[test]
    fn queues_fall_back_to_defaults() {
        let config: SeedConfig = serde_json::from_str(
            r#"{"shape": {"container_count": 1, "groups_per_container": 1, "items_per_group": 1}, "queues": {"item_capacity": 5}}"#,
        )
        .unwrap();

        assert_eq!(config.queues.item_capacity, 5);
        assert_eq!(config.queues.container_capacity, 10);
        assert_eq!(config.queues.command_capacity, 1000);
        assert_eq!(config.deadline_ms, None);
    }
}
