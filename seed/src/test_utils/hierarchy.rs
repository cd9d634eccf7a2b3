use std::collections::HashSet;
use uuid::Uuid;

use seed_config::shared::SeedShapeConfig;

use crate::types::{InsertCommand, RecordLevel};

/// Levels of the command stream produced by a complete walk of `shape`.
pub fn expected_levels(shape: &SeedShapeConfig) -> Vec<RecordLevel> {
    let mut levels = Vec::new();

    for _ in 0..shape.container_count {
        levels.push(RecordLevel::Container);
        for _ in 0..shape.groups_per_container {
            levels.push(RecordLevel::Group);
            for _ in 0..shape.items_per_group {
                levels.push(RecordLevel::Item);
            }
        }
    }

    levels
}

/// Checks that every command references a parent applied earlier in the stream.
pub fn check_ordering(commands: &[InsertCommand]) -> Result<(), String> {
    let mut containers: HashSet<Uuid> = HashSet::new();
    let mut groups: HashSet<Uuid> = HashSet::new();

    for (position, command) in commands.iter().enumerate() {
        match command {
            InsertCommand::InsertContainer { record } => {
                containers.insert(record.id);
            }
            InsertCommand::InsertGroup {
                container_id,
                record,
            } => {
                if !containers.contains(container_id) {
                    return Err(format!(
                        "group {} at position {position} precedes its container {container_id}",
                        record.id
                    ));
                }
                groups.insert(record.id);
            }
            InsertCommand::InsertItem { group_id, record } => {
                if !groups.contains(group_id) {
                    return Err(format!(
                        "item {} at position {position} precedes its group {group_id}",
                        record.id
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Returns `true` when `shorter` is a prefix of `longer`.
pub fn is_prefix(shorter: &[InsertCommand], longer: &[InsertCommand]) -> bool {
    shorter.len() <= longer.len() && shorter == &longer[..shorter.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SyntheticRecord;
    use std::sync::Arc;

    fn record() -> Arc<SyntheticRecord> {
        Arc::new(SyntheticRecord::new("Name.".into(), "Body.".into()))
    }

    #[test]
    fn orphan_item_is_reported() {
        let commands = vec![InsertCommand::InsertItem {
            group_id: Uuid::new_v4(),
            record: record(),
        }];

        assert!(check_ordering(&commands).is_err());
    }

    #[test]
    fn expected_levels_follow_the_nested_walk() {
        let shape = SeedShapeConfig {
            container_count: 1,
            groups_per_container: 2,
            items_per_group: 1,
        };

        assert_eq!(
            expected_levels(&shape),
            vec![
                RecordLevel::Container,
                RecordLevel::Group,
                RecordLevel::Item,
                RecordLevel::Group,
                RecordLevel::Item,
            ]
        );
    }
}
