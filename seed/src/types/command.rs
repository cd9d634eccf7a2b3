use std::sync::Arc;
use uuid::Uuid;

use crate::types::{RecordLevel, SyntheticRecord};

/// A single insertion to apply to a store.
///
/// The assembler emits the same command to both ingestion workers. Cloning only bumps the
/// reference count of the shared record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertCommand {
    InsertContainer {
        record: Arc<SyntheticRecord>,
    },
    InsertGroup {
        container_id: Uuid,
        record: Arc<SyntheticRecord>,
    },
    InsertItem {
        group_id: Uuid,
        record: Arc<SyntheticRecord>,
    },
}

impl InsertCommand {
    pub fn level(&self) -> RecordLevel {
        match self {
            InsertCommand::InsertContainer { .. } => RecordLevel::Container,
            InsertCommand::InsertGroup { .. } => RecordLevel::Group,
            InsertCommand::InsertItem { .. } => RecordLevel::Item,
        }
    }

    pub fn record(&self) -> &Arc<SyntheticRecord> {
        match self {
            InsertCommand::InsertContainer { record }
            | InsertCommand::InsertGroup { record, .. }
            | InsertCommand::InsertItem { record, .. } => record,
        }
    }

    /// Id of the record this command references, [`None`] for containers.
    pub fn parent_id(&self) -> Option<Uuid> {
        match self {
            InsertCommand::InsertContainer { .. } => None,
            InsertCommand::InsertGroup { container_id, .. } => Some(*container_id),
            InsertCommand::InsertItem { group_id, .. } => Some(*group_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloned_command_shares_the_record() {
        let record = Arc::new(SyntheticRecord::new("Lorem".into(), "Ipsum dolor.".into()));
        let command = InsertCommand::InsertGroup {
            container_id: Uuid::new_v4(),
            record: record.clone(),
        };

        let copy = command.clone();

        assert!(Arc::ptr_eq(command.record(), copy.record()));
        assert_eq!(copy.level(), RecordLevel::Group);
        assert_eq!(Arc::strong_count(&record), 3);
    }
}
