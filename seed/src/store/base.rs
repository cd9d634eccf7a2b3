use std::future::Future;
use uuid::Uuid;

use crate::error::{ErrorKind, SeedError, SeedResult};
use crate::types::SyntheticRecord;

/// Number of rows stored at each level of the hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub containers: u64,
    pub groups: u64,
    pub items: u64,
}

impl RowCounts {
    pub fn total(&self) -> u64 {
        self.containers + self.groups + self.items
    }
}

/// Trait for systems that persist the generated hierarchy.
///
/// Each store is owned by exactly one ingestion worker, which applies commands strictly in the
/// order they were emitted. A parent record is therefore always inserted before any record
/// referencing it, and implementations may enforce referential integrity.
///
/// Insert failures are never retried by the pipeline. The first one aborts the run.
pub trait Store {
    /// Returns the name of the store used in logs and progress output.
    fn name(&self) -> &str;

    /// Releases resources held by the store once the run is over.
    ///
    /// The default implementation is a no-op.
    fn shutdown(&self) -> impl Future<Output = SeedResult<()>> + Send {
        async { Ok(()) }
    }

    /// Inserts a top level record.
    fn insert_container(
        &self,
        record: &SyntheticRecord,
    ) -> impl Future<Output = SeedResult<()>> + Send;

    /// Inserts a record belonging to the container `container_id`.
    fn insert_group(
        &self,
        container_id: Uuid,
        record: &SyntheticRecord,
    ) -> impl Future<Output = SeedResult<()>> + Send;

    /// Inserts a record belonging to the group `group_id`.
    fn insert_item(
        &self,
        group_id: Uuid,
        record: &SyntheticRecord,
    ) -> impl Future<Output = SeedResult<()>> + Send;

    /// Counts the rows currently stored at each level.
    fn count_rows(&self) -> impl Future<Output = SeedResult<RowCounts>> + Send;
}

/// Converts a driver error raised by an insert into the error reported by the run.
///
/// Constraint violations and connection failures keep their classification, every other query
/// failure becomes [`ErrorKind::StoreInsertFailed`].
pub(crate) fn insert_error(err: sqlx::Error) -> SeedError {
    let err = SeedError::from(err);
    match err.kind() {
        ErrorKind::StoreConstraintViolation | ErrorKind::StoreConnectionFailed => err,
        _ => err.with_kind(ErrorKind::StoreInsertFailed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_failures_stay_connection_failures() {
        let err = insert_error(sqlx::Error::PoolClosed);

        assert_eq!(err.kind(), ErrorKind::StoreConnectionFailed);
    }

    #[test]
    fn other_failures_become_insert_failures() {
        let err = insert_error(sqlx::Error::RowNotFound);

        assert_eq!(err.kind(), ErrorKind::StoreInsertFailed);
    }

    #[test]
    fn row_counts_total_sums_levels() {
        let counts = RowCounts {
            containers: 2,
            groups: 4,
            items: 8,
        };

        assert_eq!(counts.total(), 14);
    }
}
