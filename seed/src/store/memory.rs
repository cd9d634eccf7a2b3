use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::bail;
use crate::error::{ErrorKind, SeedResult};
use crate::store::{RowCounts, Store};
use crate::types::{InsertCommand, SyntheticRecord};

#[derive(Debug, Default)]
struct Inner {
    commands: Vec<InsertCommand>,
    containers: HashSet<Uuid>,
    groups: HashSet<Uuid>,
    items: HashSet<Uuid>,
}

/// In-memory store for dry runs and tests.
///
/// [`MemoryStore`] keeps every applied command in order and enforces the same referential
/// integrity as the SQL schemas: a group must reference a known container and an item a known
/// group, and ids are unique per level. Violations fail with
/// [`ErrorKind::StoreConstraintViolation`].
///
/// Clones share the same underlying data so a test can keep a handle while the pipeline owns
/// another.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    name: Arc<str>,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Returns a copy of all commands applied so far, in application order.
    pub async fn commands(&self) -> Vec<InsertCommand> {
        let inner = self.inner.lock().await;
        inner.commands.clone()
    }

    /// Clears all stored data.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        *inner = Inner::default();
    }
}

impl Store for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_container(&self, record: &SyntheticRecord) -> SeedResult<()> {
        let mut inner = self.inner.lock().await;

        if !inner.containers.insert(record.id) {
            bail!(
                ErrorKind::StoreConstraintViolation,
                "Duplicate container id",
                record.id
            );
        }

        debug!(store = %self.name, id = %record.id, "inserted container");
        inner.commands.push(InsertCommand::InsertContainer {
            record: Arc::new(record.clone()),
        });

        Ok(())
    }

    async fn insert_group(&self, container_id: Uuid, record: &SyntheticRecord) -> SeedResult<()> {
        let mut inner = self.inner.lock().await;

        if !inner.containers.contains(&container_id) {
            bail!(
                ErrorKind::StoreConstraintViolation,
                "Group references an unknown container",
                format!("group {} references container {container_id}", record.id)
            );
        }
        if !inner.groups.insert(record.id) {
            bail!(
                ErrorKind::StoreConstraintViolation,
                "Duplicate group id",
                record.id
            );
        }

        inner.commands.push(InsertCommand::InsertGroup {
            container_id,
            record: Arc::new(record.clone()),
        });

        Ok(())
    }

    async fn insert_item(&self, group_id: Uuid, record: &SyntheticRecord) -> SeedResult<()> {
        let mut inner = self.inner.lock().await;

        if !inner.groups.contains(&group_id) {
            bail!(
                ErrorKind::StoreConstraintViolation,
                "Item references an unknown group",
                format!("item {} references group {group_id}", record.id)
            );
        }
        if !inner.items.insert(record.id) {
            bail!(
                ErrorKind::StoreConstraintViolation,
                "Duplicate item id",
                record.id
            );
        }

        inner.commands.push(InsertCommand::InsertItem {
            group_id,
            record: Arc::new(record.clone()),
        });

        Ok(())
    }

    async fn count_rows(&self) -> SeedResult<RowCounts> {
        let inner = self.inner.lock().await;

        Ok(RowCounts {
            containers: inner.containers.len() as u64,
            groups: inner.groups.len() as u64,
            items: inner.items.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> SyntheticRecord {
        SyntheticRecord::new(name.to_string(), "Lorem ipsum dolor.".to_string())
    }

    #[tokio::test]
    async fn inserts_are_recorded_in_order() {
        let store = MemoryStore::new("memory");
        let forum = record("Forum");
        let thread = record("Thread");
        let post = record("Post");

        store.insert_container(&forum).await.unwrap();
        store.insert_group(forum.id, &thread).await.unwrap();
        store.insert_item(thread.id, &post).await.unwrap();

        let commands = store.commands().await;
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[1].parent_id(), Some(forum.id));
        assert_eq!(commands[2].record().id, post.id);
        assert_eq!(
            store.count_rows().await.unwrap(),
            RowCounts {
                containers: 1,
                groups: 1,
                items: 1
            }
        );
    }

    #[tokio::test]
    async fn orphan_group_is_a_constraint_violation() {
        let store = MemoryStore::new("memory");

        let err = store
            .insert_group(Uuid::new_v4(), &record("Thread"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreConstraintViolation);
        assert!(store.commands().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_container_is_rejected() {
        let store = MemoryStore::new("memory");
        let forum = record("Forum");

        store.insert_container(&forum).await.unwrap();
        let err = store.insert_container(&forum).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreConstraintViolation);
    }

    #[tokio::test]
    async fn clear_resets_clones() {
        let store = MemoryStore::new("memory");
        let handle = store.clone();

        store.insert_container(&record("Forum")).await.unwrap();
        handle.clear().await;

        assert_eq!(store.count_rows().await.unwrap(), RowCounts::default());
    }
}
