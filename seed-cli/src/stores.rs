use seed::bail;
use seed::error::{ErrorKind, SeedResult};
use seed::store::memory::MemoryStore;
use seed::store::mysql::MySqlStore;
use seed::store::postgres::PostgresStore;
use seed::store::read::{ForumTree, ReadStrategy};
use seed::store::{RowCounts, Store};
use seed::types::SyntheticRecord;
use seed_config::shared::StoreConfig;
use tracing::info;
use uuid::Uuid;

/// A store built from [`StoreConfig`].
///
/// The pipeline is generic over its stores, so the binary picks the driver once at startup and
/// dispatches through this enum.
#[derive(Debug, Clone)]
pub enum ConfiguredStore {
    Memory(MemoryStore),
    Postgres(PostgresStore),
    MySql(MySqlStore),
}

impl ConfiguredStore {
    pub async fn connect(name: &str, config: &StoreConfig) -> SeedResult<Self> {
        info!(store = name, kind = config.kind(), "connecting store");

        let store = match config {
            StoreConfig::Memory => ConfiguredStore::Memory(MemoryStore::new(name)),
            StoreConfig::Postgres {
                connection,
                max_connections,
            } => ConfiguredStore::Postgres(
                PostgresStore::connect(name, connection, *max_connections).await?,
            ),
            StoreConfig::MySql {
                connection,
                max_connections,
            } => ConfiguredStore::MySql(
                MySqlStore::connect(name, connection, *max_connections).await?,
            ),
        };

        Ok(store)
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, ConfiguredStore::Memory(_))
    }

    /// Creates the tables of SQL stores. Memory stores need no schema.
    pub async fn ensure_schema(&self) -> SeedResult<()> {
        match self {
            ConfiguredStore::Memory(_) => Ok(()),
            ConfiguredStore::Postgres(store) => store.ensure_schema().await,
            ConfiguredStore::MySql(store) => store.ensure_schema().await,
        }
    }

    pub async fn read_hierarchy(&self, strategy: ReadStrategy) -> SeedResult<Vec<ForumTree>> {
        match self {
            ConfiguredStore::Memory(store) => bail!(
                ErrorKind::ConfigError,
                "Read strategies need a SQL store",
                format!("store `{}` is a memory store", store.name())
            ),
            ConfiguredStore::Postgres(store) => store.read_hierarchy(strategy).await,
            ConfiguredStore::MySql(store) => store.read_hierarchy(strategy).await,
        }
    }
}

impl Store for ConfiguredStore {
    fn name(&self) -> &str {
        match self {
            ConfiguredStore::Memory(store) => store.name(),
            ConfiguredStore::Postgres(store) => store.name(),
            ConfiguredStore::MySql(store) => store.name(),
        }
    }

    async fn shutdown(&self) -> SeedResult<()> {
        match self {
            ConfiguredStore::Memory(store) => store.shutdown().await,
            ConfiguredStore::Postgres(store) => store.shutdown().await,
            ConfiguredStore::MySql(store) => store.shutdown().await,
        }
    }

    async fn insert_container(&self, record: &SyntheticRecord) -> SeedResult<()> {
        match self {
            ConfiguredStore::Memory(store) => store.insert_container(record).await,
            ConfiguredStore::Postgres(store) => store.insert_container(record).await,
            ConfiguredStore::MySql(store) => store.insert_container(record).await,
        }
    }

    async fn insert_group(&self, container_id: Uuid, record: &SyntheticRecord) -> SeedResult<()> {
        match self {
            ConfiguredStore::Memory(store) => store.insert_group(container_id, record).await,
            ConfiguredStore::Postgres(store) => store.insert_group(container_id, record).await,
            ConfiguredStore::MySql(store) => store.insert_group(container_id, record).await,
        }
    }

    async fn insert_item(&self, group_id: Uuid, record: &SyntheticRecord) -> SeedResult<()> {
        match self {
            ConfiguredStore::Memory(store) => store.insert_item(group_id, record).await,
            ConfiguredStore::Postgres(store) => store.insert_item(group_id, record).await,
            ConfiguredStore::MySql(store) => store.insert_item(group_id, record).await,
        }
    }

    async fn count_rows(&self) -> SeedResult<RowCounts> {
        match self {
            ConfiguredStore::Memory(store) => store.count_rows().await,
            ConfiguredStore::Postgres(store) => store.count_rows().await,
            ConfiguredStore::MySql(store) => store.count_rows().await,
        }
    }
}
