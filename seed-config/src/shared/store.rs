use serde::Deserialize;

use crate::shared::{MySqlConnectionConfig, PgConnectionConfig, ValidationError};

/// Backing store for one side of a seed run.
///
/// The variant name selects the driver, e.g. `store_a: memory` or
/// `store_a: { postgres: { connection: ..., max_connections: 80 } }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-process store that keeps every applied command.
    Memory,
    Postgres {
        connection: PgConnectionConfig,
        #[serde(default = "StoreConfig::default_postgres_max_connections")]
        max_connections: u32,
    },
    #[serde(rename = "mysql")]
    MySql {
        connection: MySqlConnectionConfig,
        #[serde(default = "StoreConfig::default_mysql_max_connections")]
        max_connections: u32,
    },
}

impl StoreConfig {
    pub const DEFAULT_POSTGRES_MAX_CONNECTIONS: u32 = 80;
    pub const DEFAULT_MYSQL_MAX_CONNECTIONS: u32 = 100;

    fn default_postgres_max_connections() -> u32 {
        Self::DEFAULT_POSTGRES_MAX_CONNECTIONS
    }

    fn default_mysql_max_connections() -> u32 {
        Self::DEFAULT_MYSQL_MAX_CONNECTIONS
    }

    /// Short driver name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreConfig::Memory => "memory",
            StoreConfig::Postgres { .. } => "postgres",
            StoreConfig::MySql { .. } => "mysql",
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            StoreConfig::Memory => Ok(()),
            StoreConfig::Postgres {
                connection,
                max_connections,
            } => {
                if *max_connections == 0 {
                    return Err(ValidationError::ZeroMaxConnections(self.kind()));
                }
                connection.tls.validate()
            }
            StoreConfig::MySql {
                connection,
                max_connections,
            } => {
                if *max_connections == 0 {
                    return Err(ValidationError::ZeroMaxConnections(self.kind()));
                }
                connection.tls.validate()
            }
        }
    }
}
