//! Shared configuration types for seed runs.

mod base;
mod connection;
mod seed;
mod seeder;
mod store;

pub use base::ValidationError;
pub use connection::{
    IntoConnectOptions, MySqlConnectionConfig, MySqlTlsConfig, PgConnectionConfig,
    PgConnectionOptions, SEED_PG_OPTIONS, TlsConfig,
};
pub use seed::{QueueConfig, SeedConfig, SeedShapeConfig};
pub use seeder::SeederConfig;
pub use store::StoreConfig;
