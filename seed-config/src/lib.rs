//! Configuration types and loading for the seeder.
//!
//! Configuration is read from `configuration/base.*` and `configuration/{environment}.*`
//! and can be overridden with `APP_`-prefixed environment variables.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from};
