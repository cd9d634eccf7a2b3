use serde::Deserialize;

use crate::Config;
use crate::shared::{SeedConfig, StoreConfig, ValidationError};

/// Top level configuration of the `seeder` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct SeederConfig {
    pub seed: SeedConfig,
    /// First store, fed by ingestion worker A.
    pub store_a: StoreConfig,
    /// Second store, fed by ingestion worker B.
    pub store_b: StoreConfig,
}

impl SeederConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.seed.validate()?;
        self.store_a.validate()?;
        self.store_b.validate()
    }
}

impl Config for SeederConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        SeederConfig::validate(self)
    }
}
