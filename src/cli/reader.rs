use serde::Deserialize;
use serde_yaml;

use crate::error::MigrationError;
use crate::model::{BatchConfig, LoggingConfig, MigrationSpec};

/// The configuration document as written, before validation.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Config {
    pub migrations: Vec<MigrationSpec>,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

pub fn read_config(config: &str) -> Result<Config, MigrationError> {
    serde_yaml::from_str(config).map_err(|error| MigrationError::Config(error.to_string()))
}
