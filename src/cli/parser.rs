use std::collections::HashSet;

use super::reader;
use crate::error::MigrationError;
use crate::model::{BatchConfig, LoggingConfig, MigrationSpec};

/// A configuration that passed validation and is ready to run.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub migrations: Vec<MigrationSpec>,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

pub fn parse_config(config: reader::Config) -> Result<Settings, MigrationError> {
    if config.migrations.is_empty() {
        return Err(invalid("no migrations configured"));
    }
    if config.batch.max_concurrent == 0 {
        return Err(invalid("batch.max_concurrent must be at least 1"));
    }

    let mut names = HashSet::new();
    for migration in &config.migrations {
        validate_migration(migration)?;
        if !names.insert(migration.name.as_str()) {
            return Err(invalid(&format!(
                "migration name `{}` is used more than once",
                migration.name
            )));
        }
    }

    Ok(Settings {
        migrations: config.migrations,
        batch: config.batch,
        logging: config.logging,
    })
}

fn validate_migration(migration: &MigrationSpec) -> Result<(), MigrationError> {
    if migration.name.trim().is_empty() {
        return Err(invalid("every migration needs a name"));
    }
    if migration.source.url.trim().is_empty() {
        return Err(invalid(&format!("migration `{}` has no source url", migration.name)));
    }
    if migration.destination.url.trim().is_empty() {
        return Err(invalid(&format!(
            "migration `{}` has no destination url",
            migration.name
        )));
    }
    if migration.source.url.trim() == migration.destination.url.trim() {
        return Err(invalid(&format!(
            "migration `{}` uses the same url as source and destination",
            migration.name
        )));
    }
    if migration.destination.branch.is_some() && migration.source.branch.is_none() {
        return Err(invalid(&format!(
            "migration `{}` sets a destination branch without a source branch",
            migration.name
        )));
    }
    Ok(())
}

fn invalid(message: &str) -> MigrationError {
    MigrationError::Config(message.to_string())
}
