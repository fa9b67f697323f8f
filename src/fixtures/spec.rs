use crate::model::{BatchConfig, Endpoint, MigrationSpec, TransferOptions};

pub fn migration(name: &str) -> MigrationSpec {
    MigrationSpec {
        name: name.to_string(),
        source: Endpoint::new(&format!("https://old.example/team/{}.git", name)),
        destination: Endpoint::new(&format!("https://new.example/team/{}.git", name)),
        options: TransferOptions::default(),
    }
}

pub fn migration_between(name: &str, source: &str, destination: &str) -> MigrationSpec {
    MigrationSpec {
        name: name.to_string(),
        source: Endpoint::new(source),
        destination: Endpoint::new(destination),
        options: TransferOptions::default(),
    }
}

/// Batch settings with no waiting between attempts.
pub fn batch(max_concurrent: usize, max_retries: u32) -> BatchConfig {
    BatchConfig {
        max_concurrent,
        retry_on_failure: true,
        max_retries,
        retry_delay: 0,
        work_dir: None,
    }
}
