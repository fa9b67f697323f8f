use thiserror::Error;

use crate::auth::Role;

/// Everything that can go wrong while loading or running a migration.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Structurally invalid configuration. Aborts the run before scheduling.
    #[error("configuration error: {0}")]
    Config(String),

    /// A `${NAME}` reference points at an unset variable.
    #[error("environment variable `{name}` is not set")]
    MissingEnvVar { name: String },

    /// Credential material is missing or unusable.
    #[error("{role} auth: {message}")]
    Auth { role: Role, message: String },

    #[error("could not create working area: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("mirror clone of {url} failed: {stderr}")]
    Clone { url: String, stderr: String },

    #[error("mirror push to {url} failed: {stderr}")]
    Push { url: String, stderr: String },

    /// Source ref deletion failed after a successful push. Never fails a task.
    #[error("deleting migrated refs at {url} failed: {stderr}")]
    Prune { url: String, stderr: String },

    #[error("gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<MigrationError>,
    },

    /// The worker running the task panicked or was cancelled.
    #[error("worker stopped unexpectedly: {0}")]
    WorkerLost(String),
}

impl MigrationError {
    pub fn auth(role: Role, message: impl Into<String>) -> Self {
        MigrationError::Auth {
            role,
            message: message.into(),
        }
    }

    /// The error of the last attempt, looking through `RetryExhausted`.
    pub fn root(&self) -> &MigrationError {
        match self {
            MigrationError::RetryExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;
