pub mod auth;
pub mod cli;
pub mod error;
pub mod event;
pub mod fixtures;
pub mod git;
pub mod logging;
pub mod mocks;
pub mod model;
pub mod report;
pub mod retry;
pub mod scheduler;
pub mod task;
pub mod transfer;

pub use error::{MigrationError, Result};
pub use model::{AuthSpec, BatchConfig, Endpoint, LoggingConfig, MigrationSpec, TransferOptions};
pub use scheduler::{BatchReport, BatchScheduler};
