use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::MigrationError;
use crate::event::{EventSender, TaskEvent};
use crate::model::BatchConfig;
use crate::task::{MigrationTask, Outcome};
use crate::transfer::Transfer;

/// Constant-delay retries. Every error kind is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    retry_on_failure: bool,
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(retry_on_failure: bool, max_retries: u32, delay: Duration) -> Self {
        RetryPolicy {
            retry_on_failure,
            max_retries,
            delay,
        }
    }

    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.retry_on_failure, config.max_retries, config.delay())
    }

    pub fn max_attempts(&self) -> u32 {
        if self.retry_on_failure {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Drive `task` to a terminal state and return its outcome.
    pub async fn run(
        &self,
        transfer: &dyn Transfer,
        task: &mut MigrationTask,
        events: &EventSender,
    ) -> Outcome {
        loop {
            let attempt = task.begin_attempt();
            let _ = events.send(TaskEvent::Started {
                name: task.name().to_string(),
                attempt,
                max_attempts: task.max_attempts(),
            });
            if attempt > 1 {
                info!(migration = task.name(), attempt, max_attempts = task.max_attempts(), "retrying");
            }

            let err = match transfer.transfer(task.spec(), attempt).await {
                Ok(report) => {
                    task.succeed();
                    return task.outcome(Ok(report));
                }
                Err(err) => err,
            };

            if task.attempt_failed() {
                warn!(
                    migration = task.name(),
                    attempt,
                    delay_secs = self.delay.as_secs(),
                    error = %err,
                    "attempt failed"
                );
                let _ = events.send(TaskEvent::Retrying {
                    name: task.name().to_string(),
                    attempt,
                    delay: self.delay,
                    error: err.to_string(),
                });
                tokio::time::sleep(self.delay).await;
                continue;
            }

            error!(migration = task.name(), attempts = attempt, error = %err, "migration failed");
            let err = if attempt > 1 {
                MigrationError::RetryExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                }
            } else {
                err
            };
            return task.outcome(Err(err));
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default())
    }
}
