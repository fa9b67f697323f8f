//! Runs a batch of migrations under a concurrency cap.
//!
//! Every migration is spawned up front and waits for a semaphore permit.
//! A worker keeps its permit for the whole retry-wrapped task, so at most
//! `max_concurrent` migrations are ever running. Completions stream to a
//! single [`Aggregator`] task over a channel.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info};

use crate::error::MigrationError;
use crate::event::{EventSender, TaskEvent};
use crate::model::{BatchConfig, MigrationSpec};
use crate::report::{Aggregator, Reporter, Summary};
use crate::retry::RetryPolicy;
use crate::task::{MigrationTask, Outcome};
use crate::transfer::Transfer;

/// Everything a finished batch produced.
#[derive(Debug)]
pub struct BatchReport {
    /// Keyed by migration name.
    pub outcomes: BTreeMap<String, Outcome>,
    pub summary: Summary,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }
}

pub struct BatchScheduler {
    transfer: Arc<dyn Transfer>,
    config: BatchConfig,
}

impl BatchScheduler {
    pub fn new(transfer: Arc<dyn Transfer>, config: BatchConfig) -> Self {
        BatchScheduler { transfer, config }
    }

    /// Run every spec to a terminal state. Names must be unique.
    pub async fn run<R: Reporter>(&self, specs: Vec<MigrationSpec>, reporter: R) -> BatchReport {
        let total = specs.len();
        let concurrency = self.config.max_concurrent.max(1);
        let policy = RetryPolicy::from_config(&self.config);
        let semaphore = Arc::new(Semaphore::new(concurrency));

        let (tx, rx) = mpsc::unbounded_channel();
        let aggregator = tokio::spawn(Aggregator::new(total, reporter).consume(rx));

        info!(
            total,
            concurrency,
            max_attempts = policy.max_attempts(),
            "starting batch"
        );

        let mut handles = Vec::with_capacity(total);

        for spec in specs {
            let name = spec.name.clone();
            let semaphore = Arc::clone(&semaphore);
            let transfer = Arc::clone(&self.transfer);
            let policy = policy.clone();
            let tx = tx.clone();
            let attempts = Arc::new(AtomicU32::new(0));
            let counter = Arc::clone(&attempts);

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return lost(&spec.name, 0, "worker pool closed".to_string(), &tx),
                };

                let mut task =
                    MigrationTask::new(spec, policy.max_attempts()).with_counter(counter);
                let outcome = policy.run(transfer.as_ref(), &mut task, &tx).await;

                let _ = tx.send(TaskEvent::Finished {
                    name: outcome.name.clone(),
                    attempts: outcome.attempts,
                    error: outcome.error().map(|err| err.to_string()),
                });
                outcome
            });

            handles.push((name, attempts, handle));
        }

        let mut outcomes = BTreeMap::new();
        for (name, attempts, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(migration = %name, error = %err, "worker did not finish");
                    lost(&name, attempts.load(Ordering::SeqCst), err.to_string(), &tx)
                }
            };
            outcomes.insert(name, outcome);
        }
        drop(tx);

        let summary = match aggregator.await {
            Ok(summary) => summary,
            Err(err) => {
                error!(error = %err, "progress aggregator stopped, rebuilding summary");
                Summary::from_outcomes(outcomes.values())
            }
        };

        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch finished"
        );

        BatchReport { outcomes, summary }
    }
}

/// Outcome for a worker that never reported back. `attempts` is how many
/// attempts had started when it was lost.
fn lost(name: &str, attempts: u32, reason: String, tx: &EventSender) -> Outcome {
    let err = MigrationError::WorkerLost(reason);
    let _ = tx.send(TaskEvent::Finished {
        name: name.to_string(),
        attempts,
        error: Some(err.to_string()),
    });
    Outcome {
        name: name.to_string(),
        attempts,
        result: Err(err),
    }
}
