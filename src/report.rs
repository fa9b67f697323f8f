//! Progress output and the end-of-batch summary.

use std::fmt;

use tracing::{error, info};

use crate::event::{EventReceiver, TaskEvent};
use crate::task::Outcome;

const RULE: &str = "==================================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress: [{}/{}] {:.1}%",
            self.completed,
            self.total,
            self.percent()
        )
    }
}

/// Receives progress as tasks settle.
pub trait Reporter: Send + 'static {
    /// Every event, including starts and retries.
    fn task_event(&mut self, _event: &TaskEvent) {}

    /// A task reached a terminal state.
    fn completed(&mut self, name: &str, success: bool, progress: Progress);
}

/// Prints `✓`/`✗` markers and progress lines to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn completed(&mut self, name: &str, success: bool, progress: Progress) {
        println!("{} {}", marker(success), name);
        println!("{}", progress);
    }
}

pub fn marker(success: bool) -> &'static str {
    if success {
        "✓"
    } else {
        "✗"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// In completion order.
    pub failures: Vec<Failure>,
}

impl Summary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Rebuild a summary from final outcomes when the event stream is lost.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        let mut summary = Summary::default();
        for outcome in outcomes {
            summary.record(&outcome.name, outcome.error().map(|err| err.to_string()));
        }
        summary
    }

    fn record(&mut self, name: &str, error: Option<String>) {
        self.total += 1;
        match error {
            None => self.succeeded += 1,
            Some(error) => {
                self.failed += 1;
                self.failures.push(Failure {
                    name: name.to_string(),
                    error,
                });
            }
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "=== MIGRATION SUMMARY ===")?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Total repositories: {}", self.total)?;
        writeln!(f, "{} Succeeded: {}", marker(true), self.succeeded)?;
        writeln!(f, "{} Failed: {}", marker(false), self.failed)?;
        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failed repositories:")?;
            for failure in &self.failures {
                writeln!(f, "  - {}: {}", failure.name, failure.error)?;
            }
        }
        write!(f, "{}", RULE)
    }
}

/// Single consumer of task events.
pub struct Aggregator<R> {
    total: usize,
    summary: Summary,
    reporter: R,
}

impl<R: Reporter> Aggregator<R> {
    pub fn new(total: usize, reporter: R) -> Self {
        Aggregator {
            total,
            summary: Summary::default(),
            reporter,
        }
    }

    pub fn observe(&mut self, event: TaskEvent) {
        self.reporter.task_event(&event);

        if let TaskEvent::Finished {
            name,
            attempts,
            error: failure,
        } = event
        {
            let success = failure.is_none();
            match &failure {
                None => info!(migration = %name, attempts, "{} migrated", marker(true)),
                Some(err) => error!(migration = %name, attempts, error = %err, "{} not migrated", marker(false)),
            }
            self.summary.record(&name, failure);

            let progress = Progress {
                completed: self.summary.total,
                total: self.total,
            };
            self.reporter.completed(&name, success, progress);
        }
    }

    /// Drain `rx` until every sender is gone, then hand back the summary.
    pub async fn consume(mut self, mut rx: EventReceiver) -> Summary {
        while let Some(event) = rx.recv().await {
            self.observe(event);
        }
        self.finish()
    }

    pub fn finish(self) -> Summary {
        Summary {
            total: self.total.max(self.summary.total),
            ..self.summary
        }
    }
}
