use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::{MigrationError, Result};
use crate::model::MigrationSpec;
use crate::transfer::TransferReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Retrying,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

/// One migration moving through its lifecycle. Owned by a single worker.
#[derive(Debug)]
pub struct MigrationTask {
    spec: MigrationSpec,
    state: TaskState,
    attempts: u32,
    max_attempts: u32,
    counter: Option<Arc<AtomicU32>>,
}

impl MigrationTask {
    pub fn new(spec: MigrationSpec, max_attempts: u32) -> Self {
        MigrationTask {
            spec,
            state: TaskState::Pending,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            counter: None,
        }
    }

    /// Mirror the attempt count into `counter`, which outlives the task if
    /// its worker dies mid-attempt.
    pub fn with_counter(mut self, counter: Arc<AtomicU32>) -> Self {
        self.counter = Some(counter);
        self
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &MigrationSpec {
        &self.spec
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `Pending | Retrying -> Running`. Returns the 1-based attempt number.
    pub fn begin_attempt(&mut self) -> u32 {
        debug_assert!(matches!(self.state, TaskState::Pending | TaskState::Retrying));
        debug_assert!(self.attempts < self.max_attempts);
        self.state = TaskState::Running;
        self.attempts += 1;
        if let Some(counter) = &self.counter {
            counter.store(self.attempts, Ordering::SeqCst);
        }
        self.attempts
    }

    /// `Running -> Retrying` while attempts remain, otherwise `Running -> Failed`.
    /// Returns whether another attempt will follow.
    pub fn attempt_failed(&mut self) -> bool {
        debug_assert_eq!(self.state, TaskState::Running);
        if self.attempts < self.max_attempts {
            self.state = TaskState::Retrying;
            true
        } else {
            self.state = TaskState::Failed;
            false
        }
    }

    pub fn succeed(&mut self) {
        debug_assert_eq!(self.state, TaskState::Running);
        self.state = TaskState::Succeeded;
    }

    pub fn outcome(&self, result: Result<TransferReport>) -> Outcome {
        Outcome {
            name: self.spec.name.clone(),
            attempts: self.attempts,
            result,
        }
    }
}

/// Terminal result of a task.
#[derive(Debug)]
pub struct Outcome {
    pub name: String,
    pub attempts: u32,
    pub result: Result<TransferReport>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&MigrationError> {
        self.result.as_ref().err()
    }
}
