use std::time::Duration;

use tokio::sync::mpsc;

/// What workers report to the aggregator while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Started {
        name: String,
        attempt: u32,
        max_attempts: u32,
    },
    Retrying {
        name: String,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    Finished {
        name: String,
        attempts: u32,
        error: Option<String>,
    },
}

impl TaskEvent {
    pub fn name(&self) -> &str {
        match self {
            TaskEvent::Started { name, .. }
            | TaskEvent::Retrying { name, .. }
            | TaskEvent::Finished { name, .. } => name,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<TaskEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<TaskEvent>;
