use std::sync::{Arc, Mutex};

use crate::event::TaskEvent;
use crate::report::{marker, Progress, Reporter};

/// Collects what a [`ConsoleReporter`](crate::report::ConsoleReporter) would
/// print. Clones share the same buffers.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    lines: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<TaskEvent>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("lines lock poisoned").clone()
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().expect("events lock poisoned").clone()
    }
}

impl Reporter for RecordingReporter {
    fn task_event(&mut self, event: &TaskEvent) {
        self.events
            .lock()
            .expect("events lock poisoned")
            .push(event.clone());
    }

    fn completed(&mut self, name: &str, success: bool, progress: Progress) {
        let mut lines = self.lines.lock().expect("lines lock poisoned");
        lines.push(format!("{} {}", marker(success), name));
        lines.push(progress.to_string());
    }
}
