use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{MigrationError, Result};
use crate::model::MigrationSpec;
use crate::transfer::{Transfer, TransferReport};

/// How a scripted migration behaves on each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Succeed,
    Fail,
    /// Fail the first `n` attempts, then succeed.
    FailTimes(u32),
    /// Fail every attempt before `n`, then panic on attempt `n`.
    PanicOn(u32),
}

/// A [`Transfer`] that follows a per-name script and tracks concurrency.
/// Names without a script succeed.
#[derive(Default)]
pub struct ScriptedTransfer {
    scripts: HashMap<String, Script>,
    hold: Duration,
    attempts: Mutex<HashMap<String, u32>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, script: Script) -> Self {
        self.scripts.insert(name.to_string(), script);
        self
    }

    /// Keep every attempt "in flight" for `hold`.
    pub fn hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    pub fn attempts(&self, name: &str) -> u32 {
        self.attempts
            .lock()
            .expect("attempts lock poisoned")
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of attempts that were running at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transfer for ScriptedTransfer {
    async fn transfer(&self, spec: &MigrationSpec, attempt: u32) -> Result<TransferReport> {
        *self
            .attempts
            .lock()
            .expect("attempts lock poisoned")
            .entry(spec.name.clone())
            .or_insert(0) += 1;

        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if !self.hold.is_zero() {
            tokio::time::sleep(self.hold).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        let fail = match self.scripts.get(&spec.name).copied().unwrap_or(Script::Succeed) {
            Script::Succeed => false,
            Script::Fail => true,
            Script::FailTimes(n) => attempt <= n,
            Script::PanicOn(n) if attempt >= n => panic!("scripted panic in `{}`", spec.name),
            Script::PanicOn(_) => true,
        };

        if fail {
            return Err(MigrationError::Push {
                url: spec.destination.url.clone(),
                stderr: format!("attempt {}", attempt),
            });
        }
        Ok(TransferReport::default())
    }
}
