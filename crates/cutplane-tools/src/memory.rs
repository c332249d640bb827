//! Resident-memory snapshots around solver stages.

use std::time::Instant;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Resident set size of the current process at one stage of a solve.
#[derive(Debug, Clone)]
pub struct MemorySnapshot {
    pub rss_bytes: u64,
    pub taken_at: Instant,
    /// Stage label, e.g. `"translate"` or `"solve"`.
    pub stage: String,
}

/// Errors produced by memory instrumentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    ProcessNotFound { pid: u32 },
}

impl MemoryError {
    pub fn code(&self) -> &'static str {
        match self {
            MemoryError::ProcessNotFound { .. } => "MEMORY_PROCESS_NOT_FOUND",
        }
    }
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::ProcessNotFound { pid } => {
                write!(f, "[{}] Failed to locate process {}", self.code(), pid)
            }
        }
    }
}

impl std::error::Error for MemoryError {}

impl MemorySnapshot {
    /// Capture the current process RSS for `stage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current process cannot be located.
    pub fn capture(stage: &str) -> Result<Self, MemoryError> {
        let raw_pid = std::process::id();
        let pid = Pid::from_u32(raw_pid);

        // Refresh only this process's memory counters.
        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        let process = sys
            .process(pid)
            .ok_or(MemoryError::ProcessNotFound { pid: raw_pid })?;

        Ok(MemorySnapshot {
            rss_bytes: process.memory(),
            taken_at: Instant::now(),
            stage: stage.to_string(),
        })
    }

    /// RSS growth from `earlier` to `self` in bytes (negative when shrinking).
    pub fn delta_since(&self, earlier: &Self) -> i64 {
        self.rss_bytes as i64 - earlier.rss_bytes as i64
    }
}

/// Ordered RSS snapshots of one solve, logged as they are taken.
#[derive(Debug)]
pub struct MemoryTracker {
    component: &'static str,
    snapshots: Vec<MemorySnapshot>,
}

impl MemoryTracker {
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            snapshots: Vec::new(),
        }
    }

    /// Take a snapshot for `stage` and log its RSS and growth.
    ///
    /// Instrumentation never fails a solve: a snapshot that cannot be taken
    /// is logged and skipped.
    pub fn record(&mut self, stage: &str) {
        match MemorySnapshot::capture(stage) {
            Ok(snapshot) => {
                let delta = self
                    .snapshots
                    .last()
                    .map_or(0, |previous| snapshot.delta_since(previous));
                tracing::debug!(
                    component = self.component,
                    operation = "memory",
                    status = "success",
                    stage,
                    rss_bytes = snapshot.rss_bytes,
                    delta_bytes = delta,
                    "Memory snapshot"
                );
                self.snapshots.push(snapshot);
            }
            Err(err) => {
                tracing::debug!(
                    component = self.component,
                    operation = "memory",
                    status = "error",
                    stage,
                    error_code = err.code(),
                    "Memory snapshot unavailable"
                );
            }
        }
    }

    pub fn snapshots(&self) -> &[MemorySnapshot] {
        &self.snapshots
    }

    /// Growth between the last two snapshots.
    pub fn last_delta(&self) -> Option<i64> {
        match self.snapshots.as_slice() {
            [.., previous, last] => Some(last.delta_since(previous)),
            _ => None,
        }
    }
}
