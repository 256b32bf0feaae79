use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::models::{RecordTaskInput, TaskLogStats, TaskRecord, TaskStatus};

#[derive(Default)]
struct TaskLogInner {
    records: Vec<TaskRecord>,
    last_seq: u64,
}

/// Append-only log of externally executed operations.
///
/// Sequence numbers are assigned under the same guard as the append, so log
/// order and numbering always agree. The counter is never reset, not even
/// by [`TaskLog::clear`].
#[derive(Clone, Default)]
pub struct TaskLog {
    inner: Arc<Mutex<TaskLogInner>>,
}

impl TaskLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its sequence number.
    ///
    /// Failed operations are recorded too; the log reflects what happened.
    pub fn record(&self, input: RecordTaskInput) -> u64 {
        let mut inner = self.inner.lock().expect("task log lock poisoned");
        inner.last_seq += 1;
        let seq = inner.last_seq;

        tracing::info!(
            seq,
            operation = %input.operation,
            target = %input.target,
            status = input.status.as_str(),
            "Task recorded"
        );

        inner.records.push(TaskRecord {
            seq,
            timestamp: Utc::now(),
            operation: input.operation,
            args: input.args,
            target: input.target,
            status: input.status,
            changed: input.changed,
            summary: input.summary,
        });
        seq
    }

    /// Records in insertion order, optionally without failures.
    pub fn list(&self, include_failed: bool) -> Vec<TaskRecord> {
        self.inner
            .lock()
            .expect("task log lock poisoned")
            .records
            .iter()
            .filter(|r| include_failed || r.status != TaskStatus::Failed)
            .cloned()
            .collect()
    }

    /// Discard every record. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock().expect("task log lock poisoned");
        let cleared = inner.records.len();
        inner.records.clear();
        tracing::info!(cleared, "Task log cleared");
        cleared
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("task log lock poisoned").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> TaskLogStats {
        let inner = self.inner.lock().expect("task log lock poisoned");
        let records = &inner.records;

        let succeeded = records
            .iter()
            .filter(|r| r.status == TaskStatus::Succeeded)
            .count();
        let operations: HashSet<&str> = records.iter().map(|r| r.operation.as_str()).collect();
        let targets: HashSet<_> = records.iter().map(|r| &r.target).collect();

        TaskLogStats {
            total_tasks: records.len(),
            succeeded,
            failed: records.len() - succeeded,
            changed: records.iter().filter(|r| r.changed).count(),
            distinct_operations: operations.len(),
            distinct_host_targets: targets.len(),
        }
    }
}
