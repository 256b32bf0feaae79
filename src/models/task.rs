use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Module arguments, passed through verbatim.
pub type ModuleArgs = serde_json::Map<String, serde_json::Value>;

/// A record of one externally executed module run.
///
/// Task records are **append-only**: once recorded they are never edited or
/// reordered. The log is only ever truncated as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Strictly increasing across the process, including across clears.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    /// The automation module that was invoked.
    pub operation: String,
    pub args: ModuleArgs,
    pub target: HostTarget,
    pub status: TaskStatus,
    /// Whether the run changed anything on the target.
    #[serde(default)]
    pub changed: bool,
    /// Free-form result summary from the execution engine.
    pub summary: String,
}

/// Outcome reported by the execution engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" | "success" | "ok" => Ok(Self::Succeeded),
            "failed" | "failure" | "error" => Ok(Self::Failed),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

/// The hosts an operation was scoped to.
///
/// Either a single host/group name or a list of them. The expression is kept
/// exactly as given; expanding it to concrete hosts is the execution
/// engine's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostTarget {
    Single(String),
    Many(Vec<String>),
}

impl HostTarget {
    /// The names referenced by this expression, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(name) => f.write_str(name),
            Self::Many(names) => f.write_str(&names.join(",")),
        }
    }
}

impl From<&str> for HostTarget {
    fn from(name: &str) -> Self {
        Self::Single(name.to_string())
    }
}

/// Input for appending a record to the task log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordTaskInput {
    pub operation: String,
    #[serde(default)]
    pub args: ModuleArgs,
    pub target: HostTarget,
    pub status: TaskStatus,
    #[serde(default)]
    pub changed: bool,
    #[serde(default)]
    pub summary: String,
}

/// Aggregate counts over the task log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLogStats {
    pub total_tasks: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub changed: usize,
    pub distinct_operations: usize,
    pub distinct_host_targets: usize,
}
