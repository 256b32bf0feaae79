use serde::{Deserialize, Serialize};

use super::task::{HostTarget, ModuleArgs};

/// A declarative document replaying the task log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playbook {
    pub name: String,
    pub plays: Vec<Play>,
    pub stats: PlaybookStats,
}

/// One contiguous run of steps sharing a host target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Play {
    pub name: String,
    pub hosts: HostTarget,
    pub tasks: Vec<Step>,
}

/// One module invocation within a play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub module: String,
    pub args: ModuleArgs,
}

impl Step {
    pub fn new(module: impl Into<String>, args: ModuleArgs) -> Self {
        let module = module.into();
        Self {
            name: format!("Execute {}", module),
            module,
            args,
        }
    }
}

/// Summary figures reported alongside a synthesized playbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybookStats {
    pub total_steps: usize,
    pub play_count: usize,
    /// Records dropped because they failed and failures were not requested.
    pub excluded_failed: usize,
    /// Distinct modules, sorted.
    pub modules_used: Vec<String>,
    /// Distinct target names in first-seen order.
    pub targets: Vec<String>,
    /// Target names that are neither a host nor a group of the loaded
    /// inventory. Empty when no inventory is loaded.
    pub unknown_targets: Vec<String>,
}
