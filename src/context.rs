use crate::models::Playbook;
use crate::playbook;
use crate::store::{SecretStore, StateStore, TaskLog};

/// The state store, task log and secrets shared by every surface.
///
/// Build one at startup and hand clones to the MCP server or HTTP router;
/// clones share the same underlying state. `Default` starts with no secrets.
#[derive(Clone, Default)]
pub struct Context {
    pub store: StateStore,
    pub tasks: TaskLog,
    pub secrets: SecretStore,
}

impl Context {
    /// Empty state, with secrets read from `FTL_SECRET_*` variables.
    pub fn new() -> Self {
        Self {
            secrets: SecretStore::from_env(),
            ..Self::default()
        }
    }

    /// Synthesize a playbook from the current task log, checking targets
    /// against the loaded inventory if there is one.
    pub fn synthesize_playbook(&self, name: &str, include_failed: bool) -> Playbook {
        let records = self.tasks.list(true);
        let inventory = self.store.inventory();
        playbook::synthesize(&records, name, include_failed, inventory.as_deref())
    }
}
