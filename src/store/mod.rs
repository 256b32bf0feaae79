//! Process-wide state: the loaded inventory, caller sessions, a generic
//! key/value map, the task log and secrets.
//!
//! Each sub-store sits behind its own mutex. No method holds more than one
//! guard at a time, so there is no lock ordering to get wrong, and every
//! mutation is applied completely before the guard is released.

mod secrets;
mod tasks;

pub use secrets::{SecretStore, SECRET_ENV_PREFIX};
pub use tasks::TaskLog;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::inventory;
use crate::models::*;

#[derive(Default)]
struct InventorySlot {
    current: Option<Arc<InventoryModel>>,
    history: Vec<InventoryLoad>,
}

/// Shared handle to the state store. Clones refer to the same state.
#[derive(Clone, Default)]
pub struct StateStore {
    inventory: Arc<Mutex<InventorySlot>>,
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    generic: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================================
    // Inventory slot
    // ============================================================

    /// Replace the loaded inventory wholesale.
    pub fn set_inventory(
        &self,
        model: InventoryModel,
        source: impl Into<String>,
    ) -> Arc<InventoryModel> {
        let model = Arc::new(model);
        let load = InventoryLoad {
            source: source.into(),
            loaded_at: Utc::now(),
            host_count: model.host_count(),
            group_count: model.group_count(),
        };
        tracing::info!(
            source = %load.source,
            hosts = load.host_count,
            groups = load.group_count,
            "Inventory loaded"
        );

        let mut slot = self.inventory.lock().expect("inventory lock poisoned");
        slot.current = Some(Arc::clone(&model));
        slot.history.push(load);
        model
    }

    /// Parse `text` and, only if it parses, replace the loaded inventory.
    pub fn load_inventory(
        &self,
        text: &str,
        source: impl Into<String>,
    ) -> Result<Arc<InventoryModel>> {
        let source = source.into();
        let model = inventory::parse(text).inspect_err(|e| {
            tracing::warn!(source = %source, error = %e, "Inventory rejected");
        })?;
        Ok(self.set_inventory(model, source))
    }

    pub fn inventory(&self) -> Option<Arc<InventoryModel>> {
        self.inventory
            .lock()
            .expect("inventory lock poisoned")
            .current
            .clone()
    }

    /// The loaded inventory, or [`Error::InventoryAbsent`].
    pub fn require_inventory(&self) -> Result<Arc<InventoryModel>> {
        self.inventory().ok_or(Error::InventoryAbsent)
    }

    /// Drop the loaded inventory and its load history.
    ///
    /// Returns whether an inventory was loaded.
    pub fn clear_inventory(&self) -> bool {
        let mut slot = self.inventory.lock().expect("inventory lock poisoned");
        slot.history.clear();
        let had_inventory = slot.current.take().is_some();
        tracing::info!(had_inventory, "Inventory cleared");
        had_inventory
    }

    pub fn inventory_history(&self) -> Vec<InventoryLoad> {
        self.inventory
            .lock()
            .expect("inventory lock poisoned")
            .history
            .clone()
    }

    pub fn hosts_of(&self, group: &str) -> Result<BTreeSet<String>> {
        self.require_inventory()?
            .hosts_of(group)
            .cloned()
            .ok_or_else(|| Error::GroupNotFound(group.to_string()))
    }

    pub fn groups_of(&self, host: &str) -> Result<BTreeSet<String>> {
        self.require_inventory()?
            .groups_of(host)
            .ok_or_else(|| Error::HostNotFound(host.to_string()))
    }

    pub fn host_vars(&self, host: &str) -> Result<Vars> {
        self.require_inventory()?
            .host_vars(host)
            .ok_or_else(|| Error::HostNotFound(host.to_string()))
    }

    pub fn group_summaries(&self) -> Result<Vec<GroupSummary>> {
        Ok(self.require_inventory()?.group_summaries())
    }

    // ============================================================
    // Session slot
    // ============================================================

    /// Return the session for `token`, creating it if needed.
    ///
    /// The label is only applied when the session is created. Concurrent
    /// callers with the same new token all get the one session.
    pub fn get_or_create_session(&self, token: &str, label: &str) -> Session {
        let mut sessions = self.sessions.lock().expect("sessions lock poisoned");
        sessions
            .entry(token.to_string())
            .or_insert_with(|| {
                tracing::debug!(token, label, "Session created");
                Session::new(token, label)
            })
            .clone()
    }

    pub fn get_session(&self, token: &str) -> Result<Session> {
        self.sessions
            .lock()
            .expect("sessions lock poisoned")
            .get(token)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(token.to_string()))
    }

    pub fn append_activity(
        &self,
        token: &str,
        description: impl Into<String>,
        payload: Option<Value>,
    ) -> Result<Activity> {
        self.with_session(token, |session| {
            let activity = Activity {
                seq: session.next_seq,
                request_id: Uuid::new_v4(),
                timestamp: Utc::now(),
                description: description.into(),
                payload,
            };
            session.next_seq += 1;
            session.activities.push(activity.clone());
            activity
        })
    }

    pub fn set_session_data(&self, token: &str, key: &str, value: Value) -> Result<()> {
        self.with_session(token, |session| {
            session.data.insert(key.to_string(), value);
        })
    }

    /// Empty a session's activities and data, keeping its label and
    /// creation time.
    pub fn clear_session_data(&self, token: &str) -> Result<SessionSummary> {
        self.with_session(token, |session| {
            session.activities.clear();
            session.data.clear();
            session.summary()
        })
    }

    pub fn delete_session(&self, token: &str) -> Result<Session> {
        self.sessions
            .lock()
            .expect("sessions lock poisoned")
            .remove(token)
            .ok_or_else(|| Error::SessionNotFound(token.to_string()))
    }

    /// Session summaries, oldest first.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.lock().expect("sessions lock poisoned");
        let mut summaries: Vec<SessionSummary> = sessions.values().map(Session::summary).collect();
        summaries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.token.cmp(&b.token))
        });
        summaries
    }

    fn with_session<T>(&self, token: &str, f: impl FnOnce(&mut Session) -> T) -> Result<T> {
        let mut sessions = self.sessions.lock().expect("sessions lock poisoned");
        let session = sessions
            .get_mut(token)
            .ok_or_else(|| Error::SessionNotFound(token.to_string()))?;
        session.touch();
        Ok(f(session))
    }

    // ============================================================
    // Generic slot
    // ============================================================

    /// Store a value, returning the one it replaced.
    pub fn set_generic(&self, key: &str, value: Value) -> Option<Value> {
        self.generic
            .lock()
            .expect("generic store lock poisoned")
            .insert(key.to_string(), value)
    }

    pub fn get_generic(&self, key: &str) -> Option<Value> {
        self.generic
            .lock()
            .expect("generic store lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn delete_generic(&self, key: &str) -> Option<Value> {
        self.generic
            .lock()
            .expect("generic store lock poisoned")
            .remove(key)
    }

    /// All generic keys, sorted.
    pub fn list_generic_keys(&self) -> Vec<String> {
        self.generic
            .lock()
            .expect("generic store lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    // ============================================================
    // Whole-store operations
    // ============================================================

    /// Counts across all sub-stores, computed on every call.
    pub fn stats(&self) -> StoreStats {
        let (session_count, total_activities) = {
            let sessions = self.sessions.lock().expect("sessions lock poisoned");
            (
                sessions.len(),
                sessions.values().map(|s| s.activities.len()).sum(),
            )
        };
        let generic_key_count = self
            .generic
            .lock()
            .expect("generic store lock poisoned")
            .len();
        let inventory = self.inventory();

        StoreStats {
            session_count,
            total_activities,
            generic_key_count,
            inventory_present: inventory.is_some(),
            host_count: inventory.as_ref().map_or(0, |i| i.host_count()),
            group_count: inventory.as_ref().map_or(0, |i| i.group_count()),
        }
    }

    /// JSON dump of one section of the store, for debugging and backup.
    pub fn export_json(&self, section: ExportSection) -> Value {
        match section {
            ExportSection::Sessions => self.sessions_json(),
            ExportSection::Inventory => json!(self.inventory().as_deref()),
            ExportSection::Generic => {
                json!(*self.generic.lock().expect("generic store lock poisoned"))
            }
            ExportSection::All => json!({
                "sessions": self.sessions_json(),
                "inventory": self.inventory().as_deref(),
                "inventory_history": self.inventory_history(),
                "generic": self.export_json(ExportSection::Generic),
                "stats": self.stats(),
            }),
        }
    }

    fn sessions_json(&self) -> Value {
        let sessions = self.sessions.lock().expect("sessions lock poisoned");
        let sorted: BTreeMap<&String, &Session> = sessions.iter().collect();
        json!(sorted)
    }

    /// Reset every sub-store.
    pub fn clear_all(&self) {
        self.clear_inventory();
        self.sessions.lock().expect("sessions lock poisoned").clear();
        self.generic
            .lock()
            .expect("generic store lock poisoned")
            .clear();
    }
}

/// Store-wide counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub session_count: usize,
    pub total_activities: usize,
    pub generic_key_count: usize,
    pub inventory_present: bool,
    pub host_count: usize,
    pub group_count: usize,
}

/// Part of the store to include in [`StateStore::export_json`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportSection {
    Sessions,
    Inventory,
    Generic,
    #[default]
    All,
}

impl FromStr for ExportSection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sessions" => Ok(Self::Sessions),
            "inventory" => Ok(Self::Inventory),
            "generic" => Ok(Self::Generic),
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown section '{}'. Must be: sessions, inventory, generic, or all",
                other
            )),
        }
    }
}
