//! Request and response types for MCP tools.
//!
//! The response types double as REST payloads.

use chrono::{DateTime, Utc};
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::*;
use crate::store::{SecretStore, StateStore, StoreStats, SECRET_ENV_PREFIX};

// ============================================================
// Request Types
// ============================================================

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct LoadInventoryRequest {
    #[schemars(description = "Path of an inventory YAML file to read")]
    pub path: Option<String>,
    #[schemars(description = "Inventory YAML given inline. Use instead of path")]
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ExportInventoryRequest {
    #[schemars(
        description = "File to write the inventory YAML to. When omitted the YAML is returned"
    )]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListGroupHostsRequest {
    #[schemars(description = "Group name, e.g. 'webservers' or 'all'")]
    pub group: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetHostRequest {
    #[schemars(description = "Host name as declared in the inventory")]
    pub host: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StartSessionRequest {
    #[schemars(description = "Caller-chosen session token, unique per client")]
    pub session_id: String,
    #[schemars(description = "Human-readable label, applied only when the session is new")]
    pub label: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LogSessionActivityRequest {
    pub session_id: String,
    #[schemars(description = "What happened, in a sentence")]
    pub description: String,
    #[schemars(description = "Optional structured detail to keep with the activity")]
    pub payload: Option<Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetSessionDataRequest {
    pub session_id: String,
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SessionRequest {
    #[schemars(description = "Session token passed to start_session")]
    pub session_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SecretNameRequest {
    #[schemars(description = "Secret name, case-insensitive, e.g. 'ssh_user'")]
    pub name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetValueRequest {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct KeyRequest {
    pub key: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ExportStateRequest {
    #[schemars(description = "One of 'sessions', 'inventory', 'generic' or 'all' (default)")]
    pub section: Option<String>,
}

/// A host or group name, or a list of them.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum HostsInput {
    One(String),
    Many(Vec<String>),
}

impl From<HostsInput> for HostTarget {
    fn from(input: HostsInput) -> Self {
        match input {
            HostsInput::One(name) => HostTarget::Single(name),
            HostsInput::Many(names) => HostTarget::Many(names),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecordTaskRequest {
    #[schemars(description = "Module that was run, e.g. 'ansible.builtin.copy' or 'dnf'")]
    pub module_name: String,
    #[schemars(description = "Host target exactly as it was passed to the module run")]
    pub hosts: HostsInput,
    #[schemars(description = "Module arguments, recorded verbatim")]
    pub module_args: Option<ModuleArgs>,
    #[schemars(description = "'succeeded' or 'failed'")]
    pub status: String,
    #[schemars(description = "Short result summary from the run")]
    pub summary: Option<String>,
    #[schemars(description = "Whether the run changed the target")]
    #[serde(default)]
    pub changed: bool,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetPlaybookTasksRequest {
    #[schemars(description = "Include failed runs. Defaults to true")]
    pub include_failed: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GeneratePlaybookRequest {
    pub playbook_name: String,
    #[schemars(description = "Replay failed runs too. Defaults to false")]
    #[serde(default)]
    pub include_failed: bool,
    #[schemars(description = "Also write the playbook YAML to this file")]
    pub output_path: Option<String>,
}

// ============================================================
// Response Types
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryStatus {
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
    pub host_count: usize,
    pub group_count: usize,
    pub groups: Vec<GroupSummary>,
}

impl InventoryStatus {
    pub fn of(store: &StateStore) -> Self {
        let last_load = store.inventory_history().pop();
        match store.inventory() {
            Some(model) => Self {
                loaded: true,
                source: last_load.as_ref().map(|l| l.source.clone()),
                loaded_at: last_load.map(|l| l.loaded_at),
                host_count: model.host_count(),
                group_count: model.group_count(),
                groups: model.group_summaries(),
            },
            None => Self {
                loaded: false,
                source: None,
                loaded_at: None,
                host_count: 0,
                group_count: 0,
                groups: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportInventoryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupHostsResponse {
    pub group: String,
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostDetails {
    pub host: String,
    pub groups: Vec<String>,
    /// Effective variables after group inheritance.
    pub vars: Vars,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueResponse {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetValueResponse {
    pub key: String,
    pub replaced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateStats {
    pub store: StoreStats,
    pub tasks: TaskLogStats,
    pub secrets: SecretStats,
}

/// Secret names and metadata. Values are never included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsStatus {
    pub statistics: SecretStats,
    pub secrets: Vec<SecretMetadata>,
    pub loading_instructions: String,
}

impl SecretsStatus {
    pub fn of(secrets: &SecretStore) -> Self {
        Self {
            statistics: secrets.stats(),
            secrets: secrets.list(),
            loading_instructions: format!(
                "Export {}<NAME>=<value> before starting the server, then call reload_secrets. \
                 Names are matched case-insensitively.",
                SECRET_ENV_PREFIX
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretCheck {
    pub secret_name: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SecretMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordTaskResponse {
    pub seq: u64,
    pub total_tasks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub count: usize,
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearedResponse {
    pub cleared: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookResponse {
    pub name: String,
    pub yaml: String,
    pub stats: PlaybookStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}
