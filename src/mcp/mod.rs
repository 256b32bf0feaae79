//! MCP server exposing the inventory, state store and task log as tools.
//!
//! Every `handle_*` method holds the logic for the tool of the same name and
//! returns a typed response, so it can be driven directly from tests.

mod types;

use std::str::FromStr;

pub use types::*;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use serde_json::Value;

use crate::context::Context;
use crate::error::Error;
use crate::inventory;
use crate::models::*;
use crate::playbook;
use crate::store::ExportSection;

const INLINE_SOURCE: &str = "inline";

#[derive(Clone)]
pub struct McpServer {
    ctx: Context,
    tool_router: ToolRouter<Self>,
}

/// Missing things and bad input are the caller's to fix.
fn tool_error(e: Error) -> McpError {
    McpError::invalid_params(e.to_string(), None)
}

fn internal(e: impl std::fmt::Display) -> McpError {
    McpError::internal_error(e.to_string(), None)
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(internal)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

impl McpServer {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    // ============================================================
    // Inventory
    // ============================================================

    pub async fn handle_load_inventory(
        &self,
        req: LoadInventoryRequest,
    ) -> Result<InventoryStatus, McpError> {
        let (text, source) = match (req.path, req.content) {
            (Some(_), Some(_)) => {
                return Err(McpError::invalid_params(
                    "Pass either path or content, not both",
                    None,
                ))
            }
            (Some(path), None) => {
                let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    McpError::invalid_params(format!("Cannot read '{}': {}", path, e), None)
                })?;
                (text, path)
            }
            (None, Some(content)) => (content, INLINE_SOURCE.to_string()),
            (None, None) => {
                return Err(McpError::invalid_params(
                    "Either path or content is required",
                    None,
                ))
            }
        };

        self.ctx
            .store
            .load_inventory(&text, source)
            .map_err(tool_error)?;
        Ok(InventoryStatus::of(&self.ctx.store))
    }

    pub async fn handle_export_inventory(
        &self,
        req: ExportInventoryRequest,
    ) -> Result<ExportInventoryResponse, McpError> {
        let model = self.ctx.store.require_inventory().map_err(tool_error)?;
        let yaml = inventory::export(&model).map_err(internal)?;

        match req.path {
            Some(path) => {
                tokio::fs::write(&path, &yaml).await.map_err(|e| {
                    McpError::invalid_params(format!("Cannot write '{}': {}", path, e), None)
                })?;
                tracing::info!(path = %path, bytes = yaml.len(), "Inventory exported");
                Ok(ExportInventoryResponse {
                    path: Some(path),
                    bytes: yaml.len(),
                    content: None,
                })
            }
            None => Ok(ExportInventoryResponse {
                path: None,
                bytes: yaml.len(),
                content: Some(yaml),
            }),
        }
    }

    pub fn handle_list_group_hosts(&self, group: &str) -> Result<GroupHostsResponse, McpError> {
        let hosts = self.ctx.store.hosts_of(group).map_err(tool_error)?;
        Ok(GroupHostsResponse {
            group: group.to_string(),
            hosts: hosts.into_iter().collect(),
        })
    }

    pub fn handle_get_host(&self, host: &str) -> Result<HostDetails, McpError> {
        let groups = self.ctx.store.groups_of(host).map_err(tool_error)?;
        let vars = self.ctx.store.host_vars(host).map_err(tool_error)?;
        Ok(HostDetails {
            host: host.to_string(),
            groups: groups.into_iter().collect(),
            vars,
        })
    }

    pub fn handle_render_inventory_graph(&self) -> Result<String, McpError> {
        let model = self.ctx.store.require_inventory().map_err(tool_error)?;
        Ok(inventory::render_graph(&model))
    }

    // ============================================================
    // Sessions
    // ============================================================

    pub fn handle_start_session(&self, req: StartSessionRequest) -> Session {
        self.ctx
            .store
            .get_or_create_session(&req.session_id, req.label.as_deref().unwrap_or(""))
    }

    pub fn handle_log_session_activity(
        &self,
        req: LogSessionActivityRequest,
    ) -> Result<Activity, McpError> {
        self.ctx
            .store
            .append_activity(&req.session_id, req.description, req.payload)
            .map_err(tool_error)
    }

    pub fn handle_set_session_data(
        &self,
        req: SetSessionDataRequest,
    ) -> Result<SessionSummary, McpError> {
        let store = &self.ctx.store;
        store
            .set_session_data(&req.session_id, &req.key, req.value)
            .map_err(tool_error)?;
        store
            .get_session(&req.session_id)
            .map(|s| s.summary())
            .map_err(tool_error)
    }

    pub fn handle_get_session(&self, session_id: &str) -> Result<Session, McpError> {
        self.ctx.store.get_session(session_id).map_err(tool_error)
    }

    pub fn handle_clear_session_data(&self, session_id: &str) -> Result<SessionSummary, McpError> {
        self.ctx
            .store
            .clear_session_data(session_id)
            .map_err(tool_error)
    }

    pub fn handle_delete_session(&self, session_id: &str) -> Result<SessionSummary, McpError> {
        self.ctx
            .store
            .delete_session(session_id)
            .map(|s| s.summary())
            .map_err(tool_error)
    }

    // ============================================================
    // Generic values
    // ============================================================

    pub fn handle_set_value(&self, req: SetValueRequest) -> SetValueResponse {
        let replaced = self.ctx.store.set_generic(&req.key, req.value).is_some();
        SetValueResponse {
            key: req.key,
            replaced,
        }
    }

    pub fn handle_get_value(&self, key: &str) -> Result<ValueResponse, McpError> {
        let value = self
            .ctx
            .store
            .get_generic(key)
            .ok_or_else(|| tool_error(Error::KeyNotFound(key.to_string())))?;
        Ok(ValueResponse {
            key: key.to_string(),
            value,
        })
    }

    pub fn handle_delete_value(&self, key: &str) -> Result<ValueResponse, McpError> {
        let value = self
            .ctx
            .store
            .delete_generic(key)
            .ok_or_else(|| tool_error(Error::KeyNotFound(key.to_string())))?;
        Ok(ValueResponse {
            key: key.to_string(),
            value,
        })
    }

    pub fn handle_get_state_stats(&self) -> StateStats {
        StateStats {
            store: self.ctx.store.stats(),
            tasks: self.ctx.tasks.stats(),
            secrets: self.ctx.secrets.stats(),
        }
    }

    pub fn handle_check_secret_exists(&self, name: &str) -> SecretCheck {
        let metadata = self.ctx.secrets.metadata(name);
        SecretCheck {
            secret_name: name.to_string(),
            exists: metadata.is_some(),
            metadata,
        }
    }

    pub fn handle_export_state(&self, section: Option<&str>) -> Result<Value, McpError> {
        let section = match section {
            Some(s) => ExportSection::from_str(s).map_err(|e| McpError::invalid_params(e, None))?,
            None => ExportSection::All,
        };
        Ok(self.ctx.store.export_json(section))
    }

    // ============================================================
    // Task log and playbooks
    // ============================================================

    pub fn handle_record_task(&self, req: RecordTaskRequest) -> Result<RecordTaskResponse, McpError> {
        let status = TaskStatus::from_str(&req.status).map_err(|_| {
            McpError::invalid_params(
                format!(
                    "Invalid status '{}'. Must be: succeeded or failed",
                    req.status
                ),
                None,
            )
        })?;

        let seq = self.ctx.tasks.record(RecordTaskInput {
            operation: req.module_name,
            args: req.module_args.unwrap_or_default(),
            target: req.hosts.into(),
            status,
            changed: req.changed,
            summary: req.summary.unwrap_or_default(),
        });
        Ok(RecordTaskResponse {
            seq,
            total_tasks: self.ctx.tasks.len(),
        })
    }

    pub fn handle_get_playbook_tasks(&self, include_failed: Option<bool>) -> TaskListResponse {
        let tasks = self.ctx.tasks.list(include_failed.unwrap_or(true));
        TaskListResponse {
            count: tasks.len(),
            tasks,
        }
    }

    pub async fn handle_generate_playbook(
        &self,
        req: GeneratePlaybookRequest,
    ) -> Result<PlaybookResponse, McpError> {
        let book = self
            .ctx
            .synthesize_playbook(&req.playbook_name, req.include_failed);
        let yaml = playbook::to_yaml(&book).map_err(internal)?;

        if let Some(path) = &req.output_path {
            tokio::fs::write(path, &yaml).await.map_err(|e| {
                McpError::invalid_params(format!("Cannot write '{}': {}", path, e), None)
            })?;
            tracing::info!(path = %path, "Playbook written");
        }

        Ok(PlaybookResponse {
            name: book.name,
            yaml,
            stats: book.stats,
            output_path: req.output_path,
        })
    }
}

#[tool_router]
impl McpServer {
    #[tool(
        description = "Load an Ansible-style YAML inventory from a file path or inline content. Replaces any inventory already loaded; a document that fails to parse leaves the previous one in place. Returns the group summary."
    )]
    async fn load_inventory(
        &self,
        params: Parameters<LoadInventoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_load_inventory(params.0).await?)
    }

    #[tool(
        description = "Serialize the loaded inventory back to YAML. Writes it to path when given, otherwise returns it."
    )]
    async fn export_inventory(
        &self,
        params: Parameters<ExportInventoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_export_inventory(params.0).await?)
    }

    #[tool(
        description = "Report whether an inventory is loaded, where it came from, and per-group host, variable and child counts."
    )]
    async fn get_inventory_status(&self) -> Result<CallToolResult, McpError> {
        json_result(&InventoryStatus::of(&self.ctx.store))
    }

    #[tool(
        description = "List every host in a group, including hosts reached through child groups. 'all' lists every host."
    )]
    async fn list_group_hosts(
        &self,
        params: Parameters<ListGroupHostsRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_list_group_hosts(&params.0.group)?)
    }

    #[tool(
        description = "Show a host's groups and its effective variables: all-group vars, then ancestor group vars from outermost to innermost, then the host's own vars."
    )]
    async fn get_host(
        &self,
        params: Parameters<GetHostRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_get_host(&params.0.host)?)
    }

    #[tool(description = "Draw the inventory group tree as text, like ansible-inventory --graph.")]
    async fn render_inventory_graph(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(
            self.handle_render_inventory_graph()?,
        )]))
    }

    #[tool(description = "Unload the inventory and forget its load history.")]
    async fn clear_inventory(&self) -> Result<CallToolResult, McpError> {
        let message = if self.ctx.store.clear_inventory() {
            "Inventory cleared"
        } else {
            "No inventory was loaded"
        };
        Ok(CallToolResult::success(vec![Content::text(message)]))
    }

    #[tool(
        description = "Open a session for your token, or return the existing one. Call once per client before logging activity or storing session data."
    )]
    async fn start_session(
        &self,
        params: Parameters<StartSessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_start_session(params.0))
    }

    #[tool(description = "Append an activity entry to a session's history.")]
    async fn log_session_activity(
        &self,
        params: Parameters<LogSessionActivityRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_log_session_activity(params.0)?)
    }

    #[tool(description = "Store a value under a key in a session's private data.")]
    async fn set_session_data(
        &self,
        params: Parameters<SetSessionDataRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_set_session_data(params.0)?)
    }

    #[tool(description = "Fetch a session with its full activity history and data.")]
    async fn get_session(
        &self,
        params: Parameters<SessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_get_session(&params.0.session_id)?)
    }

    #[tool(description = "List all sessions, oldest first, with activity and data counts.")]
    async fn list_sessions(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.ctx.store.list_sessions())
    }

    #[tool(
        description = "Empty a session's activities and data. The session itself, its label and creation time are kept."
    )]
    async fn clear_session_data(
        &self,
        params: Parameters<SessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_clear_session_data(&params.0.session_id)?)
    }

    #[tool(description = "Remove a session entirely.")]
    async fn delete_session(
        &self,
        params: Parameters<SessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_delete_session(&params.0.session_id)?)
    }

    #[tool(description = "Store a value in the shared key/value store, visible to every session.")]
    async fn set_value(
        &self,
        params: Parameters<SetValueRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_set_value(params.0))
    }

    #[tool(description = "Read a value from the shared key/value store.")]
    async fn get_value(&self, params: Parameters<KeyRequest>) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_get_value(&params.0.key)?)
    }

    #[tool(description = "Remove a key from the shared key/value store, returning its last value.")]
    async fn delete_value(
        &self,
        params: Parameters<KeyRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_delete_value(&params.0.key)?)
    }

    #[tool(description = "List the keys in the shared key/value store, sorted.")]
    async fn list_values(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.ctx.store.list_generic_keys())
    }

    #[tool(description = "Counts for sessions, activities, stored values, inventory and the task log.")]
    async fn get_state_stats(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_get_state_stats())
    }

    #[tool(description = "Dump store contents as JSON for debugging or backup.")]
    async fn export_state(
        &self,
        params: Parameters<ExportStateRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_export_state(params.0.section.as_deref())?)
    }

    #[tool(
        description = "Record a module run after it has executed, whether it succeeded or failed. The task log is what generate_playbook replays, so record every run with the exact module arguments and host target used."
    )]
    async fn record_task(
        &self,
        params: Parameters<RecordTaskRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_record_task(params.0)?)
    }

    #[tool(description = "List recorded module runs in execution order.")]
    async fn get_playbook_tasks(
        &self,
        params: Parameters<GetPlaybookTasksRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_get_playbook_tasks(params.0.include_failed))
    }

    #[tool(description = "Discard every recorded module run. Sequence numbers keep counting up.")]
    async fn clear_playbook_tasks(&self) -> Result<CallToolResult, McpError> {
        json_result(&ClearedResponse {
            cleared: self.ctx.tasks.clear(),
        })
    }

    #[tool(
        description = "Turn the recorded module runs into an Ansible playbook. Consecutive runs against the same host target share a play. Failed runs are left out unless include_failed is set. Optionally writes the YAML to output_path."
    )]
    async fn generate_playbook(
        &self,
        params: Parameters<GeneratePlaybookRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_generate_playbook(params.0).await?)
    }

    // ============================================================
    // Secrets
    // ============================================================

    #[tool(
        description = "List secret names, sources and tags with counts. Secret values are never returned."
    )]
    async fn get_secrets_status(&self) -> Result<CallToolResult, McpError> {
        json_result(&SecretsStatus::of(&self.ctx.secrets))
    }

    #[tool(description = "Check whether a secret is available, returning its metadata but not its value.")]
    async fn check_secret_exists(
        &self,
        params: Parameters<SecretNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.handle_check_secret_exists(&params.0.name))
    }

    #[tool(
        description = "Drop all secrets and re-read FTL_SECRET_* environment variables. Secrets set at runtime are discarded."
    )]
    async fn reload_secrets(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.ctx.secrets.reload())
    }
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: "ftl-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            instructions: Some(
                r#"ftl-mcp keeps the state behind an automation session: the host inventory, per-client sessions, a shared key/value store, and a log of module runs that can be replayed as a playbook.

INVENTORY:
- load_inventory reads Ansible-style YAML (groups with hosts, vars, children).
- list_group_hosts, get_host and render_inventory_graph answer questions about it.
- export_inventory writes it back out.

SESSIONS:
- start_session with a token unique to your client, then log_session_activity and set_session_data as you work.

RECORDING WORK:
1. Run a module through your execution engine.
2. Call record_task with the module name, its arguments, the host target and the outcome. Record failures too.
3. When done, call generate_playbook to get a playbook that repeats the successful runs in order.

SECRETS:
- get_secrets_status and check_secret_exists show which credentials are configured. Values are never returned."#
                    .into(),
            ),
            ..Default::default()
        }
    }
}

pub async fn run_stdio_server(ctx: Context) -> anyhow::Result<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!("Starting MCP server via stdio");

    let service = McpServer::new(ctx);
    let server = service.serve((stdin(), stdout())).await?;

    let quit_reason = server.waiting().await?;
    tracing::info!("MCP server stopped: {:?}", quit_reason);

    Ok(())
}
