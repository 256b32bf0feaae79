use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::context::Context;
use crate::error::Error;
use crate::inventory;
use crate::mcp::{
    ClearedResponse, GroupHostsResponse, HostDetails, InventoryStatus, PlaybookResponse,
    RecordTaskResponse, SecretCheck, SecretsStatus, SetValueResponse, StateStats,
    TaskListResponse, ValueResponse,
};
use crate::models::*;
use crate::playbook;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Map a store error onto a status code. Caller mistakes are returned as-is.
fn store_error(e: Error) -> (StatusCode, String) {
    let status = if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        match &e {
            Error::InventoryAbsent => StatusCode::CONFLICT,
            Error::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => return internal_error(&e),
        }
    };
    tracing::warn!(status = status.as_u16(), "Request rejected: {}", e);
    (status, e.to_string())
}

/// Log the full error and return a generic message.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn yaml_response(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/yaml")], body)
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn stats(State(ctx): State<Context>) -> Json<StateStats> {
    Json(StateStats {
        store: ctx.store.stats(),
        tasks: ctx.tasks.stats(),
        secrets: ctx.secrets.stats(),
    })
}

// ============================================================
// Inventory
// ============================================================

#[derive(Debug, Deserialize)]
pub struct LoadInventoryBody {
    pub content: String,
    pub source: Option<String>,
}

pub async fn get_inventory(State(ctx): State<Context>) -> Json<InventoryStatus> {
    Json(InventoryStatus::of(&ctx.store))
}

pub async fn load_inventory(
    State(ctx): State<Context>,
    Json(body): Json<LoadInventoryBody>,
) -> ApiResult<Json<InventoryStatus>> {
    let source = body.source.unwrap_or_else(|| "api".to_string());
    ctx.store
        .load_inventory(&body.content, source)
        .map_err(store_error)?;
    Ok(Json(InventoryStatus::of(&ctx.store)))
}

pub async fn clear_inventory(State(ctx): State<Context>) -> StatusCode {
    ctx.store.clear_inventory();
    StatusCode::NO_CONTENT
}

pub async fn export_inventory(State(ctx): State<Context>) -> ApiResult<impl IntoResponse> {
    let model = ctx.store.require_inventory().map_err(store_error)?;
    let yaml = inventory::export(&model).map_err(internal_error)?;
    Ok(yaml_response(yaml))
}

pub async fn inventory_graph(State(ctx): State<Context>) -> ApiResult<String> {
    let model = ctx.store.require_inventory().map_err(store_error)?;
    Ok(inventory::render_graph(&model))
}

pub async fn inventory_history(State(ctx): State<Context>) -> Json<Vec<InventoryLoad>> {
    Json(ctx.store.inventory_history())
}

pub async fn group_hosts(
    State(ctx): State<Context>,
    Path(name): Path<String>,
) -> ApiResult<Json<GroupHostsResponse>> {
    let hosts = ctx.store.hosts_of(&name).map_err(store_error)?;
    Ok(Json(GroupHostsResponse {
        group: name,
        hosts: hosts.into_iter().collect(),
    }))
}

pub async fn get_host(
    State(ctx): State<Context>,
    Path(name): Path<String>,
) -> ApiResult<Json<HostDetails>> {
    let groups = ctx.store.groups_of(&name).map_err(store_error)?;
    let vars = ctx.store.host_vars(&name).map_err(store_error)?;
    Ok(Json(HostDetails {
        host: name,
        groups: groups.into_iter().collect(),
        vars,
    }))
}

// ============================================================
// Sessions
// ============================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionBody {
    pub token: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivityBody {
    pub description: String,
    pub payload: Option<Value>,
}

pub async fn list_sessions(State(ctx): State<Context>) -> Json<Vec<SessionSummary>> {
    Json(ctx.store.list_sessions())
}

pub async fn start_session(
    State(ctx): State<Context>,
    Json(body): Json<StartSessionBody>,
) -> Json<Session> {
    Json(ctx.store.get_or_create_session(&body.token, &body.label))
}

pub async fn get_session(
    State(ctx): State<Context>,
    Path(token): Path<String>,
) -> ApiResult<Json<Session>> {
    ctx.store.get_session(&token).map(Json).map_err(store_error)
}

pub async fn delete_session(
    State(ctx): State<Context>,
    Path(token): Path<String>,
) -> ApiResult<StatusCode> {
    ctx.store.delete_session(&token).map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn append_activity(
    State(ctx): State<Context>,
    Path(token): Path<String>,
    Json(body): Json<ActivityBody>,
) -> ApiResult<(StatusCode, Json<Activity>)> {
    ctx.store
        .append_activity(&token, body.description, body.payload)
        .map(|a| (StatusCode::CREATED, Json(a)))
        .map_err(store_error)
}

pub async fn set_session_data(
    State(ctx): State<Context>,
    Path((token, key)): Path<(String, String)>,
    Json(value): Json<Value>,
) -> ApiResult<StatusCode> {
    ctx.store
        .set_session_data(&token, &key, value)
        .map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_session(
    State(ctx): State<Context>,
    Path(token): Path<String>,
) -> ApiResult<Json<SessionSummary>> {
    ctx.store
        .clear_session_data(&token)
        .map(Json)
        .map_err(store_error)
}

// ============================================================
// Generic store
// ============================================================

pub async fn list_keys(State(ctx): State<Context>) -> Json<Vec<String>> {
    Json(ctx.store.list_generic_keys())
}

pub async fn get_value(
    State(ctx): State<Context>,
    Path(key): Path<String>,
) -> ApiResult<Json<ValueResponse>> {
    let value = ctx
        .store
        .get_generic(&key)
        .ok_or_else(|| store_error(Error::KeyNotFound(key.clone())))?;
    Ok(Json(ValueResponse { key, value }))
}

pub async fn set_value(
    State(ctx): State<Context>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> Json<SetValueResponse> {
    let replaced = ctx.store.set_generic(&key, value).is_some();
    Json(SetValueResponse { key, replaced })
}

pub async fn delete_value(
    State(ctx): State<Context>,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    match ctx.store.delete_generic(&key) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(store_error(Error::KeyNotFound(key))),
    }
}

// ============================================================
// Tasks and playbooks
// ============================================================

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub include_failed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PlaybookBody {
    pub name: String,
    #[serde(default)]
    pub include_failed: bool,
}

pub async fn list_tasks(
    State(ctx): State<Context>,
    Query(query): Query<TaskListQuery>,
) -> Json<TaskListResponse> {
    let tasks = ctx.tasks.list(query.include_failed.unwrap_or(true));
    Json(TaskListResponse {
        count: tasks.len(),
        tasks,
    })
}

pub async fn record_task(
    State(ctx): State<Context>,
    Json(input): Json<RecordTaskInput>,
) -> (StatusCode, Json<RecordTaskResponse>) {
    let seq = ctx.tasks.record(input);
    (
        StatusCode::CREATED,
        Json(RecordTaskResponse {
            seq,
            total_tasks: ctx.tasks.len(),
        }),
    )
}

pub async fn clear_tasks(State(ctx): State<Context>) -> Json<ClearedResponse> {
    Json(ClearedResponse {
        cleared: ctx.tasks.clear(),
    })
}

pub async fn task_stats(State(ctx): State<Context>) -> Json<TaskLogStats> {
    Json(ctx.tasks.stats())
}

pub async fn generate_playbook(
    State(ctx): State<Context>,
    Json(body): Json<PlaybookBody>,
) -> ApiResult<Json<PlaybookResponse>> {
    let book = ctx.synthesize_playbook(&body.name, body.include_failed);
    let yaml = playbook::to_yaml(&book).map_err(internal_error)?;
    Ok(Json(PlaybookResponse {
        name: book.name,
        yaml,
        stats: book.stats,
        output_path: None,
    }))
}

// ============================================================
// Secrets
// ============================================================

pub async fn secrets_status(State(ctx): State<Context>) -> Json<SecretsStatus> {
    Json(SecretsStatus::of(&ctx.secrets))
}

pub async fn check_secret(
    State(ctx): State<Context>,
    Path(name): Path<String>,
) -> Json<SecretCheck> {
    let metadata = ctx.secrets.metadata(&name);
    Json(SecretCheck {
        secret_name: name,
        exists: metadata.is_some(),
        metadata,
    })
}

pub async fn reload_secrets(State(ctx): State<Context>) -> Json<ReloadSummary> {
    Json(ctx.secrets.reload())
}
