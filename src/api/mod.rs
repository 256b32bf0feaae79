mod handlers;
mod middleware;

pub use middleware::{RateLimiter, SecurityConfig};

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::context::Context;

/// Router with security disabled, for local use and tests.
pub fn create_router(ctx: Context) -> Router {
    create_router_with_config(ctx, SecurityConfig::disabled())
}

pub fn create_router_with_config(ctx: Context, config: SecurityConfig) -> Router {
    let mut protected = Router::new()
        // Inventory
        .route(
            "/inventory",
            get(handlers::get_inventory)
                .put(handlers::load_inventory)
                .delete(handlers::clear_inventory),
        )
        .route("/inventory/export", get(handlers::export_inventory))
        .route("/inventory/graph", get(handlers::inventory_graph))
        .route("/inventory/history", get(handlers::inventory_history))
        .route("/inventory/groups/{name}/hosts", get(handlers::group_hosts))
        .route("/inventory/hosts/{name}", get(handlers::get_host))
        // Sessions
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::start_session),
        )
        .route(
            "/sessions/{token}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{token}/activities", post(handlers::append_activity))
        .route("/sessions/{token}/data/{key}", put(handlers::set_session_data))
        .route("/sessions/{token}/clear", post(handlers::clear_session))
        // Generic store
        .route("/store", get(handlers::list_keys))
        .route(
            "/store/{key}",
            get(handlers::get_value)
                .put(handlers::set_value)
                .delete(handlers::delete_value),
        )
        .route("/stats", get(handlers::stats))
        // Tasks
        .route(
            "/tasks",
            get(handlers::list_tasks)
                .post(handlers::record_task)
                .delete(handlers::clear_tasks),
        )
        .route("/tasks/stats", get(handlers::task_stats))
        .route("/playbook", post(handlers::generate_playbook))
        // Secrets (metadata only)
        .route("/secrets", get(handlers::secrets_status))
        .route("/secrets/reload", post(handlers::reload_secrets))
        .route("/secrets/{name}", get(handlers::check_secret))
        .route_layer(from_fn_with_state(
            config.clone(),
            middleware::auth_middleware,
        ));

    if let Some(limiter) = config.rate_limiter.clone() {
        protected = protected.route_layer(from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(config.cors_layer())
        .with_state(ctx)
}
