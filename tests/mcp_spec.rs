//! MCP server integration tests, driving the tool handlers directly.

use ftl_mcp::mcp::*;
use ftl_mcp::models::*;
use ftl_mcp::Context;
use serde_json::json;

const INVENTORY: &str = "all:\n  vars:\n    ansible_user: deploy\nweb:\n  hosts:\n    web01:\n      ansible_host: 10.0.1.10\n    web02:\n  children:\n    canary:\n      hosts:\n        web03:\ndb:\n  hosts:\n    db01:\n";

fn setup() -> (McpServer, Context) {
    let ctx = Context::new();
    let server = McpServer::new(ctx.clone());
    (server, ctx)
}

async fn setup_with_inventory() -> (McpServer, Context) {
    let (server, ctx) = setup();
    server
        .handle_load_inventory(LoadInventoryRequest {
            path: None,
            content: Some(INVENTORY.to_string()),
        })
        .await
        .expect("inventory should load");
    (server, ctx)
}

fn record(server: &McpServer, module: &str, hosts: HostsInput, status: &str) -> RecordTaskResponse {
    server
        .handle_record_task(RecordTaskRequest {
            module_name: module.to_string(),
            hosts,
            module_args: None,
            status: status.to_string(),
            summary: None,
            changed: false,
        })
        .expect("record should succeed")
}

// ============================================================
// Inventory Tools
// ============================================================

mod inventory_tools {
    use super::*;

    #[tokio::test]
    async fn load_inventory_from_content_reports_groups() {
        let (server, _) = setup();

        let status = server
            .handle_load_inventory(LoadInventoryRequest {
                path: None,
                content: Some(INVENTORY.to_string()),
            })
            .await
            .expect("load");

        assert!(status.loaded);
        assert_eq!(status.source.as_deref(), Some("inline"));
        assert_eq!(status.host_count, 4);
        assert_eq!(status.group_count, 4);
        let web = status.groups.iter().find(|g| g.name == "web").expect("web");
        assert_eq!(web.host_count, 3);
    }

    #[tokio::test]
    async fn load_inventory_from_file() {
        let (server, ctx) = setup();
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("hosts.yml");
        std::fs::write(&path, INVENTORY).expect("write inventory");

        let status = server
            .handle_load_inventory(LoadInventoryRequest {
                path: Some(path.display().to_string()),
                content: None,
            })
            .await
            .expect("load");

        assert_eq!(status.source, Some(path.display().to_string()));
        assert!(ctx.store.inventory().is_some());
    }

    #[tokio::test]
    async fn load_inventory_requires_exactly_one_source() {
        let (server, _) = setup();

        let neither = server.handle_load_inventory(LoadInventoryRequest::default()).await;
        assert!(neither.is_err());

        let both = server
            .handle_load_inventory(LoadInventoryRequest {
                path: Some("hosts.yml".to_string()),
                content: Some(INVENTORY.to_string()),
            })
            .await;
        assert!(both.is_err());
    }

    #[tokio::test]
    async fn load_inventory_reports_missing_file() {
        let (server, _) = setup();
        let result = server
            .handle_load_inventory(LoadInventoryRequest {
                path: Some("/nonexistent/hosts.yml".to_string()),
                content: None,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_inventory() {
        let (server, ctx) = setup_with_inventory().await;

        let err = server
            .handle_load_inventory(LoadInventoryRequest {
                path: None,
                content: Some("a:\n  children:\n    b:\n      children:\n        a:\n".to_string()),
            })
            .await
            .expect_err("cycle should be rejected");

        assert!(err.message.contains("cycle"));
        assert_eq!(ctx.store.inventory().expect("kept").host_count(), 4);
    }

    #[tokio::test]
    async fn export_inventory_returns_yaml() {
        let (server, _) = setup_with_inventory().await;

        let export = server
            .handle_export_inventory(ExportInventoryRequest::default())
            .await
            .expect("export");
        let content = export.content.expect("content returned");
        assert_eq!(export.bytes, content.len());

        let reparsed = ftl_mcp::inventory::parse(&content).expect("re-parse");
        assert_eq!(reparsed.host_count(), 4);
    }

    #[tokio::test]
    async fn export_inventory_writes_file() {
        let (server, _) = setup_with_inventory().await;
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out.yml");

        let export = server
            .handle_export_inventory(ExportInventoryRequest {
                path: Some(path.display().to_string()),
            })
            .await
            .expect("export");

        assert!(export.content.is_none());
        let written = std::fs::read_to_string(&path).expect("file written");
        assert_eq!(written.len(), export.bytes);
        assert!(written.contains("web01"));
    }

    #[tokio::test]
    async fn export_inventory_without_inventory_fails() {
        let (server, _) = setup();
        let result = server
            .handle_export_inventory(ExportInventoryRequest::default())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn list_group_hosts_flattens_children() {
        let (server, _) = setup_with_inventory().await;

        let web = server.handle_list_group_hosts("web").expect("web");
        assert_eq!(web.hosts, vec!["web01", "web02", "web03"]);

        let all = server.handle_list_group_hosts("all").expect("all");
        assert_eq!(all.hosts.len(), 4);

        assert!(server.handle_list_group_hosts("mail").is_err());
    }

    #[tokio::test]
    async fn get_host_merges_inherited_vars() {
        let (server, _) = setup_with_inventory().await;

        let host = server.handle_get_host("web01").expect("web01");
        assert_eq!(host.groups, vec!["all", "web"]);
        assert_eq!(
            host.vars.get("ansible_user"),
            Some(&VarValue::String("deploy".to_string()))
        );
        assert_eq!(
            host.vars.get("ansible_host"),
            Some(&VarValue::String("10.0.1.10".to_string()))
        );
    }

    #[tokio::test]
    async fn render_graph_draws_tree() {
        let (server, _) = setup_with_inventory().await;
        let graph = server.handle_render_inventory_graph().expect("graph");
        assert!(graph.starts_with("@all\n"));
        assert!(graph.contains("@canary"));
    }

    #[tokio::test]
    async fn queries_without_inventory_fail() {
        let (server, _) = setup();
        assert!(server.handle_list_group_hosts("all").is_err());
        assert!(server.handle_get_host("web01").is_err());
        assert!(server.handle_render_inventory_graph().is_err());
    }
}

// ============================================================
// Session and Value Tools
// ============================================================

mod session_tools {
    use super::*;

    fn start(server: &McpServer, id: &str) -> Session {
        server.handle_start_session(StartSessionRequest {
            session_id: id.to_string(),
            label: Some(format!("{} label", id)),
        })
    }

    #[tokio::test]
    async fn start_session_is_idempotent() {
        let (server, ctx) = setup();
        let first = start(&server, "s1");
        let again = server.handle_start_session(StartSessionRequest {
            session_id: "s1".to_string(),
            label: Some("other".to_string()),
        });

        assert_eq!(again.label, first.label);
        assert_eq!(ctx.store.list_sessions().len(), 1);
    }

    #[tokio::test]
    async fn activities_and_data_are_recorded() {
        let (server, _) = setup();
        start(&server, "s1");

        let activity = server
            .handle_log_session_activity(LogSessionActivityRequest {
                session_id: "s1".to_string(),
                description: "installed nginx".to_string(),
                payload: Some(json!({"changed": true})),
            })
            .expect("log");
        assert_eq!(activity.seq, 1);

        let summary = server
            .handle_set_session_data(SetSessionDataRequest {
                session_id: "s1".to_string(),
                key: "stage".to_string(),
                value: json!("web"),
            })
            .expect("set");
        assert_eq!(summary.data_keys, 1);
        assert_eq!(summary.activity_count, 1);

        let session = server.handle_get_session("s1").expect("get");
        assert_eq!(session.data.get("stage"), Some(&json!("web")));
    }

    #[tokio::test]
    async fn unknown_session_is_rejected() {
        let (server, _) = setup();
        assert!(server.handle_get_session("nope").is_err());
        assert!(server.handle_clear_session_data("nope").is_err());
        assert!(server.handle_delete_session("nope").is_err());
        assert!(server
            .handle_log_session_activity(LogSessionActivityRequest {
                session_id: "nope".to_string(),
                description: "x".to_string(),
                payload: None,
            })
            .is_err());
    }

    #[tokio::test]
    async fn clear_then_delete_session() {
        let (server, ctx) = setup();
        start(&server, "s1");
        server
            .handle_log_session_activity(LogSessionActivityRequest {
                session_id: "s1".to_string(),
                description: "x".to_string(),
                payload: None,
            })
            .expect("log");

        let cleared = server.handle_clear_session_data("s1").expect("clear");
        assert_eq!(cleared.activity_count, 0);
        assert_eq!(cleared.label, "s1 label");

        server.handle_delete_session("s1").expect("delete");
        assert!(ctx.store.list_sessions().is_empty());
    }

    #[tokio::test]
    async fn generic_values_round_trip() {
        let (server, _) = setup();

        let set = server.handle_set_value(SetValueRequest {
            key: "release".to_string(),
            value: json!("1.4.2"),
        });
        assert!(!set.replaced);

        let got = server.handle_get_value("release").expect("get");
        assert_eq!(got.value, json!("1.4.2"));

        let deleted = server.handle_delete_value("release").expect("delete");
        assert_eq!(deleted.value, json!("1.4.2"));
        assert!(server.handle_get_value("release").is_err());
        assert!(server.handle_delete_value("release").is_err());
    }

    #[tokio::test]
    async fn stats_and_export_cover_everything() {
        let (server, _) = setup_with_inventory().await;
        start(&server, "s1");
        server.handle_set_value(SetValueRequest {
            key: "k".to_string(),
            value: json!(1),
        });
        record(&server, "ping", HostsInput::One("all".to_string()), "succeeded");

        let stats = server.handle_get_state_stats();
        assert_eq!(stats.store.session_count, 1);
        assert_eq!(stats.store.generic_key_count, 1);
        assert_eq!(stats.store.host_count, 4);
        assert_eq!(stats.tasks.total_tasks, 1);

        let generic = server.handle_export_state(Some("generic")).expect("export");
        assert_eq!(generic, json!({"k": 1}));
        let all = server.handle_export_state(None).expect("export");
        assert!(all.get("sessions").is_some());
        assert!(server.handle_export_state(Some("bogus")).is_err());
    }
}

// ============================================================
// Task and Playbook Tools
// ============================================================

mod playbook_tools {
    use super::*;

    #[tokio::test]
    async fn record_task_assigns_sequence_numbers() {
        let (server, _) = setup();
        let first = record(&server, "ping", HostsInput::One("all".to_string()), "succeeded");
        let second = record(&server, "ping", HostsInput::One("all".to_string()), "failed");

        assert!(second.seq > first.seq);
        assert_eq!(second.total_tasks, 2);
    }

    #[tokio::test]
    async fn record_task_rejects_unknown_status() {
        let (server, ctx) = setup();
        let result = server.handle_record_task(RecordTaskRequest {
            module_name: "ping".to_string(),
            hosts: HostsInput::One("all".to_string()),
            module_args: None,
            status: "maybe".to_string(),
            summary: None,
            changed: false,
        });

        assert!(result.is_err());
        assert!(ctx.tasks.is_empty());
    }

    #[tokio::test]
    async fn get_playbook_tasks_lists_failures_by_default() {
        let (server, _) = setup();
        record(&server, "ping", HostsInput::One("web".to_string()), "succeeded");
        record(&server, "copy", HostsInput::One("web".to_string()), "failed");

        assert_eq!(server.handle_get_playbook_tasks(None).count, 2);
        assert_eq!(server.handle_get_playbook_tasks(Some(false)).count, 1);
    }

    #[tokio::test]
    async fn generate_playbook_groups_by_target() {
        let (server, _) = setup_with_inventory().await;
        record(&server, "dnf", HostsInput::One("web".to_string()), "succeeded");
        record(&server, "copy", HostsInput::One("web".to_string()), "failed");
        record(&server, "service", HostsInput::One("web".to_string()), "succeeded");
        record(
            &server,
            "user",
            HostsInput::Many(vec!["db01".to_string(), "cache".to_string()]),
            "succeeded",
        );

        let response = server
            .handle_generate_playbook(GeneratePlaybookRequest {
                playbook_name: "site".to_string(),
                include_failed: false,
                output_path: None,
            })
            .await
            .expect("generate");

        assert_eq!(response.stats.play_count, 2);
        assert_eq!(response.stats.total_steps, 3);
        assert_eq!(response.stats.excluded_failed, 1);
        assert_eq!(response.stats.unknown_targets, vec!["cache"]);

        let plays = ftl_mcp::playbook::from_yaml(&response.yaml).expect("valid playbook");
        assert_eq!(plays.len(), 2);
        assert_eq!(plays[0].tasks.len(), 2);
    }

    #[tokio::test]
    async fn generate_playbook_writes_output_file() {
        let (server, _) = setup();
        record(&server, "ping", HostsInput::One("all".to_string()), "succeeded");
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("site.yml");

        let response = server
            .handle_generate_playbook(GeneratePlaybookRequest {
                playbook_name: "site".to_string(),
                include_failed: false,
                output_path: Some(path.display().to_string()),
            })
            .await
            .expect("generate");

        let written = std::fs::read_to_string(&path).expect("file written");
        assert_eq!(written, response.yaml);
    }

    #[tokio::test]
    async fn generate_playbook_on_empty_log_has_no_plays() {
        let (server, _) = setup();
        let response = server
            .handle_generate_playbook(GeneratePlaybookRequest {
                playbook_name: "nothing".to_string(),
                include_failed: true,
                output_path: None,
            })
            .await
            .expect("generate");

        assert_eq!(response.stats.play_count, 0);
        assert!(ftl_mcp::playbook::from_yaml(&response.yaml)
            .expect("valid")
            .is_empty());
    }
}

mod secret_tools {
    use super::*;
    use ftl_mcp::store::SecretStore;

    fn setup_with_secrets() -> (McpServer, Context) {
        let ctx = Context {
            secrets: SecretStore::from_vars(vec![(
                "FTL_SECRET_SSH_KEY_FILE".to_string(),
                "/keys/deploy.pem".to_string(),
            )]),
            ..Context::default()
        };
        (McpServer::new(ctx.clone()), ctx)
    }

    #[tokio::test]
    async fn check_secret_exists_reports_metadata_only() {
        let (server, _) = setup_with_secrets();

        let found = server.handle_check_secret_exists("SSH_KEY_FILE");
        assert!(found.exists);
        assert_eq!(
            found.metadata.as_ref().map(|m| m.name.as_str()),
            Some("ssh_key_file")
        );

        let text = serde_json::to_string(&found).expect("json");
        assert!(!text.contains("/keys/deploy.pem"));
    }

    #[tokio::test]
    async fn check_secret_exists_for_unknown_name() {
        let (server, _) = setup_with_secrets();

        let missing = server.handle_check_secret_exists("nonexistent_secret");
        assert!(!missing.exists);
        assert!(missing.metadata.is_none());
        assert_eq!(missing.secret_name, "nonexistent_secret");
    }

    #[tokio::test]
    async fn status_lists_names_without_values() {
        let (_, ctx) = setup_with_secrets();
        ctx.secrets.set("vault_token", "s.abc123", "", Vec::new());

        let status = SecretsStatus::of(&ctx.secrets);
        assert_eq!(status.statistics.total_secrets, 2);
        let names: Vec<&str> = status.secrets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ssh_key_file", "vault_token"]);

        let text = serde_json::to_string(&status).expect("json");
        assert!(!text.contains("s.abc123"));
        assert!(!text.contains("/keys/deploy.pem"));
    }

    #[tokio::test]
    async fn state_stats_include_secret_counts() {
        let (server, _) = setup_with_secrets();
        assert_eq!(server.handle_get_state_stats().secrets.from_environment, 1);
    }
}
