use ftl_mcp::error::PlaybookError;
use ftl_mcp::inventory::parse;
use ftl_mcp::models::*;
use ftl_mcp::playbook::{from_yaml, synthesize, to_yaml};
use ftl_mcp::store::TaskLog;
use ftl_mcp::Context;
use serde_json::json;
use speculate2::speculate;

fn args(value: serde_json::Value) -> ModuleArgs {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("module args must be an object, got {}", other),
    }
}

fn record(log: &TaskLog, operation: &str, target: HostTarget, status: TaskStatus, module_args: serde_json::Value) {
    log.record(RecordTaskInput {
        operation: operation.to_string(),
        args: args(module_args),
        target,
        status,
        changed: false,
        summary: format!("{} done", operation),
    });
}

fn web() -> HostTarget {
    HostTarget::from("web")
}

speculate! {
    before {
        let log = TaskLog::new();
    }

    describe "synthesize" {
        it "produces no plays for an empty log" {
            let book = synthesize(&log.list(true), "empty", false, None);
            assert!(book.plays.is_empty());
            assert_eq!(book.stats, PlaybookStats::default());
        }

        it "drops failed records unless asked" {
            record(&log, "dnf", web(), TaskStatus::Succeeded, json!({"name": "nginx", "state": "present"}));
            record(&log, "copy", web(), TaskStatus::Failed, json!({"src": "a", "dest": "b"}));
            record(&log, "service", web(), TaskStatus::Succeeded, json!({"name": "nginx", "state": "started"}));

            let book = synthesize(&log.list(true), "site", false, None);
            assert_eq!(book.plays.len(), 1);
            let modules: Vec<&str> = book.plays[0].tasks.iter().map(|t| t.module.as_str()).collect();
            assert_eq!(modules, vec!["dnf", "service"]);
            assert_eq!(book.stats.excluded_failed, 1);
            assert_eq!(book.stats.total_steps, 2);

            let book = synthesize(&log.list(true), "site", true, None);
            assert_eq!(book.plays.len(), 1);
            let modules: Vec<&str> = book.plays[0].tasks.iter().map(|t| t.module.as_str()).collect();
            assert_eq!(modules, vec!["dnf", "copy", "service"]);
            assert_eq!(book.stats.excluded_failed, 0);
        }

        it "starts a new play whenever the target changes" {
            record(&log, "ping", web(), TaskStatus::Succeeded, json!({}));
            record(&log, "ping", HostTarget::from("db"), TaskStatus::Succeeded, json!({}));
            record(&log, "dnf", HostTarget::from("db"), TaskStatus::Succeeded, json!({"name": "postgresql"}));
            record(&log, "service", web(), TaskStatus::Succeeded, json!({"name": "nginx"}));

            let book = synthesize(&log.list(true), "site", false, None);
            let shape: Vec<(String, usize)> = book
                .plays
                .iter()
                .map(|p| (p.hosts.to_string(), p.tasks.len()))
                .collect();
            assert_eq!(shape, vec![
                ("web".to_string(), 1),
                ("db".to_string(), 2),
                ("web".to_string(), 1),
            ]);
            assert_eq!(book.stats.play_count, 3);
        }

        it "merges runs that become adjacent after filtering" {
            record(&log, "ping", web(), TaskStatus::Succeeded, json!({}));
            record(&log, "ping", HostTarget::from("db"), TaskStatus::Failed, json!({}));
            record(&log, "dnf", web(), TaskStatus::Succeeded, json!({}));

            let book = synthesize(&log.list(true), "site", false, None);
            assert_eq!(book.plays.len(), 1);
            assert_eq!(book.plays[0].tasks.len(), 2);
        }

        it "names plays after the playbook" {
            record(&log, "ping", web(), TaskStatus::Succeeded, json!({}));
            let single = synthesize(&log.list(true), "deploy", false, None);
            assert_eq!(single.plays[0].name, "deploy");

            record(&log, "ping", HostTarget::from("db"), TaskStatus::Succeeded, json!({}));
            let double = synthesize(&log.list(true), "deploy", false, None);
            assert_eq!(double.plays[0].name, "deploy (1 of 2)");
            assert_eq!(double.plays[1].name, "deploy (2 of 2)");
        }

        it "passes arguments and multi-host targets through untouched" {
            let target = HostTarget::Many(vec!["web01".to_string(), "db".to_string()]);
            let module_args = json!({"content": "hi", "mode": "0644", "nested": {"list": [1, 2]}});
            record(&log, "copy", target.clone(), TaskStatus::Succeeded, module_args.clone());

            let book = synthesize(&log.list(true), "site", false, None);
            assert_eq!(book.plays[0].hosts, target);
            assert_eq!(book.plays[0].tasks[0].args, args(module_args));
            assert_eq!(book.plays[0].tasks[0].name, "Execute copy");
        }

        it "reports modules and targets" {
            record(&log, "service", web(), TaskStatus::Succeeded, json!({}));
            record(&log, "dnf", HostTarget::Many(vec!["db".to_string(), "web".to_string()]), TaskStatus::Succeeded, json!({}));
            record(&log, "dnf", web(), TaskStatus::Succeeded, json!({}));

            let book = synthesize(&log.list(true), "site", false, None);
            assert_eq!(book.stats.modules_used, vec!["dnf", "service"]);
            assert_eq!(book.stats.targets, vec!["web", "db"]);
            assert!(book.stats.unknown_targets.is_empty());
        }

        it "flags targets missing from the inventory" {
            let inventory = parse("web:\n  hosts:\n    web01:\n").expect("parse");
            record(&log, "ping", web(), TaskStatus::Succeeded, json!({}));
            record(&log, "ping", HostTarget::from("web01"), TaskStatus::Succeeded, json!({}));
            record(&log, "ping", HostTarget::from("mail"), TaskStatus::Succeeded, json!({}));

            let book = synthesize(&log.list(true), "site", false, Some(&inventory));
            assert_eq!(book.stats.unknown_targets, vec!["mail"]);
            assert_eq!(book.plays.len(), 3);
        }
    }

    describe "yaml" {
        it "writes plays with name, hosts and tasks" {
            record(&log, "dnf", web(), TaskStatus::Succeeded, json!({"name": "nginx"}));
            let text = to_yaml(&synthesize(&log.list(true), "site", false, None)).expect("yaml");

            let doc: serde_yaml::Value = serde_yaml::from_str(&text).expect("valid yaml");
            let play = &doc[0];
            let keys: Vec<&str> = play
                .as_mapping()
                .expect("play mapping")
                .keys()
                .filter_map(|k| k.as_str())
                .collect();
            assert_eq!(keys, vec!["name", "hosts", "tasks"]);
            assert_eq!(play["hosts"].as_str(), Some("web"));
            assert_eq!(play["tasks"][0]["name"].as_str(), Some("Execute dnf"));
            assert_eq!(play["tasks"][0]["dnf"]["name"].as_str(), Some("nginx"));
        }

        it "writes an empty list for an empty playbook" {
            let text = to_yaml(&synthesize(&[], "empty", false, None)).expect("yaml");
            assert!(from_yaml(&text).expect("read back").is_empty());
        }

        it "reads back every step of the filtered log" {
            record(&log, "dnf", web(), TaskStatus::Succeeded, json!({"name": ["nginx", "certbot"], "state": "latest"}));
            record(&log, "template", web(), TaskStatus::Failed, json!({"src": "nginx.conf.j2"}));
            record(&log, "user", HostTarget::Many(vec!["db01".to_string(), "db02".to_string()]), TaskStatus::Succeeded, json!({"name": "backup", "uid": 1050, "system": true}));
            record(&log, "ping", web(), TaskStatus::Succeeded, json!({}));

            let book = synthesize(&log.list(true), "site", false, None);
            let plays = from_yaml(&to_yaml(&book).expect("yaml")).expect("read back");
            assert_eq!(plays, book.plays);

            let replayed: Vec<(String, ModuleArgs, HostTarget)> = plays
                .iter()
                .flat_map(|p| p.tasks.iter().map(move |t| (t.module.clone(), t.args.clone(), p.hosts.clone())))
                .collect();
            let logged: Vec<(String, ModuleArgs, HostTarget)> = log
                .list(false)
                .into_iter()
                .map(|r| (r.operation, r.args, r.target))
                .collect();
            assert_eq!(replayed, logged);
        }

        it "reads back a module called name" {
            record(&log, "name", web(), TaskStatus::Succeeded, json!({"x": 1}));
            record(&log, "name", web(), TaskStatus::Succeeded, json!({}));
            record(&log, "ping", web(), TaskStatus::Succeeded, json!({}));

            let book = synthesize(&log.list(true), "pb", false, None);
            let plays = from_yaml(&to_yaml(&book).expect("yaml")).expect("read back");
            assert_eq!(plays, book.plays);
            assert_eq!(plays[0].tasks[0].module, "name");
            assert_eq!(plays[0].tasks[0].args, args(json!({"x": 1})));
            assert!(plays[0].tasks[1].args.is_empty());
        }

        it "accepts hand-written plays" {
            let plays = from_yaml(
                "- hosts: [web, db]\n  tasks:\n    - ping:\n    - name: install\n      dnf:\n        name: git\n",
            )
            .expect("read");
            assert_eq!(plays[0].hosts, HostTarget::Many(vec!["web".to_string(), "db".to_string()]));
            assert_eq!(plays[0].tasks[0].module, "ping");
            assert!(plays[0].tasks[0].args.is_empty());
            assert_eq!(plays[0].tasks[1].name, "install");
        }

        it "rejects a task with two modules" {
            let err = from_yaml("- hosts: web\n  tasks:\n    - ping:\n      dnf:\n").expect_err("two modules");
            assert!(matches!(err, PlaybookError::Malformed(_)));
        }

        it "rejects a play without hosts" {
            let err = from_yaml("- name: x\n  tasks: []\n").expect_err("no hosts");
            assert!(matches!(err, PlaybookError::Malformed(_)));
        }

        it "rejects text that is not a list of plays" {
            assert!(matches!(from_yaml("hosts: web\n"), Err(PlaybookError::Yaml(_))));
        }
    }

    describe "context" {
        it "synthesizes from the shared log against the loaded inventory" {
            let ctx = Context::new();
            ctx.store.load_inventory("web:\n  hosts:\n    web01:\n", "inline").expect("load");
            ctx.tasks.record(RecordTaskInput {
                operation: "ping".to_string(),
                args: ModuleArgs::new(),
                target: HostTarget::from("cache"),
                status: TaskStatus::Succeeded,
                changed: false,
                summary: String::new(),
            });

            let book = ctx.synthesize_playbook("site", false);
            assert_eq!(book.stats.total_steps, 1);
            assert_eq!(book.stats.unknown_targets, vec!["cache"]);
        }
    }
}
