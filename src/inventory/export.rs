use std::collections::HashSet;

use serde_yaml::{Mapping, Value};

use crate::models::{InventoryModel, VarValue, Vars, ALL_GROUP};

/// Groups nested deeper than this are emitted as top-level entries instead,
/// keeping the document within the YAML reader's nesting limit.
const MAX_NESTING: usize = 32;

/// Serialize a model back to the inventory format.
///
/// Each group and host is written out in full the first time it appears in
/// a depth-first walk from `all`; later references are bare names. Re-parsing
/// the output yields the same hosts, variables and resolved membership.
pub fn export(model: &InventoryModel) -> Result<String, serde_yaml::Error> {
    let mut exporter = Exporter {
        model,
        groups_done: HashSet::new(),
        hosts_done: HashSet::new(),
        hoisted: Vec::new(),
    };

    let mut root = Mapping::new();
    let mut pending: Vec<&str> = vec![ALL_GROUP];
    loop {
        for name in pending {
            if exporter.groups_done.contains(name) || !model.groups.contains_key(name) {
                continue;
            }
            let node = exporter.group_node(name, 0);
            root.insert(Value::from(name), node);
        }

        pending = std::mem::take(&mut exporter.hoisted);
        if pending.is_empty() {
            // Anything unreachable from `all` would be lost otherwise.
            pending = model
                .groups
                .keys()
                .map(String::as_str)
                .filter(|g| !exporter.groups_done.contains(g))
                .collect();
        }
        if pending.is_empty() {
            break;
        }
    }

    serde_yaml::to_string(&Value::Mapping(root))
}

struct Exporter<'a> {
    model: &'a InventoryModel,
    groups_done: HashSet<&'a str>,
    hosts_done: HashSet<&'a str>,
    hoisted: Vec<&'a str>,
}

impl<'a> Exporter<'a> {
    fn group_node(&mut self, name: &'a str, depth: usize) -> Value {
        if self.groups_done.contains(name) {
            return Value::Null;
        }
        if depth > MAX_NESTING {
            self.hoisted.push(name);
            return Value::Null;
        }
        let model = self.model;
        let Some(group) = model.groups.get(name) else {
            return Value::Null;
        };
        self.groups_done.insert(name);

        let mut node = Mapping::new();
        if !group.hosts.is_empty() {
            let mut hosts = Mapping::new();
            for host in &group.hosts {
                hosts.insert(Value::from(host.as_str()), self.host_node(host));
            }
            node.insert(Value::from("hosts"), Value::Mapping(hosts));
        }
        if !group.vars.is_empty() {
            node.insert(Value::from("vars"), vars_value(&group.vars));
        }
        if !group.children.is_empty() {
            let mut children = Mapping::new();
            for child in &group.children {
                let child_node = self.group_node(child, depth + 1);
                children.insert(Value::from(child.as_str()), child_node);
            }
            node.insert(Value::from("children"), Value::Mapping(children));
        }

        if node.is_empty() {
            Value::Null
        } else {
            Value::Mapping(node)
        }
    }

    fn host_node(&mut self, host: &'a str) -> Value {
        if !self.hosts_done.insert(host) {
            return Value::Null;
        }
        match self.model.hosts.get(host) {
            Some(h) if !h.vars.is_empty() => vars_value(&h.vars),
            _ => Value::Null,
        }
    }
}

fn vars_value(vars: &Vars) -> Value {
    Value::Mapping(
        vars.iter()
            .map(|(k, v)| (Value::from(k.as_str()), var_value(v)))
            .collect(),
    )
}

fn var_value(value: &VarValue) -> Value {
    match value {
        VarValue::Null => Value::Null,
        VarValue::Bool(b) => Value::Bool(*b),
        VarValue::Integer(i) => Value::from(*i),
        VarValue::Unsigned(u) => Value::from(*u),
        VarValue::Float(f) => Value::from(*f),
        VarValue::String(s) => Value::String(s.clone()),
        VarValue::List(items) => Value::Sequence(items.iter().map(var_value).collect()),
        VarValue::Map(map) => Value::Mapping(
            map.iter()
                .map(|(k, v)| (Value::from(k.as_str()), var_value(v)))
                .collect(),
        ),
    }
}
