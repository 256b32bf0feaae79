use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use crate::error::ParseError;
use crate::models::{Group, Host, InventoryModel, VarValue, Vars, ALL_GROUP};

/// Parse an inventory document into a resolved model.
///
/// Host variables declared more than once are merged, last write wins.
/// Cycles in `children` and malformed nodes fail the whole parse.
pub fn parse(text: &str) -> Result<InventoryModel, ParseError> {
    let root: Value = serde_yaml::from_str(text).map_err(|e| ParseError::Yaml(e.to_string()))?;
    let root = match untag(root) {
        Value::Null => Mapping::new(),
        Value::Mapping(m) => m,
        _ => return Err(ParseError::RootNotMapping),
    };

    let mut builder = Builder::default();
    builder.group_mut(ALL_GROUP);

    for (key, node) in root {
        let name = key_name(&key).ok_or(ParseError::RootNotMapping)?;
        builder.walk(&name, node)?;
        if name != ALL_GROUP {
            builder.group_mut(ALL_GROUP).children.insert(name);
        }
    }

    let model = InventoryModel::resolve(builder.hosts, builder.groups)?;
    tracing::debug!(
        hosts = model.host_count(),
        groups = model.group_count(),
        "Parsed inventory"
    );
    Ok(model)
}

#[derive(Default)]
struct Builder {
    hosts: BTreeMap<String, Host>,
    groups: BTreeMap<String, Group>,
}

impl Builder {
    fn group_mut(&mut self, name: &str) -> &mut Group {
        self.groups
            .entry(name.to_string())
            .or_insert_with(|| Group::new(name))
    }

    fn walk(&mut self, name: &str, node: Value) -> Result<(), ParseError> {
        self.group_mut(name);

        let node = match untag(node) {
            Value::Null => return Ok(()),
            Value::Mapping(m) => m,
            other => {
                return Err(ParseError::group(
                    name,
                    format!("expected a mapping, found {}", kind(&other)),
                ))
            }
        };

        for (key, value) in node {
            match key.as_str() {
                Some("hosts") => self.hosts_block(name, value)?,
                Some("vars") => {
                    let vars = to_vars(value)
                        .map_err(|reason| ParseError::group(name, format!("vars: {}", reason)))?;
                    self.group_mut(name).vars.extend(vars);
                }
                Some("children") => self.children_block(name, value)?,
                Some(other) => {
                    return Err(ParseError::group(
                        name,
                        format!("unexpected key '{}'", other),
                    ))
                }
                None => return Err(ParseError::group(name, "group keys must be strings")),
            }
        }
        Ok(())
    }

    fn hosts_block(&mut self, group: &str, value: Value) -> Result<(), ParseError> {
        let hosts = match untag(value) {
            Value::Null => return Ok(()),
            Value::Mapping(m) => m,
            other => {
                return Err(ParseError::group(
                    group,
                    format!("hosts must be a mapping, found {}", kind(&other)),
                ))
            }
        };

        for (key, vars) in hosts {
            let host = key_name(&key)
                .ok_or_else(|| ParseError::group(group, "host names must be scalars"))?;
            let vars = to_vars(vars).map_err(|reason| ParseError::host(group, &host, reason))?;

            self.hosts
                .entry(host.clone())
                .or_insert_with(|| Host::new(host.clone()))
                .vars
                .extend(vars);
            self.group_mut(group).hosts.insert(host);
        }
        Ok(())
    }

    fn children_block(&mut self, group: &str, value: Value) -> Result<(), ParseError> {
        let children = match untag(value) {
            Value::Null => return Ok(()),
            Value::Mapping(m) => m,
            other => {
                return Err(ParseError::group(
                    group,
                    format!("children must be a mapping, found {}", kind(&other)),
                ))
            }
        };

        for (key, node) in children {
            let child = key_name(&key)
                .ok_or_else(|| ParseError::group(group, "child group names must be scalars"))?;
            self.group_mut(group).children.insert(child.clone());
            self.walk(&child, node)?;
        }
        Ok(())
    }
}

fn to_vars(value: Value) -> Result<Vars, String> {
    match untag(value) {
        Value::Null => Ok(Vars::new()),
        Value::Mapping(m) => m
            .into_iter()
            .map(|(k, v)| -> Result<(String, VarValue), String> {
                let key = key_name(&k).ok_or("variable names must be scalars")?;
                Ok((key, to_var(v)?))
            })
            .collect(),
        other => Err(format!("expected a mapping, found {}", kind(&other))),
    }
}

fn to_var(value: Value) -> Result<VarValue, String> {
    Ok(match untag(value) {
        Value::Null => VarValue::Null,
        Value::Bool(b) => VarValue::Bool(b),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => VarValue::Integer(i),
            (None, Some(u)) => VarValue::Unsigned(u),
            (None, None) => VarValue::Float(n.as_f64().ok_or("unrepresentable number")?),
        },
        Value::String(s) => VarValue::String(s),
        Value::Sequence(items) => {
            VarValue::List(items.into_iter().map(to_var).collect::<Result<_, _>>()?)
        }
        Value::Mapping(m) => VarValue::Map(
            m.into_iter()
                .map(|(k, v)| -> Result<(String, VarValue), String> {
                    let key = key_name(&k).ok_or("variable names must be scalars")?;
                    Ok((key, to_var(v)?))
                })
                .collect::<Result<_, String>>()?,
        ),
        Value::Tagged(tagged) => to_var(tagged.value)?,
    })
}

/// Drop YAML tags; the inventory format has no use for them.
fn untag(value: Value) -> Value {
    match value {
        Value::Tagged(tagged) => untag(tagged.value),
        other => other,
    }
}

fn key_name(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_keys_become_host_names() {
        let model = parse("all:\n  hosts:\n    10: {}\n    true:\n").expect("parse");
        assert!(model.host("10").is_some());
        assert!(model.host("true").is_some());
    }

    #[test]
    fn keeps_variable_kinds() {
        let model = parse(
            "all:\n  hosts:\n    h:\n      port: 22\n      ratio: 0.5\n      on: true\n      tags: [a, b]\n      empty:\n",
        )
        .expect("parse");
        let vars = &model.host("h").expect("host").vars;
        assert_eq!(vars["port"], VarValue::Integer(22));
        assert_eq!(vars["ratio"], VarValue::Float(0.5));
        assert_eq!(vars["on"], VarValue::Bool(true));
        assert_eq!(
            vars["tags"],
            VarValue::List(vec![
                VarValue::String("a".into()),
                VarValue::String("b".into())
            ])
        );
        assert_eq!(vars["empty"], VarValue::Null);
    }

    #[test]
    fn keeps_integers_beyond_i64() {
        let model = parse("all:\n  hosts:\n    h:\n      big: 18446744073709551615\n      low: -3\n")
            .expect("parse");
        let vars = &model.host("h").expect("host").vars;
        assert_eq!(vars["big"], VarValue::Unsigned(u64::MAX));
        assert_eq!(vars["low"], VarValue::Integer(-3));
    }

    #[test]
    fn rejects_sequence_root() {
        assert_eq!(parse("- a\n- b\n").unwrap_err(), ParseError::RootNotMapping);
    }
}
