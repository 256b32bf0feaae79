use std::collections::{btree_set, BTreeMap, BTreeSet, HashMap};

use crate::error::ParseError;
use crate::models::{Group, Host, InventoryModel};

enum Mark {
    Visiting,
    Done,
}

impl InventoryModel {
    /// Build a model and its flattened membership index.
    ///
    /// Fails with [`ParseError::Cycle`] if the child relation is not acyclic.
    pub(crate) fn resolve(
        hosts: BTreeMap<String, Host>,
        groups: BTreeMap<String, Group>,
    ) -> Result<Self, ParseError> {
        let order = post_order(&groups)?;

        let mut members: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for name in &order {
            let group = &groups[name];
            let mut resolved = group.hosts.clone();
            for child in &group.children {
                if let Some(child_hosts) = members.get(child) {
                    resolved.extend(child_hosts.iter().cloned());
                }
            }
            members.insert(name.clone(), resolved);
        }

        // Reverse post-order visits every parent before its children.
        let mut depth: BTreeMap<String, usize> = BTreeMap::new();
        for name in order.iter().rev() {
            let level = *depth.entry(name.clone()).or_insert(0);
            for child in &groups[name].children {
                let entry = depth.entry(child.clone()).or_insert(0);
                *entry = (*entry).max(level + 1);
            }
        }

        Ok(Self {
            hosts,
            groups,
            members,
            depth,
        })
    }
}

/// Iterative depth-first post-order over the child relation.
///
/// Children always precede their parents in the returned order.
fn post_order(groups: &BTreeMap<String, Group>) -> Result<Vec<String>, ParseError> {
    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(groups.len());
    let mut order = Vec::with_capacity(groups.len());

    for (root, root_group) in groups {
        if marks.contains_key(root.as_str()) {
            continue;
        }
        marks.insert(root.as_str(), Mark::Visiting);
        let mut stack: Vec<(&str, btree_set::Iter<'_, String>)> =
            vec![(root.as_str(), root_group.children.iter())];

        while let Some(top) = stack.last_mut() {
            let current = top.0;
            match top.1.next() {
                Some(child) => match marks.get(child.as_str()) {
                    Some(Mark::Done) => {}
                    Some(Mark::Visiting) => {
                        let start = stack
                            .iter()
                            .position(|(name, _)| *name == child.as_str())
                            .unwrap_or(0);
                        let mut path: Vec<String> =
                            stack[start..].iter().map(|(name, _)| name.to_string()).collect();
                        path.push(child.clone());
                        return Err(ParseError::Cycle { path });
                    }
                    None => {
                        let Some(group) = groups.get(child.as_str()) else {
                            return Err(ParseError::group(
                                current,
                                format!("unknown child group '{}'", child),
                            ));
                        };
                        marks.insert(child.as_str(), Mark::Visiting);
                        stack.push((child.as_str(), group.children.iter()));
                    }
                },
                None => {
                    marks.insert(current, Mark::Done);
                    order.push(current.to_string());
                    stack.pop();
                }
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, hosts: &[&str], children: &[&str]) -> (String, Group) {
        let mut g = Group::new(name);
        g.hosts = hosts.iter().map(|h| h.to_string()).collect();
        g.children = children.iter().map(|c| c.to_string()).collect();
        (name.to_string(), g)
    }

    fn hosts(names: &[&str]) -> BTreeMap<String, Host> {
        names.iter().map(|n| (n.to_string(), Host::new(*n))).collect()
    }

    #[test]
    fn counts_diamond_members_once() {
        let groups = BTreeMap::from([
            group("all", &[], &["left", "right"]),
            group("left", &[], &["shared"]),
            group("right", &[], &["shared"]),
            group("shared", &["h1"], &[]),
        ]);
        let model = InventoryModel::resolve(hosts(&["h1"]), groups).expect("resolve");

        assert_eq!(model.hosts_of("all").map(BTreeSet::len), Some(1));
        assert_eq!(model.depth["shared"], 2);
    }

    #[test]
    fn reports_cycle_path() {
        let groups = BTreeMap::from([group("a", &[], &["b"]), group("b", &[], &["a"])]);
        let err = InventoryModel::resolve(BTreeMap::new(), groups).unwrap_err();
        assert_eq!(
            err,
            ParseError::Cycle {
                path: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn rejects_dangling_child() {
        let groups = BTreeMap::from([group("a", &[], &["ghost"])]);
        let err = InventoryModel::resolve(BTreeMap::new(), groups).unwrap_err();
        assert!(matches!(err, ParseError::MalformedGroup { group, .. } if group == "a"));
    }
}
