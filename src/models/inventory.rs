use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the implicit group every host belongs to.
pub const ALL_GROUP: &str = "all";

/// A host or group variable.
///
/// Inventory variables are loosely typed in the source format; keeping the
/// scalar kind around (instead of stringifying everything) lets an exported
/// inventory re-parse to exactly the same values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Null,
    Bool(bool),
    Integer(i64),
    /// Integers above `i64::MAX`.
    Unsigned(u64),
    Float(f64),
    String(String),
    List(Vec<VarValue>),
    Map(BTreeMap<String, VarValue>),
}

/// Variable mapping attached to a host or group.
pub type Vars = BTreeMap<String, VarValue>;

/// A single automation target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    /// Connection parameters and custom variables declared on the host itself.
    pub vars: Vars,
}

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: Vars::new(),
        }
    }
}

/// A named set of hosts with shared variables and nested child groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Hosts declared directly under this group's `hosts` block.
    pub hosts: BTreeSet<String>,
    pub vars: Vars,
    /// Groups declared under this group's `children` block.
    pub children: BTreeSet<String>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hosts: BTreeSet::new(),
            vars: Vars::new(),
            children: BTreeSet::new(),
        }
    }
}

/// The parsed inventory.
///
/// `members` and `depth` are derived from `groups` when the model is built
/// and are never edited independently.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryModel {
    pub(crate) hosts: BTreeMap<String, Host>,
    pub(crate) groups: BTreeMap<String, Group>,
    /// Group name -> resolved host set after flattening children.
    pub(crate) members: BTreeMap<String, BTreeSet<String>>,
    /// Group name -> longest distance from `all`.
    #[serde(skip)]
    pub(crate) depth: BTreeMap<String, usize>,
}

impl InventoryModel {
    pub fn hosts(&self) -> &BTreeMap<String, Host> {
        &self.hosts
    }

    pub fn groups(&self) -> &BTreeMap<String, Group> {
        &self.groups
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Resolved hosts of a group, including hosts reached through children.
    ///
    /// `None` means the group does not exist; an existing group with no
    /// hosts yields `Some` of an empty set.
    pub fn hosts_of(&self, group: &str) -> Option<&BTreeSet<String>> {
        self.members.get(group)
    }

    /// Every group, direct or transitive, that contains `host`.
    pub fn groups_of(&self, host: &str) -> Option<BTreeSet<String>> {
        if !self.hosts.contains_key(host) {
            return None;
        }
        Some(
            self.members
                .iter()
                .filter(|(_, hosts)| hosts.contains(host))
                .map(|(group, _)| group.clone())
                .collect(),
        )
    }

    /// Listing view of every group.
    pub fn group_summaries(&self) -> Vec<GroupSummary> {
        self.groups
            .values()
            .map(|g| GroupSummary {
                name: g.name.clone(),
                host_count: self.members.get(&g.name).map_or(0, BTreeSet::len),
                var_count: g.vars.len(),
                child_count: g.children.len(),
            })
            .collect()
    }

    /// Effective variables for a host.
    ///
    /// Group vars are applied shallowest group first (ties broken by name),
    /// then the host's own vars; later assignments win.
    pub fn host_vars(&self, host: &str) -> Option<Vars> {
        let record = self.hosts.get(host)?;
        let mut groups: Vec<&String> = self
            .members
            .iter()
            .filter(|(_, hosts)| hosts.contains(host))
            .map(|(group, _)| group)
            .collect();
        groups.sort_by_key(|g| (self.depth.get(*g).copied().unwrap_or(0), *g));

        let mut vars = Vars::new();
        for group in groups {
            if let Some(g) = self.groups.get(group) {
                vars.extend(g.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        vars.extend(record.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(vars)
    }

    /// True if `name` is either a host or a group in this inventory.
    pub fn knows(&self, name: &str) -> bool {
        self.hosts.contains_key(name) || self.groups.contains_key(name)
    }
}

/// Per-group counts for status listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    /// Resolved (flattened) host count.
    pub host_count: usize,
    pub var_count: usize,
    pub child_count: usize,
}

/// One successful inventory load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLoad {
    /// File path or `inline`.
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub host_count: usize,
    pub group_count: usize,
}
