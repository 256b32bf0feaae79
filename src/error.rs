//! Error types for the inventory, state store and playbook layers.

use thiserror::Error;

/// Structural problems found while parsing an inventory document.
///
/// Every variant names the group (and host, where relevant) that caused it.
/// A failed parse never touches the inventory already held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid inventory YAML: {0}")]
    Yaml(String),

    #[error("inventory root must be a mapping of group names")]
    RootNotMapping,

    #[error("malformed group '{group}': {reason}")]
    MalformedGroup { group: String, reason: String },

    #[error("malformed host '{host}' in group '{group}': {reason}")]
    MalformedHost {
        group: String,
        host: String,
        reason: String,
    },

    #[error("group cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

impl ParseError {
    pub(crate) fn group(group: &str, reason: impl Into<String>) -> Self {
        Self::MalformedGroup {
            group: group.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn host(group: &str, host: &str, reason: impl Into<String>) -> Self {
        Self::MalformedHost {
            group: group.to_string(),
            host: host.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by state store and inventory queries.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("no inventory loaded")]
    InventoryAbsent,

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("host not found: {0}")]
    HostNotFound(String),
}

impl Error {
    /// True for the missing-key family (sessions, keys, hosts, groups).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_)
                | Self::KeyNotFound(_)
                | Self::GroupNotFound(_)
                | Self::HostNotFound(_)
        )
    }
}

/// Errors raised when reading a synthesized playbook back from YAML.
#[derive(Debug, Error)]
pub enum PlaybookError {
    #[error("invalid playbook YAML: {0}")]
    Yaml(String),

    #[error("malformed playbook: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
