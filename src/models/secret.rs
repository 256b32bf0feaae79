use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a secret came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSource {
    /// An `FTL_SECRET_*` environment variable.
    Environment,
    /// Set by the hosting process while running.
    Runtime,
}

/// Everything about a secret except its value. Safe to hand to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretMetadata {
    /// Lower-cased; lookups are case-insensitive.
    pub name: String,
    pub description: String,
    pub source: SecretSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretStats {
    pub total_secrets: usize,
    pub from_environment: usize,
    pub from_runtime: usize,
    /// Tag -> number of secrets carrying it.
    pub tags: BTreeMap<String, usize>,
}

/// Counts before and after re-reading secrets from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadSummary {
    pub initial_count: usize,
    pub final_count: usize,
    pub reloaded_from_environment: usize,
}
