use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::models::{ReloadSummary, SecretMetadata, SecretSource, SecretStats};

/// Environment variables with this prefix are loaded as secrets.
pub const SECRET_ENV_PREFIX: &str = "FTL_SECRET_";

struct Secret {
    value: String,
    metadata: SecretMetadata,
}

/// Credentials the execution side may need, such as SSH users or API tokens.
///
/// Values are only readable through [`SecretStore::get`]. Everything that
/// reaches a client goes through [`SecretMetadata`], and nothing here logs a
/// value. Secrets live for the process only.
#[derive(Clone, Default)]
pub struct SecretStore {
    secrets: Arc<Mutex<BTreeMap<String, Secret>>>,
}

impl SecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `FTL_SECRET_*` variable from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Load secrets from `(variable, value)` pairs, keeping only prefixed ones.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let store = Self::new();
        {
            let mut secrets = store.secrets.lock().expect("secrets lock poisoned");
            load_vars(&mut secrets, vars);
        }
        store
    }

    /// Store a secret under `name` (case-insensitive). Replacing a secret
    /// keeps its creation time.
    pub fn set(
        &self,
        name: &str,
        value: impl Into<String>,
        description: impl Into<String>,
        tags: Vec<String>,
    ) -> SecretMetadata {
        let name = normalize(name);
        let now = Utc::now();
        let mut secrets = self.secrets.lock().expect("secrets lock poisoned");
        let created_at = secrets
            .get(&name)
            .map(|s| s.metadata.created_at)
            .unwrap_or(now);
        let metadata = SecretMetadata {
            name: name.clone(),
            description: description.into(),
            source: SecretSource::Runtime,
            created_at,
            updated_at: now,
            tags: if tags.is_empty() {
                vec!["runtime".to_string()]
            } else {
                tags
            },
        };
        tracing::info!(name = %name, "Secret set");
        secrets.insert(
            name,
            Secret {
                value: value.into(),
                metadata: metadata.clone(),
            },
        );
        metadata
    }

    /// The secret value. Not exposed over MCP or REST.
    pub fn get(&self, name: &str) -> Option<String> {
        self.secrets
            .lock()
            .expect("secrets lock poisoned")
            .get(&normalize(name))
            .map(|s| s.value.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.secrets
            .lock()
            .expect("secrets lock poisoned")
            .contains_key(&normalize(name))
    }

    pub fn metadata(&self, name: &str) -> Option<SecretMetadata> {
        self.secrets
            .lock()
            .expect("secrets lock poisoned")
            .get(&normalize(name))
            .map(|s| s.metadata.clone())
    }

    /// Metadata for every secret, by name.
    pub fn list(&self) -> Vec<SecretMetadata> {
        self.secrets
            .lock()
            .expect("secrets lock poisoned")
            .values()
            .map(|s| s.metadata.clone())
            .collect()
    }

    pub fn stats(&self) -> SecretStats {
        let secrets = self.secrets.lock().expect("secrets lock poisoned");
        let mut stats = SecretStats {
            total_secrets: secrets.len(),
            ..SecretStats::default()
        };
        for secret in secrets.values() {
            match secret.metadata.source {
                SecretSource::Environment => stats.from_environment += 1,
                SecretSource::Runtime => stats.from_runtime += 1,
            }
            for tag in &secret.metadata.tags {
                *stats.tags.entry(tag.clone()).or_default() += 1;
            }
        }
        stats
    }

    /// Drop every secret, runtime ones included, and re-read the process
    /// environment.
    pub fn reload(&self) -> ReloadSummary {
        self.reload_from(std::env::vars())
    }

    /// [`SecretStore::reload`] against the given variables.
    pub fn reload_from(&self, vars: impl IntoIterator<Item = (String, String)>) -> ReloadSummary {
        let mut secrets = self.secrets.lock().expect("secrets lock poisoned");
        let initial_count = secrets.len();
        secrets.clear();
        let reloaded = load_vars(&mut secrets, vars);
        tracing::info!(initial_count, reloaded, "Secrets reloaded");
        ReloadSummary {
            initial_count,
            final_count: secrets.len(),
            reloaded_from_environment: reloaded,
        }
    }
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
}

fn load_vars(
    secrets: &mut BTreeMap<String, Secret>,
    vars: impl IntoIterator<Item = (String, String)>,
) -> usize {
    let now = Utc::now();
    let mut loaded = 0;
    for (var, value) in vars {
        let Some(name) = var.strip_prefix(SECRET_ENV_PREFIX) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let name = normalize(name);
        let metadata = SecretMetadata {
            name: name.clone(),
            description: format!("Loaded from environment variable {}", var),
            source: SecretSource::Environment,
            created_at: now,
            updated_at: now,
            tags: vec!["environment".to_string()],
        };
        secrets.insert(name, Secret { value, metadata });
        loaded += 1;
    }
    if loaded > 0 {
        tracing::debug!(loaded, "Secrets loaded from environment");
    }
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn loads_only_prefixed_variables() {
        let store = SecretStore::from_vars(vars(&[
            ("FTL_SECRET_SSH_USER", "deploy"),
            ("FTL_SECRET_", "ignored"),
            ("HOME", "/root"),
        ]));
        assert_eq!(store.get("ssh_user").as_deref(), Some("deploy"));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn names_are_case_insensitive() {
        let store = SecretStore::new();
        store.set("Api_Key", "s3cr3t", "", Vec::new());
        assert!(store.contains("API_KEY"));
        assert_eq!(store.metadata("api_key").map(|m| m.name), Some("api_key".to_string()));
    }
}
