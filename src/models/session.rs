use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A caller-scoped bucket of activity history and key/value data.
///
/// Sessions are created on first reference to a token and live until the
/// caller deletes them. Clearing a session empties its activities and data
/// but keeps the label and creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque token supplied by the caller.
    pub token: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Number of mutating calls made against this session.
    pub request_count: u64,
    pub activities: Vec<Activity>,
    pub data: BTreeMap<String, serde_json::Value>,
    /// Next activity sequence number. Survives clears.
    #[serde(skip)]
    pub(crate) next_seq: u64,
}

impl Session {
    pub(crate) fn new(token: impl Into<String>, label: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            token: token.into(),
            label: label.into(),
            created_at: now,
            last_activity: now,
            request_count: 0,
            activities: Vec::new(),
            data: BTreeMap::new(),
            next_seq: 1,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Utc::now();
        self.request_count += 1;
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            token: self.token.clone(),
            label: self.label.clone(),
            created_at: self.created_at,
            last_activity: self.last_activity,
            request_count: self.request_count,
            activity_count: self.activities.len(),
            data_keys: self.data.len(),
        }
    }
}

/// An immutable entry in a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Monotonically increasing within its session.
    pub seq: u64,
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

/// Listing view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub token: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub request_count: u64,
    pub activity_count: usize,
    pub data_keys: usize,
}
