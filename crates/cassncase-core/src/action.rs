// ABOUTME: Defines the append-only LogEntry and its action type, source, and change-set payload.
// ABOUTME: Log entries are immutable facts; their changes are stored as JSON text and parsed on replay.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

/// The kinds of action a log entry can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Confirm,
    Update,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Confirm => "CONFIRM",
            ActionType::Update => "UPDATE",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored string that names no known variant.
#[derive(Debug, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for ActionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRM" => Ok(ActionType::Confirm),
            "UPDATE" => Ok(ActionType::Update),
            other => Err(UnknownVariant {
                kind: "action type",
                value: other.to_string(),
            }),
        }
    }
}

/// Who originated an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionSource {
    #[default]
    Buyer,
    Admin,
}

impl ActionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionSource::Buyer => "buyer",
            ActionSource::Admin => "admin",
        }
    }
}

impl FromStr for ActionSource {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(ActionSource::Buyer),
            "admin" => Ok(ActionSource::Admin),
            other => Err(UnknownVariant {
                kind: "action source",
                value: other.to_string(),
            }),
        }
    }
}

/// A set of field-name to new-value assignments carried by an UPDATE.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Changes(BTreeMap<String, String>);

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Changes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One recorded action against an order. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub log_id: Ulid,
    pub order_id: String,
    pub action_type: ActionType,
    pub timestamp: DateTime<Utc>,
    /// JSON object text of the change set. `{}` for CONFIRM.
    pub changes_json: String,
    pub source: ActionSource,
}

impl LogEntry {
    /// Build an entry with a fresh log id, encoding the change set as JSON.
    pub fn new(
        order_id: impl Into<String>,
        action_type: ActionType,
        changes: &Changes,
        source: ActionSource,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            log_id: Ulid::new(),
            order_id: order_id.into(),
            action_type,
            timestamp,
            changes_json: serde_json::to_string(changes)?,
            source,
        })
    }

    /// Parse the stored change set.
    pub fn changes(&self) -> Result<Changes, serde_json::Error> {
        serde_json::from_str(&self.changes_json)
    }
}
