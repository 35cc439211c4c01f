// ABOUTME: Defines MasterRecord, the baseline stored fields for one order, and its OrderStatus.
// ABOUTME: Field-level merging of change sets onto a record lives here so writer and replay share it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::action::Changes;

/// Status of an order. Only `Pending` is lifted by a CONFIRM action; any other
/// value set through an UPDATE is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Other(String),
}

impl OrderStatus {
    /// Parse a stored or user-supplied status string. The seed dataset spells
    /// the default state "Pending Confirmation", which is treated as `Pending`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("pending")
            || trimmed.eq_ignore_ascii_case("pending confirmation")
        {
            OrderStatus::Pending
        } else if trimmed.eq_ignore_ascii_case("confirmed") {
            OrderStatus::Confirmed
        } else {
            OrderStatus::Other(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Other(s) => s,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(OrderStatus::parse(&raw))
    }
}

/// The baseline record for a single order, keyed by `order_id`.
/// Fields not known to the schema but introduced by an UPDATE are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterRecord {
    pub order_id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub order_type: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Outcome of merging a single key of a change set onto a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMerge {
    Applied,
    /// The key names an immutable field and was left untouched.
    Immutable,
    /// The key collides with a computed-state field and was dropped.
    Reserved,
}

/// Keys a change set may not carry because computed state already uses them.
pub const RESERVED_FIELDS: [&str; 1] = ["anomalies"];

impl MasterRecord {
    /// Create a pending record with every descriptive field empty.
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            order_type: String::new(),
            status: OrderStatus::Pending,
            extra: BTreeMap::new(),
        }
    }

    /// How a change to `field` would merge, without touching any record.
    pub fn classify_field(field: &str) -> FieldMerge {
        if field == "order_id" {
            FieldMerge::Immutable
        } else if RESERVED_FIELDS.contains(&field) {
            FieldMerge::Reserved
        } else {
            FieldMerge::Applied
        }
    }

    /// Set a single field by name. `order_id` is immutable and reserved keys
    /// are dropped.
    pub fn set_field(&mut self, field: &str, value: &str) -> FieldMerge {
        let merge = Self::classify_field(field);
        if merge != FieldMerge::Applied {
            return merge;
        }
        match field {
            "full_name" => self.full_name = value.to_string(),
            "email" => self.email = value.to_string(),
            "phone" => self.phone = value.to_string(),
            "address" => self.address = value.to_string(),
            "order_type" => self.order_type = value.to_string(),
            "status" => self.status = OrderStatus::parse(value),
            other => {
                self.extra.insert(other.to_string(), value.to_string());
            }
        }
        FieldMerge::Applied
    }

    /// Read a field by name, including extra fields.
    pub fn field(&self, field: &str) -> Option<&str> {
        match field {
            "order_id" => Some(&self.order_id),
            "full_name" => Some(&self.full_name),
            "email" => Some(&self.email),
            "phone" => Some(&self.phone),
            "address" => Some(&self.address),
            "order_type" => Some(&self.order_type),
            "status" => Some(self.status.as_str()),
            other => self.extra.get(other).map(String::as_str),
        }
    }

    /// Names of the fields whose values differ between two records, extra
    /// fields included, in a stable order.
    pub fn differing_fields(&self, other: &MasterRecord) -> Vec<String> {
        const KNOWN: [&str; 7] = [
            "order_id",
            "full_name",
            "email",
            "phone",
            "address",
            "order_type",
            "status",
        ];

        let mut fields: Vec<String> = KNOWN
            .iter()
            .filter(|f| self.field(f) != other.field(f))
            .map(|f| f.to_string())
            .collect();

        let extra_keys: std::collections::BTreeSet<&String> =
            self.extra.keys().chain(other.extra.keys()).collect();
        for key in extra_keys {
            if self.extra.get(key) != other.extra.get(key) {
                fields.push(key.clone());
            }
        }
        fields
    }

    /// Merge a change set field by field. Later keys overwrite, unspecified
    /// fields are untouched. Returns each refused key with the reason.
    pub fn apply_changes(&mut self, changes: &Changes) -> Vec<(String, FieldMerge)> {
        let mut refused = Vec::new();
        for (field, value) in changes.iter() {
            let merge = self.set_field(field, value);
            if merge != FieldMerge::Applied {
                refused.push((field.clone(), merge));
            }
        }
        refused
    }
}
