// ABOUTME: Loosely-typed input row for bulk import and seeding of master records.
// ABOUTME: Accepts both the stored record shape and the buyer seed shape; rows without a key are invalid.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::{MasterRecord, OrderStatus};

/// A bulk-import row that cannot become a master record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidImportRecord {
    #[error("import record has no order_id")]
    MissingKey,

    #[error("import row is not a buyer record: {0}")]
    Malformed(String),
}

/// One row of a bulk import. Every field is optional so that a single bad
/// row can be skipped instead of failing the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(default, alias = "id")]
    pub order_id: Option<String>,
    #[serde(default, alias = "fullName")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "shippingAddress", skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<String>,
    #[serde(default, alias = "orderType")]
    pub order_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ImportRecord {
    /// Decode one raw JSON row. Wrongly typed fields, duplicate keys, and
    /// non-object rows are `Malformed`.
    pub fn from_value(value: serde_json::Value) -> Result<Self, InvalidImportRecord> {
        serde_json::from_value(value).map_err(|e| InvalidImportRecord::Malformed(e.to_string()))
    }

    /// Decode a batch of raw rows, skipping and logging each row that cannot be decoded.
    pub fn decode_rows(rows: Vec<serde_json::Value>) -> Vec<Self> {
        rows.into_iter()
            .enumerate()
            .filter_map(|(index, value)| match Self::from_value(value) {
                Ok(row) => Some(row),
                Err(e) => {
                    tracing::warn!("skipping import row {}: {}", index, e);
                    None
                }
            })
            .collect()
    }

    /// Convert to a master record. The shipping address wins over the plain
    /// address when both are present; a missing status means pending.
    pub fn into_master(self) -> Result<MasterRecord, InvalidImportRecord> {
        let order_id = self
            .order_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(InvalidImportRecord::MissingKey)?;

        let mut record = MasterRecord::new(order_id);
        record.full_name = self.full_name.unwrap_or_default();
        record.email = self.email.unwrap_or_default();
        record.phone = self.phone.unwrap_or_default();
        record.address = self.shipping_address.or(self.address).unwrap_or_default();
        record.order_type = self.order_type.unwrap_or_default();
        record.status = self
            .status
            .as_deref()
            .map(OrderStatus::parse)
            .unwrap_or_default();
        Ok(record)
    }
}
