// ABOUTME: Appends action log entries and mirrors UPDATE changes onto the master record.
// ABOUTME: Both writes share one transaction; observers are notified only after commit.

use std::sync::Arc;

use cassncase_core::{ActionSource, ActionType, Changes, FieldMerge, LogEntry, MasterRecord};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use thiserror::Error;

use crate::notify::{ChangeKind, ChangeNotifier};
use crate::sqlite::{self, OrderStore, StoreError};

/// Errors that can occur when recording an action.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("field {0} cannot be changed")]
    ImmutableField(String),

    #[error("field {0} is reserved")]
    ReservedField(String),

    #[error("a CONFIRM action cannot carry changes")]
    ConfirmWithChanges,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The only component that mutates master records after creation. The patch
/// it applies is a mirror of the log for fast reads; the log stays authoritative.
#[derive(Clone)]
pub struct LogWriter {
    store: Arc<OrderStore>,
    notifier: ChangeNotifier,
}

impl LogWriter {
    pub fn new(store: Arc<OrderStore>, notifier: ChangeNotifier) -> Self {
        Self { store, notifier }
    }

    /// Record an action against an order.
    ///
    /// The entry is appended and, for a non-empty UPDATE, the change set is
    /// merged onto the master record in the same transaction. Writes to the
    /// same order serialize on the store's transaction, and the timestamp is
    /// taken inside it, so timestamp order matches commit order.
    pub async fn record(
        &self,
        order_id: &str,
        action_type: ActionType,
        changes: Changes,
        source: ActionSource,
    ) -> Result<LogEntry, WriteError> {
        if action_type == ActionType::Confirm && !changes.is_empty() {
            return Err(WriteError::ConfirmWithChanges);
        }
        for (field, _) in changes.iter() {
            match MasterRecord::classify_field(field) {
                FieldMerge::Applied => {}
                FieldMerge::Immutable => return Err(WriteError::ImmutableField(field.to_string())),
                FieldMerge::Reserved => return Err(WriteError::ReservedField(field.to_string())),
            }
        }

        let entry = self
            .store
            .transaction(|tx| {
                let mut master = sqlite::get_order(tx, order_id)?
                    .ok_or_else(|| WriteError::OrderNotFound(order_id.to_string()))?;

                let timestamp = next_timestamp(sqlite::latest_timestamp(tx, order_id)?, Utc::now());
                let entry = LogEntry::new(order_id, action_type, &changes, source, timestamp)
                    .map_err(StoreError::from)?;
                sqlite::insert_log(tx, &entry)?;

                if action_type == ActionType::Update && !changes.is_empty() {
                    master.apply_changes(&changes);
                    sqlite::put_order(tx, &master)?;
                }

                Ok::<_, WriteError>(entry)
            })
            .await?;

        tracing::debug!(
            "recorded {} {} for order {} from {}",
            entry.action_type,
            entry.log_id,
            entry.order_id,
            entry.source.as_str()
        );
        self.notifier.publish(ChangeKind::DataChanged);

        Ok(entry)
    }

    pub async fn confirm(&self, order_id: &str, source: ActionSource) -> Result<LogEntry, WriteError> {
        self.record(order_id, ActionType::Confirm, Changes::new(), source)
            .await
    }

    pub async fn update(
        &self,
        order_id: &str,
        changes: Changes,
        source: ActionSource,
    ) -> Result<LogEntry, WriteError> {
        self.record(order_id, ActionType::Update, changes, source)
            .await
    }
}

/// Timestamps are stored at microsecond precision and must strictly increase
/// per order.
fn next_timestamp(latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    match latest {
        Some(latest) if now <= latest => latest + Duration::microseconds(1),
        _ => now,
    }
}
