// ABOUTME: Checks that mirrored master records still agree with a fresh fold of their UPDATE log.
// ABOUTME: Divergences are reported, never repaired; the log remains the source of truth.

use std::collections::HashMap;

use cassncase_core::{LogEntry, ReplayAnomaly, fold_updates};
use serde::Serialize;
use ulid::Ulid;

use crate::sqlite::{self, OrderStore, StoreError};

/// One order whose stored record no longer matches its log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorDivergence {
    pub order_id: String,
    pub fields: Vec<String>,
}

/// Result of auditing every order in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub orders_checked: usize,
    pub divergences: Vec<MirrorDivergence>,
    /// Log entries whose order has no master record.
    pub orphan_entries: Vec<Ulid>,
    /// Raw ids of log rows that could not be decoded and so never replay.
    pub undecodable_entries: Vec<String>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.divergences.is_empty()
            && self.orphan_entries.is_empty()
            && self.undecodable_entries.is_empty()
    }
}

/// Fold each order's UPDATE entries onto its stored record and report every
/// order where the result differs from what is stored.
pub async fn audit_mirror(store: &OrderStore) -> Result<AuditReport, StoreError> {
    let (orders, scan) = store
        .read(|conn| Ok((sqlite::all_orders(conn)?, sqlite::scan_all_logs(conn)?)))
        .await?;

    let mut by_order: HashMap<String, Vec<LogEntry>> = HashMap::new();
    for entry in scan.entries {
        by_order.entry(entry.order_id.clone()).or_default().push(entry);
    }

    let mut report = AuditReport {
        orders_checked: orders.len(),
        undecodable_entries: scan
            .undecodable
            .into_iter()
            .filter_map(|anomaly| match anomaly {
                ReplayAnomaly::UndecodableEntry { log_id, .. } => Some(log_id),
                _ => None,
            })
            .collect(),
        ..Default::default()
    };

    for master in &orders {
        let Some(entries) = by_order.remove(&master.order_id) else {
            continue;
        };
        let (folded, _) = fold_updates(master, &entries);
        let fields = master.differing_fields(&folded);
        if !fields.is_empty() {
            tracing::warn!(
                "order {} diverges from its log on {}",
                master.order_id,
                fields.join(", ")
            );
            report.divergences.push(MirrorDivergence {
                order_id: master.order_id.clone(),
                fields,
            });
        }
    }

    for (order_id, entries) in by_order {
        tracing::warn!("{} log entries reference missing order {}", entries.len(), order_id);
        report
            .orphan_entries
            .extend(entries.into_iter().map(|e| e.log_id));
    }
    report.orphan_entries.sort();

    Ok(report)
}
