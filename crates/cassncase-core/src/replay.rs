// ABOUTME: Folds an order's log entries onto its master record to compute the current state.
// ABOUTME: Pure and uncached; malformed entries are skipped and reported as anomalies.

use serde::Serialize;
use ulid::Ulid;

use crate::action::{ActionType, LogEntry};
use crate::order::{FieldMerge, MasterRecord, OrderStatus};

/// A log entry that replay could not fully apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayAnomaly {
    /// The entry's change set is not a JSON object of strings.
    MalformedPayload { log_id: Ulid, reason: String },
    /// The entry tried to change an immutable field, which was left as is.
    ImmutableField { log_id: Ulid, field: String },
    /// The entry tried to set a key reserved for computed state; the key was dropped.
    ReservedField { log_id: Ulid, field: String },
    /// The entry belongs to a different order and was ignored.
    ForeignEntry { log_id: Ulid, order_id: String },
    /// The stored row's id, action type, timestamp, or source could not be
    /// decoded, so the entry was left out entirely.
    UndecodableEntry {
        log_id: String,
        order_id: String,
        reason: String,
    },
}

/// The ephemeral, non-persisted result of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputedState {
    #[serde(flatten)]
    pub record: MasterRecord,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<ReplayAnomaly>,
}

impl ComputedState {
    pub fn order_id(&self) -> &str {
        &self.record.order_id
    }

    pub fn status(&self) -> &OrderStatus {
        &self.record.status
    }
}

/// Fold the UPDATE entries onto a copy of `master` in timestamp order (stable on
/// ties, so callers pass entries in insertion order). No CONFIRM handling.
pub fn fold_updates(
    master: &MasterRecord,
    entries: &[LogEntry],
) -> (MasterRecord, Vec<ReplayAnomaly>) {
    let mut record = master.clone();
    let mut anomalies = Vec::new();

    let mut updates: Vec<&LogEntry> = entries
        .iter()
        .filter(|entry| {
            if entry.order_id != master.order_id {
                anomalies.push(ReplayAnomaly::ForeignEntry {
                    log_id: entry.log_id,
                    order_id: entry.order_id.clone(),
                });
                return false;
            }
            entry.action_type == ActionType::Update
        })
        .collect();
    updates.sort_by_key(|entry| entry.timestamp);

    for entry in updates {
        let changes = match entry.changes() {
            Ok(changes) => changes,
            Err(e) => {
                tracing::warn!(
                    "skipping malformed log payload {} for order {}: {}",
                    entry.log_id,
                    entry.order_id,
                    e
                );
                anomalies.push(ReplayAnomaly::MalformedPayload {
                    log_id: entry.log_id,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        for (field, merge) in record.apply_changes(&changes) {
            tracing::warn!(
                "log entry {} tried to set {:?} field {} on order {}",
                entry.log_id,
                merge,
                field,
                entry.order_id
            );
            let log_id = entry.log_id;
            anomalies.push(match merge {
                FieldMerge::Reserved => ReplayAnomaly::ReservedField { log_id, field },
                _ => ReplayAnomaly::ImmutableField { log_id, field },
            });
        }
    }

    (record, anomalies)
}

/// Compute the current state of an order from its master record and its log.
///
/// UPDATE change sets are merged field by field in timestamp order, later
/// entries winning. If any CONFIRM exists and the folded status is still
/// pending, the status becomes confirmed; any other status is left alone.
pub fn replay(master: &MasterRecord, entries: &[LogEntry]) -> ComputedState {
    let (mut record, anomalies) = fold_updates(master, entries);

    let confirmed = entries
        .iter()
        .any(|e| e.order_id == master.order_id && e.action_type == ActionType::Confirm);
    if confirmed && record.status.is_pending() {
        record.status = OrderStatus::Confirmed;
    }

    ComputedState { record, anomalies }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionSource, Changes};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn master() -> MasterRecord {
        let mut record = MasterRecord::new("A1");
        record.full_name = "Alyssa Mae Cruz".to_string();
        record.address = "X".to_string();
        record.phone = "09171234567".to_string();
        record
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn update(pairs: &[(&str, &str)], ts: DateTime<Utc>) -> LogEntry {
        let changes: Changes = pairs.iter().copied().collect();
        LogEntry::new("A1", ActionType::Update, &changes, ActionSource::Buyer, ts).unwrap()
    }

    fn confirm(ts: DateTime<Utc>) -> LogEntry {
        LogEntry::new("A1", ActionType::Confirm, &Changes::new(), ActionSource::Buyer, ts).unwrap()
    }

    #[test]
    fn no_entries_yields_master_unchanged() {
        let state = replay(&master(), &[]);
        assert_eq!(state.record, master());
        assert!(state.anomalies.is_empty());
    }

    #[test]
    fn update_then_confirm_scenario() {
        let entries = vec![update(&[("address", "Y")], at(1)), confirm(at(2))];
        let state = replay(&master(), &entries);

        assert_eq!(state.record.order_id, "A1");
        assert_eq!(state.record.status, OrderStatus::Confirmed);
        assert_eq!(state.record.address, "Y");
        assert_eq!(state.record.full_name, "Alyssa Mae Cruz");
    }

    #[test]
    fn replay_equals_left_fold_in_timestamp_order() {
        let e1 = update(&[("address", "Y"), ("phone", "0999")], at(1));
        let e2 = update(&[("address", "Z")], at(2));
        let e3 = update(&[("full_name", "Aly Cruz")], at(3));

        // Stored out of order; replay must sort by timestamp.
        let state = replay(&master(), &[e3.clone(), e1.clone(), e2.clone()]);

        let mut expected = master();
        for e in [&e1, &e2, &e3] {
            expected.apply_changes(&e.changes().unwrap());
        }
        assert_eq!(state.record, expected);
        assert_eq!(state.record.address, "Z");
        assert_eq!(state.record.phone, "0999");
    }

    #[test]
    fn disjoint_updates_commute() {
        let a = |ts| update(&[("address", "Y")], ts);
        let b = |ts| update(&[("phone", "0999")], ts);

        let first = replay(&master(), &[a(at(1)), b(at(2))]);
        let second = replay(&master(), &[b(at(1)), a(at(2))]);

        assert_eq!(first.record, second.record);
    }

    #[test]
    fn overlapping_updates_do_not_commute() {
        let a = |ts| update(&[("address", "Y")], ts);
        let b = |ts| update(&[("address", "Z")], ts);

        let a_last = replay(&master(), &[b(at(1)), a(at(2))]);
        let b_last = replay(&master(), &[a(at(1)), b(at(2))]);

        assert_eq!(a_last.record.address, "Y");
        assert_eq!(b_last.record.address, "Z");
        assert_ne!(a_last.record, b_last.record);
    }

    #[test]
    fn timestamp_ties_keep_insertion_order() {
        let entries = vec![
            update(&[("address", "first")], at(5)),
            update(&[("address", "second")], at(5)),
        ];
        let state = replay(&master(), &entries);
        assert_eq!(state.record.address, "second");
    }

    #[test]
    fn confirm_is_idempotent() {
        let once = replay(&master(), &[confirm(at(1))]);
        let thrice = replay(&master(), &[confirm(at(1)), confirm(at(2)), confirm(at(3))]);

        assert_eq!(once, thrice);
        assert_eq!(once.record.status, OrderStatus::Confirmed);
    }

    #[test]
    fn confirm_never_downgrades_non_pending_status() {
        let entries = vec![update(&[("status", "Cancelled")], at(1)), confirm(at(2))];
        let state = replay(&master(), &entries);
        assert_eq!(state.record.status, OrderStatus::Other("Cancelled".to_string()));

        let mut already = master();
        already.status = OrderStatus::Other("Shipped".to_string());
        let state = replay(&already, &[confirm(at(1))]);
        assert_eq!(state.record.status, OrderStatus::Other("Shipped".to_string()));
    }

    #[test]
    fn confirm_before_update_still_applies() {
        let entries = vec![confirm(at(1)), update(&[("address", "Y")], at(2))];
        let state = replay(&master(), &entries);
        assert_eq!(state.record.status, OrderStatus::Confirmed);
        assert_eq!(state.record.address, "Y");
    }

    #[test]
    fn malformed_payload_is_skipped_not_fatal() {
        let mut bad = update(&[("address", "never")], at(1));
        bad.changes_json = "[1, 2".to_string();
        let good = update(&[("phone", "0999")], at(2));

        let state = replay(&master(), &[bad.clone(), good]);

        assert_eq!(state.record.address, "X");
        assert_eq!(state.record.phone, "0999");
        assert_eq!(state.anomalies.len(), 1);
        assert!(matches!(
            &state.anomalies[0],
            ReplayAnomaly::MalformedPayload { log_id, .. } if *log_id == bad.log_id
        ));
    }

    #[test]
    fn order_id_change_is_ignored_with_anomaly() {
        let state = replay(&master(), &[update(&[("order_id", "B2"), ("address", "Y")], at(1))]);
        assert_eq!(state.record.order_id, "A1");
        assert_eq!(state.record.address, "Y");
        assert!(matches!(
            &state.anomalies[0],
            ReplayAnomaly::ImmutableField { field, .. } if field == "order_id"
        ));
    }

    #[test]
    fn reserved_key_never_collides_with_anomalies() {
        let bad = LogEntry {
            changes_json: "{broken".to_string(),
            ..update(&[], at(1))
        };
        let reserved = update(&[("anomalies", "none"), ("address", "Y")], at(2));

        let state = replay(&master(), &[bad, reserved]);

        assert!(!state.record.extra.contains_key("anomalies"));
        assert_eq!(state.record.address, "Y");
        assert!(state.anomalies.iter().any(|a| matches!(
            a,
            ReplayAnomaly::ReservedField { field, .. } if field == "anomalies"
        )));

        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json.matches("\"anomalies\"").count(), 1);
    }

    #[test]
    fn entries_for_other_orders_are_ignored() {
        let foreign = LogEntry::new(
            "B2",
            ActionType::Confirm,
            &Changes::new(),
            ActionSource::Admin,
            at(1),
        )
        .unwrap();

        let state = replay(&master(), &[foreign]);
        assert_eq!(state.record.status, OrderStatus::Pending);
        assert_eq!(state.anomalies.len(), 1);
    }

    #[test]
    fn computed_state_serializes_flat() {
        let state = replay(&master(), &[]);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["order_id"], "A1");
        assert_eq!(json["address"], "X");
        assert!(json.get("anomalies").is_none());
    }
}
