// ABOUTME: Core library for cassncase, containing order records, log entries, and replay.
// ABOUTME: Everything here is pure; persistence and concurrency live in cassncase-store.

pub mod action;
pub mod import;
pub mod order;
pub mod query;
pub mod replay;

pub use action::{ActionSource, ActionType, Changes, LogEntry, UnknownVariant};
pub use import::{ImportRecord, InvalidImportRecord};
pub use order::{FieldMerge, MasterRecord, OrderStatus, RESERVED_FIELDS};
pub use query::{LookupQuery, normalize_email, normalize_phone};
pub use replay::{ComputedState, ReplayAnomaly, fold_updates, replay};
