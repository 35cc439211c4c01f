// ABOUTME: Persistence layer for cassncase: the order and log tables and the components built on them.
// ABOUTME: Provides the SQLite store, log writer, state replayer, query resolver, notices, and audit.

pub mod audit;
pub mod ledger;
pub mod notify;
pub mod replayer;
pub mod resolver;
pub mod seed;
pub mod sqlite;
pub mod writer;

pub use audit::{AuditReport, MirrorDivergence, audit_mirror};
pub use ledger::OrderLedger;
pub use notify::{ChangeKind, ChangeNotice, ChangeNotifier};
pub use replayer::StateReplayer;
pub use resolver::QueryResolver;
pub use seed::{BuiltinSeed, JsonSeedFile, NoSeed, SeedError, SeedSource};
pub use sqlite::{OrderStore, SCHEMA_VERSION, StoreError};
pub use writer::{LogWriter, WriteError};
