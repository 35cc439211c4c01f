// ABOUTME: SQLite-backed store owning the orders and logs tables and their lookup indexes.
// ABOUTME: Provides atomic transactions, bulk import, destructive reset, and idempotent seeding.

use std::path::Path;
use std::time::Duration;

use cassncase_core::{
    ActionSource, ActionType, ImportRecord, LogEntry, LookupQuery, MasterRecord, OrderStatus,
    ReplayAnomaly, normalize_email, normalize_phone,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use thiserror::Error;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::seed::{SeedError, SeedSource};

/// Bumped whenever the table or index shape changes. A database carrying a
/// different version has both tables dropped and recreated.
pub const SCHEMA_VERSION: i64 = 1;

const ORDER_COLUMNS: &str =
    "order_id, full_name, email, phone, address, order_type, status, extra_json";

const LOG_COLUMNS: &str = "log_id, order_id, action_type, timestamp, changes_json, source";

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable at {path}: {reason}")]
    Unavailable { path: String, reason: String },

    #[error("transaction failed: {0}")]
    Transaction(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("seed error: {0}")]
    Seed(#[from] SeedError),
}

/// The single logical store shared by the writer, replayer, and resolver.
/// All access goes through one connection, so every transaction is isolated
/// from every other.
pub struct OrderStore {
    conn: Mutex<Connection>,
    location: String,
}

impl OrderStore {
    /// Open or create a store at the given path, recreating the tables if the
    /// schema version does not match.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let location = path.display().to_string();
        let unavailable = |e: rusqlite::Error| StoreError::Unavailable {
            path: location.clone(),
            reason: e.to_string(),
        };

        let conn = Connection::open(path).map_err(unavailable)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(unavailable)?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(unavailable)?;
        ensure_schema(&conn).map_err(unavailable)?;

        tracing::info!("opened order store at {}", location);
        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let unavailable = |e: rusqlite::Error| StoreError::Unavailable {
            path: ":memory:".to_string(),
            reason: e.to_string(),
        };
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        ensure_schema(&conn).map_err(unavailable)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: ":memory:".to_string(),
        })
    }

    /// Where the store lives, for diagnostics.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run a read against a consistent view of both tables.
    pub async fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.conn.lock().await;
        f(&conn)
    }

    /// Run `f` inside a single write transaction. The transaction commits only
    /// if `f` returns `Ok`; any error rolls back every write `f` made.
    pub async fn transaction<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    /// Populate an empty store from the seed. A store that already holds
    /// orders is left alone. Returns the number of orders seeded.
    pub async fn initialize(&self, seed: &dyn SeedSource) -> Result<usize, StoreError> {
        self.transaction(|tx| {
            if count_orders(tx)? > 0 {
                return Ok(0);
            }
            let rows = seed.records()?;
            let written = import_rows(tx, rows)?;
            tracing::info!("seeded {} orders from {}", written, seed.name());
            Ok(written)
        })
        .await
    }

    /// Upsert a master record.
    pub async fn put_order(&self, record: &MasterRecord) -> Result<(), StoreError> {
        self.transaction(|tx| put_order(tx, record)).await
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Option<MasterRecord>, StoreError> {
        self.read(|conn| get_order(conn, order_id)).await
    }

    /// Every master record, in order_id order.
    pub async fn list_orders(&self) -> Result<Vec<MasterRecord>, StoreError> {
        self.read(all_orders).await
    }

    /// Master records matching a lookup query by order id, email, or phone,
    /// in order_id order.
    pub async fn find_orders(&self, query: &LookupQuery) -> Result<Vec<MasterRecord>, StoreError> {
        self.read(|conn| find_orders(conn, query)).await
    }

    pub async fn count_orders(&self) -> Result<usize, StoreError> {
        self.read(count_orders).await
    }

    /// Every log entry for one order, in insertion order.
    pub async fn logs_for_order(&self, order_id: &str) -> Result<Vec<LogEntry>, StoreError> {
        self.read(|conn| logs_for_order(conn, order_id)).await
    }

    /// Every log entry, in insertion order.
    pub async fn list_logs(&self) -> Result<Vec<LogEntry>, StoreError> {
        self.read(all_logs).await
    }

    /// Upsert each row by key in one transaction, skipping rows without a key.
    /// Returns the number of rows actually written.
    pub async fn bulk_import(&self, rows: Vec<ImportRecord>) -> Result<usize, StoreError> {
        let total = rows.len();
        let written = self.transaction(|tx| import_rows(tx, rows)).await?;
        tracing::info!("imported {} of {} orders", written, total);
        Ok(written)
    }

    /// Empty both tables.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.transaction(|tx| {
            tx.execute("DELETE FROM logs", [])?;
            tx.execute("DELETE FROM orders", [])?;
            Ok::<_, StoreError>(())
        })
        .await?;
        tracing::info!("cleared all orders and logs");
        Ok(())
    }
}

/// Create the tables, or drop and recreate them when the stored schema
/// version differs.
fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version == SCHEMA_VERSION {
        return Ok(());
    }
    if version != 0 {
        tracing::info!(
            "schema version {} does not match {}, recreating tables",
            version,
            SCHEMA_VERSION
        );
    }

    conn.execute_batch(&format!(
        "BEGIN;
        DROP TABLE IF EXISTS orders;
        DROP TABLE IF EXISTS logs;

        CREATE TABLE orders (
            order_id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            address TEXT NOT NULL,
            order_type TEXT NOT NULL,
            status TEXT NOT NULL,
            extra_json TEXT NOT NULL DEFAULT '{{}}',
            email_key TEXT NOT NULL,
            phone_key TEXT NOT NULL
        );
        CREATE INDEX idx_orders_email ON orders(email_key);
        CREATE INDEX idx_orders_phone ON orders(phone_key);

        CREATE TABLE logs (
            log_id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL,
            action_type TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            changes_json TEXT NOT NULL,
            source TEXT NOT NULL
        );
        CREATE INDEX idx_logs_order ON logs(order_id);

        PRAGMA user_version = {SCHEMA_VERSION};
        COMMIT;"
    ))
}

/// Fixed-width RFC 3339 with microseconds, so stored timestamps sort as text.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Raw columns of an orders row.
struct OrderRow {
    order_id: String,
    full_name: String,
    email: String,
    phone: String,
    address: String,
    order_type: String,
    status: String,
    extra_json: String,
}

impl OrderRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            order_id: row.get(0)?,
            full_name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            address: row.get(4)?,
            order_type: row.get(5)?,
            status: row.get(6)?,
            extra_json: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<MasterRecord, StoreError> {
        Ok(MasterRecord {
            order_id: self.order_id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            order_type: self.order_type,
            status: OrderStatus::parse(&self.status),
            extra: serde_json::from_str(&self.extra_json)?,
        })
    }
}

/// Raw columns of a logs row.
struct LogRow {
    log_id: String,
    order_id: String,
    action_type: String,
    timestamp: String,
    changes_json: String,
    source: String,
}

impl LogRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            log_id: row.get(0)?,
            order_id: row.get(1)?,
            action_type: row.get(2)?,
            timestamp: row.get(3)?,
            changes_json: row.get(4)?,
            source: row.get(5)?,
        })
    }

    /// Decode into a log entry. The change set stays unparsed; replay owns
    /// that. Rows whose envelope cannot be decoded come back as an anomaly.
    fn into_entry(self) -> Result<LogEntry, ReplayAnomaly> {
        let decoded = (|| {
            let log_id = self
                .log_id
                .parse::<Ulid>()
                .map_err(|e| format!("log_id: {e}"))?;
            let action_type = self
                .action_type
                .parse::<ActionType>()
                .map_err(|e| e.to_string())?;
            let source = self
                .source
                .parse::<ActionSource>()
                .map_err(|e| e.to_string())?;
            let timestamp = parse_timestamp(&self.timestamp)
                .ok_or_else(|| format!("timestamp: {}", self.timestamp))?;
            Ok::<_, String>(LogEntry {
                log_id,
                order_id: self.order_id.clone(),
                action_type,
                timestamp,
                changes_json: self.changes_json.clone(),
                source,
            })
        })();

        decoded.map_err(|reason| {
            tracing::warn!(
                "skipping undecodable log row {} for order {}: {}",
                self.log_id,
                self.order_id,
                reason
            );
            ReplayAnomaly::UndecodableEntry {
                log_id: self.log_id,
                order_id: self.order_id,
                reason,
            }
        })
    }
}

pub(crate) fn put_order(conn: &Connection, record: &MasterRecord) -> Result<(), StoreError> {
    let extra_json = serde_json::to_string(&record.extra)?;
    conn.execute(
        "INSERT INTO orders (order_id, full_name, email, phone, address, order_type, status, extra_json, email_key, phone_key)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(order_id) DO UPDATE SET
            full_name = excluded.full_name,
            email = excluded.email,
            phone = excluded.phone,
            address = excluded.address,
            order_type = excluded.order_type,
            status = excluded.status,
            extra_json = excluded.extra_json,
            email_key = excluded.email_key,
            phone_key = excluded.phone_key",
        params![
            record.order_id,
            record.full_name,
            record.email,
            record.phone,
            record.address,
            record.order_type,
            record.status.as_str(),
            extra_json,
            normalize_email(&record.email),
            normalize_phone(&record.phone),
        ],
    )?;
    Ok(())
}

pub(crate) fn get_order(conn: &Connection, order_id: &str) -> Result<Option<MasterRecord>, StoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?1"),
            params![order_id],
            OrderRow::from_row,
        )
        .optional()?;
    row.map(OrderRow::into_record).transpose()
}

fn collect_orders(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<MasterRecord>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, OrderRow::from_row)?;

    let mut orders = Vec::new();
    for row in rows {
        orders.push(row?.into_record()?);
    }
    Ok(orders)
}

pub(crate) fn all_orders(conn: &Connection) -> Result<Vec<MasterRecord>, StoreError> {
    collect_orders(
        conn,
        &format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY order_id ASC"),
        [],
    )
}

pub(crate) fn find_orders(
    conn: &Connection,
    query: &LookupQuery,
) -> Result<Vec<MasterRecord>, StoreError> {
    collect_orders(
        conn,
        &format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE order_id = ?1 OR email_key = ?2 OR phone_key = ?3
             ORDER BY order_id ASC"
        ),
        params![query.order_id, query.email, query.phone],
    )
}

pub(crate) fn count_orders(conn: &Connection) -> Result<usize, StoreError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
    Ok(count as usize)
}

pub(crate) fn import_rows(conn: &Connection, rows: Vec<ImportRecord>) -> Result<usize, StoreError> {
    let mut written = 0;
    for (position, row) in rows.into_iter().enumerate() {
        match row.into_master() {
            Ok(record) => {
                put_order(conn, &record)?;
                written += 1;
            }
            Err(e) => {
                tracing::warn!("skipping import row {}: {}", position, e);
            }
        }
    }
    Ok(written)
}

pub(crate) fn insert_log(conn: &Connection, entry: &LogEntry) -> Result<(), StoreError> {
    conn.execute(
        &format!("INSERT INTO logs ({LOG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![
            entry.log_id.to_string(),
            entry.order_id,
            entry.action_type.as_str(),
            format_timestamp(&entry.timestamp),
            entry.changes_json,
            entry.source.as_str(),
        ],
    )?;
    Ok(())
}

/// Log rows read in insertion order, split into decoded entries and rows
/// whose envelope could not be decoded.
#[derive(Debug, Default)]
pub(crate) struct LogScan {
    pub entries: Vec<LogEntry>,
    pub undecodable: Vec<ReplayAnomaly>,
}

fn scan_logs(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<LogScan, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, LogRow::from_row)?;

    let mut scan = LogScan::default();
    for row in rows {
        match row?.into_entry() {
            Ok(entry) => scan.entries.push(entry),
            Err(anomaly) => scan.undecodable.push(anomaly),
        }
    }
    Ok(scan)
}

pub(crate) fn scan_logs_for_order(conn: &Connection, order_id: &str) -> Result<LogScan, StoreError> {
    scan_logs(
        conn,
        &format!("SELECT {LOG_COLUMNS} FROM logs WHERE order_id = ?1 ORDER BY rowid ASC"),
        params![order_id],
    )
}

pub(crate) fn scan_all_logs(conn: &Connection) -> Result<LogScan, StoreError> {
    scan_logs(
        conn,
        &format!("SELECT {LOG_COLUMNS} FROM logs ORDER BY rowid ASC"),
        [],
    )
}

pub(crate) fn logs_for_order(conn: &Connection, order_id: &str) -> Result<Vec<LogEntry>, StoreError> {
    Ok(scan_logs_for_order(conn, order_id)?.entries)
}

pub(crate) fn all_logs(conn: &Connection) -> Result<Vec<LogEntry>, StoreError> {
    Ok(scan_all_logs(conn)?.entries)
}

/// The latest timestamp recorded for an order, if any.
pub(crate) fn latest_timestamp(
    conn: &Connection,
    order_id: &str,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    let mut stmt = conn.prepare("SELECT timestamp FROM logs WHERE order_id = ?1")?;
    let rows = stmt.query_map(params![order_id], |row| row.get::<_, String>(0))?;

    let mut latest = None;
    for row in rows {
        if let Some(ts) = parse_timestamp(&row?) {
            latest = latest.max(Some(ts));
        }
    }
    Ok(latest)
}
