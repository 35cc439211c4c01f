// ABOUTME: OrderLedger bundles the store, writer, replayer, resolver, and notifier behind one handle.
// ABOUTME: Owns the explicit open/seed lifecycle and exposes every public operation.

use std::path::Path;
use std::sync::Arc;

use cassncase_core::{ActionSource, ActionType, Changes, ComputedState, ImportRecord, LogEntry, MasterRecord};
use tokio::sync::broadcast;

use crate::audit::{AuditReport, audit_mirror};
use crate::notify::{ChangeKind, ChangeNotice, ChangeNotifier};
use crate::replayer::StateReplayer;
use crate::resolver::QueryResolver;
use crate::seed::SeedSource;
use crate::sqlite::{OrderStore, StoreError};
use crate::writer::{LogWriter, WriteError};

/// Public entry point for callers: UI, CLI, and admin collaborators.
pub struct OrderLedger {
    store: Arc<OrderStore>,
    writer: LogWriter,
    replayer: StateReplayer,
    resolver: QueryResolver,
    notifier: ChangeNotifier,
}

impl OrderLedger {
    /// Open the store at `path`, seed it if empty, and audit the mirror.
    /// Any failure here is fatal: the ledger is unusable.
    pub async fn open(path: &Path, seed: &dyn SeedSource) -> Result<Self, StoreError> {
        let store = OrderStore::open(path)?;
        Self::from_store(store, seed).await
    }

    /// Open a private in-memory ledger.
    pub async fn open_in_memory(seed: &dyn SeedSource) -> Result<Self, StoreError> {
        let store = OrderStore::open_in_memory()?;
        Self::from_store(store, seed).await
    }

    async fn from_store(store: OrderStore, seed: &dyn SeedSource) -> Result<Self, StoreError> {
        let location = store.location().to_string();
        let unavailable = |e: StoreError| StoreError::Unavailable {
            path: location.clone(),
            reason: e.to_string(),
        };

        store.initialize(seed).await.map_err(unavailable)?;

        let report = audit_mirror(&store).await.map_err(unavailable)?;
        if report.is_clean() {
            tracing::info!("audited {} orders, mirror consistent", report.orders_checked);
        } else {
            tracing::warn!(
                "audited {} orders: {} divergent, {} orphan log entries, {} undecodable log rows",
                report.orders_checked,
                report.divergences.len(),
                report.orphan_entries.len(),
                report.undecodable_entries.len()
            );
        }

        let store = Arc::new(store);
        let notifier = ChangeNotifier::default();
        let replayer = StateReplayer::new(Arc::clone(&store));
        Ok(Self {
            writer: LogWriter::new(Arc::clone(&store), notifier.clone()),
            resolver: QueryResolver::new(Arc::clone(&store), replayer.clone()),
            replayer,
            notifier,
            store,
        })
    }

    pub fn store(&self) -> &Arc<OrderStore> {
        &self.store
    }

    pub async fn search(&self, query: &str) -> Result<Option<ComputedState>, StoreError> {
        self.resolver.search(query).await
    }

    pub async fn search_all(&self, query: &str) -> Result<Vec<ComputedState>, StoreError> {
        self.resolver.search_all(query).await
    }

    pub async fn compute_state(&self, order_id: &str) -> Result<Option<ComputedState>, StoreError> {
        self.replayer.compute_state(order_id).await
    }

    pub async fn record(
        &self,
        order_id: &str,
        action_type: ActionType,
        changes: Changes,
        source: ActionSource,
    ) -> Result<LogEntry, WriteError> {
        self.writer
            .record(order_id, action_type, changes, source)
            .await
    }

    /// Upsert master records, notifying observers when anything was written.
    pub async fn bulk_import(&self, rows: Vec<ImportRecord>) -> Result<usize, StoreError> {
        let written = self.store.bulk_import(rows).await?;
        if written > 0 {
            self.notifier.publish(ChangeKind::DataChanged);
        }
        Ok(written)
    }

    /// Wipe every order and log entry.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.store.clear_all().await?;
        self.notifier.publish(ChangeKind::DataChanged);
        Ok(())
    }

    pub async fn list_orders(&self) -> Result<Vec<MasterRecord>, StoreError> {
        self.store.list_orders().await
    }

    pub async fn list_logs(&self) -> Result<Vec<LogEntry>, StoreError> {
        self.store.list_logs().await
    }

    pub async fn audit(&self) -> Result<AuditReport, StoreError> {
        audit_mirror(&self.store).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.notifier.subscribe()
    }
}
