// ABOUTME: Computes an order's current state by replaying its log over its master record.
// ABOUTME: Reads master and log in one consistent view and recomputes on every call.

use std::sync::Arc;

use cassncase_core::{ComputedState, replay};

use crate::sqlite::{self, OrderStore, StoreError};

#[derive(Clone)]
pub struct StateReplayer {
    store: Arc<OrderStore>,
}

impl StateReplayer {
    pub fn new(store: Arc<OrderStore>) -> Self {
        Self { store }
    }

    /// Compute the current state of an order. `None` means the order does not
    /// exist, which is distinct from an order with no actions yet.
    pub async fn compute_state(&self, order_id: &str) -> Result<Option<ComputedState>, StoreError> {
        let loaded = self
            .store
            .read(|conn| {
                let Some(master) = sqlite::get_order(conn, order_id)? else {
                    return Ok(None);
                };
                let scan = sqlite::scan_logs_for_order(conn, order_id)?;
                Ok(Some((master, scan)))
            })
            .await?;

        Ok(loaded.map(|(master, scan)| {
            let mut state = replay(&master, &scan.entries);
            state.anomalies.extend(scan.undecodable);
            state
        }))
    }
}
