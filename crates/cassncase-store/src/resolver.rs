// ABOUTME: Resolves a buyer's lookup input (email, phone, or order id) to a computed order state.
// ABOUTME: Candidates come from the store's lookup indexes; state comes from the replayer.

use std::sync::Arc;

use cassncase_core::{ComputedState, LookupQuery};

use crate::replayer::StateReplayer;
use crate::sqlite::{OrderStore, StoreError};

#[derive(Clone)]
pub struct QueryResolver {
    store: Arc<OrderStore>,
    replayer: StateReplayer,
}

impl QueryResolver {
    pub fn new(store: Arc<OrderStore>, replayer: StateReplayer) -> Self {
        Self { store, replayer }
    }

    /// Find the order matching `raw` and compute its state. When several
    /// orders match, the first by order id wins and the ambiguity is logged;
    /// use [`QueryResolver::search_all`] to see every candidate.
    pub async fn search(&self, raw: &str) -> Result<Option<ComputedState>, StoreError> {
        let Some(query) = LookupQuery::parse(raw) else {
            return Ok(None);
        };

        let candidates = self.store.find_orders(&query).await?;
        let Some(first) = candidates.first() else {
            tracing::debug!("no order matches lookup {:?}", query.order_id);
            return Ok(None);
        };

        if candidates.len() > 1 {
            let ids: Vec<&str> = candidates.iter().map(|c| c.order_id.as_str()).collect();
            tracing::warn!(
                "lookup matched {} orders ({}), using {}",
                candidates.len(),
                ids.join(", "),
                first.order_id
            );
        }

        self.replayer.compute_state(&first.order_id).await
    }

    /// Compute the state of every order matching `raw`, in order id order.
    pub async fn search_all(&self, raw: &str) -> Result<Vec<ComputedState>, StoreError> {
        let Some(query) = LookupQuery::parse(raw) else {
            return Ok(Vec::new());
        };

        let mut states = Vec::new();
        for candidate in self.store.find_orders(&query).await? {
            // A candidate can vanish if the store is cleared mid-search
            if let Some(state) = self.replayer.compute_state(&candidate.order_id).await? {
                states.push(state);
            }
        }
        Ok(states)
    }
}
