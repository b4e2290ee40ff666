//! Promoting staged generations
//!
//! A staged generation replaces the live one once it can serve queries, or
//! earlier when the live generation is beyond saving: not serving, not going
//! to recover, not merely starting up, and not waiting on a missing
//! collection that may come back.

use std::sync::Arc;

use tracing::info;

use super::config_state::ConfigState;
use crate::features::catalog::IndexGeneration;
use crate::features::generation::GenerationId;
use crate::features::metrics::IndexSyncMetrics;
use crate::features::status::IndexStatus;

/// Swaps ready staged generations into the catalog
pub struct StagedSwapper {
    state: Arc<ConfigState>,
    metrics: Option<IndexSyncMetrics>,
}

impl StagedSwapper {
    pub fn new(state: Arc<ConfigState>) -> Self {
        Self {
            state,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: IndexSyncMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Swap every staged generation that is ready; returns the ones swapped in
    pub fn swap_ready(&self) -> Vec<GenerationId> {
        let mut swapped = Vec::new();
        for staged in self.state.staged.get_indexes() {
            let live = self.state.catalog.get_index_by_id(&staged.index_id());
            if should_swap(&staged, live.as_ref()) {
                self.swap(staged.clone(), live);
                swapped.push(staged.generation_id());
            }
        }
        swapped
    }

    fn swap(&self, staged: IndexGeneration, live: Option<IndexGeneration>) {
        if let Some(live) = live {
            info!(
                index_id = %staged.index_id(),
                from = %live.generation(),
                to = %staged.generation(),
                "swapping in staged generation"
            );
            self.state.phasing_out.add_index(live);
        }
        self.state.catalog.add_index(staged.clone());
        self.state.staged.remove_index(&staged.index_id());

        if let Some(metrics) = &self.metrics {
            metrics.record_swap();
        }
    }
}

fn should_swap(staged: &IndexGeneration, live: Option<&IndexGeneration>) -> bool {
    if staged.index().status().can_service_queries() {
        return true;
    }
    match live {
        Some(live) => is_unusable(&live.index().status()),
        None => true,
    }
}

fn is_unusable(status: &IndexStatus) -> bool {
    !status.can_service_queries()
        && !status.can_be_recovered()
        && !status.is_transient()
        && !status.is_collection_not_found()
}
