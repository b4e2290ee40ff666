//! Prometheus metrics
//!
//! Gauges mirror the registries' getters; they are refreshed by whoever owns
//! the registries rather than updated on every mutation.

use prometheus::{
    register_gauge_with_registry, register_int_counter_with_registry,
    register_int_gauge_vec_with_registry, register_int_gauge_with_registry, Encoder, Gauge,
    IntCounter, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::features::catalog::{IndexCatalog, InitializedIndexCatalog};
use crate::features::leasing::Lease;
use crate::features::status::StatusCode;
use crate::shared::models::{IndexSyncError, Result};

/// Index lifecycle and resource metrics
#[derive(Clone)]
pub struct IndexSyncMetrics {
    registry: Registry,
    pub catalog_indexes: IntGauge,
    pub initialized_indexes: IntGauge,
    pub staged_indexes: IntGauge,
    pub disk_utilization: Gauge,
    pub gates_open: IntGauge,
    pub lease_status: IntGaugeVec,
    pub swaps_total: IntCounter,
}

impl IndexSyncMetrics {
    /// Metrics registered on a fresh registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> Result<Self> {
        Ok(Self {
            catalog_indexes: register_int_gauge_with_registry!(
                Opts::new("indexsync_catalog_indexes", "Index generations in the catalog"),
                registry
            )?,
            initialized_indexes: register_int_gauge_with_registry!(
                Opts::new(
                    "indexsync_initialized_indexes",
                    "Index generations currently running"
                ),
                registry
            )?,
            staged_indexes: register_int_gauge_with_registry!(
                Opts::new(
                    "indexsync_staged_indexes",
                    "Index generations building behind a live generation"
                ),
                registry
            )?,
            disk_utilization: register_gauge_with_registry!(
                Opts::new(
                    "indexsync_disk_utilization",
                    "Used fraction of the data volume"
                ),
                registry
            )?,
            gates_open: register_int_gauge_with_registry!(
                Opts::new("indexsync_gates_open", "Resource gates currently open"),
                registry
            )?,
            lease_status: register_int_gauge_vec_with_registry!(
                Opts::new(
                    "indexsync_lease_status",
                    "Leases by status of their latest definition version"
                ),
                &["status"],
                registry
            )?,
            swaps_total: register_int_counter_with_registry!(
                Opts::new(
                    "indexsync_swaps_total",
                    "Staged generations promoted to the catalog"
                ),
                registry
            )?,
            registry,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Set the catalog gauges from the registries
    pub fn refresh_catalogs(
        &self,
        catalog: &IndexCatalog,
        staged: &IndexCatalog,
        initialized: &InitializedIndexCatalog,
    ) {
        self.catalog_indexes.set(catalog.get_size() as i64);
        self.staged_indexes.set(staged.get_size() as i64);
        self.initialized_indexes.set(initialized.get_size() as i64);
    }

    /// Count leases by the status of their latest definition version
    pub fn refresh_leases(&self, leases: &[Lease]) {
        for code in StatusCode::ALL {
            let count = leases
                .iter()
                .filter(|lease| lease.latest_status().status_code == code)
                .count();
            self.lease_status
                .with_label_values(&[code.as_str()])
                .set(count as i64);
        }
    }

    pub fn record_swap(&self) {
        self.swaps_total.inc();
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            IndexSyncError::internal("metrics exposition is not valid UTF-8").with_source(e)
        })
    }
}
