//! Disk utilization monitor
//!
//! Polls the data volume and feeds every registered gate. Gates pause
//! replication intake before the disk fills; if utilization still climbs
//! past the crash threshold after any gate has ever let work through, the
//! process is terminated through the supervisor rather than left to fail
//! writes halfway.
//!
//! The "ever opened" flag is sticky: once replication has been allowed to
//! run, a full disk is fatal even if every gate is closed right now.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::sys::statvfs::statvfs;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::gate::HysteresisGate;
use super::supervisor::SupervisorHandle;
use crate::config::DiskMonitorConfig;
use crate::features::metrics::IndexSyncMetrics;
use crate::shared::models::{ErrorKind, IndexSyncError, Result};

// ═══════════════════════════════════════════════════════════════════════════
// Utilization Sources
// ═══════════════════════════════════════════════════════════════════════════

/// Used fraction of some resource, in `[0, 1]`
pub trait UtilizationSource: Send + Sync {
    fn utilization(&self) -> Result<f64>;
}

/// Used fraction of the filesystem holding a path
#[derive(Debug, Clone)]
pub struct FsUtilizationSource {
    path: PathBuf,
}

impl FsUtilizationSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UtilizationSource for FsUtilizationSource {
    fn utilization(&self) -> Result<f64> {
        let stats = statvfs(self.path.as_path()).map_err(|e| {
            IndexSyncError::new(
                ErrorKind::IO,
                format!("statvfs failed for {}", self.path.display()),
            )
            .with_source(e)
        })?;

        let total = stats.blocks() as f64;
        if total <= 0.0 {
            return Err(IndexSyncError::new(
                ErrorKind::IO,
                format!("{} reports no capacity", self.path.display()),
            ));
        }
        // blocks available to unprivileged writers, which is what the index sees
        let available = stats.blocks_available() as f64;
        Ok((1.0 - available / total).clamp(0.0, 1.0))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Monitor
// ═══════════════════════════════════════════════════════════════════════════

/// Polls a `UtilizationSource` and drives registered gates
pub struct DiskMonitor {
    source: Arc<dyn UtilizationSource>,
    gates: RwLock<Vec<Arc<HysteresisGate>>>,
    ever_opened: Arc<AtomicBool>,
    crash_signaled: AtomicBool,
    pause_threshold: f64,
    resume_threshold: f64,
    crash_threshold: f64,
    poll_interval: Duration,
    supervisor: SupervisorHandle,
    metrics: Option<IndexSyncMetrics>,
}

impl DiskMonitor {
    pub fn new(
        config: &DiskMonitorConfig,
        source: Arc<dyn UtilizationSource>,
        supervisor: SupervisorHandle,
    ) -> Self {
        Self {
            source,
            gates: RwLock::new(Vec::new()),
            ever_opened: Arc::new(AtomicBool::new(false)),
            crash_signaled: AtomicBool::new(false),
            pause_threshold: config.pause_threshold,
            resume_threshold: config.resume_threshold,
            crash_threshold: config.crash_threshold,
            poll_interval: config.poll_interval(),
            supervisor,
            metrics: None,
        }
    }

    /// Monitor of the filesystem at `config.data_path`
    pub fn for_data_path(config: &DiskMonitorConfig, supervisor: SupervisorHandle) -> Self {
        let source = Arc::new(FsUtilizationSource::new(config.data_path.clone()));
        Self::new(config, source, supervisor)
    }

    pub fn with_metrics(mut self, metrics: IndexSyncMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// New open gate using the configured pause/resume thresholds, registered
    pub fn create_gate(&self, name: impl Into<String>) -> Result<Arc<HysteresisGate>> {
        let gate = Arc::new(HysteresisGate::new(
            name,
            self.resume_threshold,
            self.pause_threshold,
        )?);
        self.register(Arc::clone(&gate));
        Ok(gate)
    }

    pub fn register(&self, gate: Arc<HysteresisGate>) {
        gate.gate().attach_ever_opened(Arc::clone(&self.ever_opened));
        debug!(gate = %gate.gate().name(), open = gate.is_open(), "gate registered");
        self.gates.write().push(gate);
    }

    pub fn gate_count(&self) -> usize {
        self.gates.read().len()
    }

    /// Whether any registered gate has ever been open
    pub fn ever_opened(&self) -> bool {
        self.ever_opened.load(Ordering::SeqCst)
    }

    /// Read the source once and apply the reading
    pub fn poll_once(&self) -> Result<f64> {
        let utilization = self.source.utilization()?;
        self.evaluate(utilization);
        Ok(utilization)
    }

    /// Apply a reading to every gate; returns whether a crash was signaled
    pub fn evaluate(&self, utilization: f64) -> bool {
        let gates: Vec<Arc<HysteresisGate>> = self.gates.read().clone();
        let open = gates.iter().filter(|gate| gate.update(utilization)).count();

        if let Some(metrics) = &self.metrics {
            metrics.disk_utilization.set(utilization);
            metrics.gates_open.set(open as i64);
        }

        if utilization > self.crash_threshold && self.ever_opened() {
            if !self.crash_signaled.swap(true, Ordering::SeqCst) {
                self.supervisor.crash(format!(
                    "disk utilization {:.3} exceeds crash threshold {:.3}",
                    utilization, self.crash_threshold
                ));
            }
            return true;
        }
        false
    }

    /// Poll on the configured interval under the supervisor
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let supervisor = self.supervisor.clone();
        supervisor.spawn_supervised("disk-monitor", async move {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.poll_once() {
                    warn!(error = %e, "disk utilization poll failed");
                }
            }
        })
    }
}
