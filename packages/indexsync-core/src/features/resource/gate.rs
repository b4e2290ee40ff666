//! Open/closed gates
//!
//! A `ToggleGate` is a boolean that producers consult before doing work
//! that consumes a resource. A `HysteresisGate` drives one from a
//! utilization reading with separate open and close thresholds, so a
//! reading hovering around one threshold does not flap the gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::shared::models::{IndexSyncError, Result};

/// Shared open/close switch
#[derive(Debug)]
pub struct ToggleGate {
    name: String,
    state: watch::Sender<bool>,
    /// Set on every transition to open once the gate is registered
    ever_opened: OnceCell<Arc<AtomicBool>>,
}

impl ToggleGate {
    pub fn new(name: impl Into<String>, open: bool) -> Self {
        let (state, _) = watch::channel(open);
        Self {
            name: name.into(),
            state,
            ever_opened: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        *self.state.borrow()
    }

    /// Returns whether the gate was closed before
    pub fn open(&self) -> bool {
        let was_open = self.state.send_replace(true);
        if !was_open {
            if let Some(flag) = self.ever_opened.get() {
                flag.store(true, Ordering::SeqCst);
            }
            info!(gate = %self.name, "gate opened");
        }
        !was_open
    }

    /// Returns whether the gate was open before
    pub fn close(&self) -> bool {
        let was_open = self.state.send_replace(false);
        if was_open {
            info!(gate = %self.name, "gate closed");
        }
        was_open
    }

    /// Resolves once the gate is open
    pub async fn wait_until_open(&self) {
        let mut rx = self.state.subscribe();
        // the sender lives as long as `self`, so this cannot observe a closed channel
        let _ = rx.wait_for(|open| *open).await;
    }

    /// Link the gate to a monitor's "ever opened" flag
    pub(crate) fn attach_ever_opened(&self, flag: Arc<AtomicBool>) {
        if self.ever_opened.set(flag).is_err() {
            warn!(gate = %self.name, "gate registered with more than one monitor");
        }
        if self.is_open() {
            if let Some(flag) = self.ever_opened.get() {
                flag.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// Gate driven by a utilization reading
///
/// Closes when utilization is strictly above `close_threshold`, opens when
/// strictly below `open_threshold`, and otherwise stays as it is.
#[derive(Debug)]
pub struct HysteresisGate {
    gate: Arc<ToggleGate>,
    open_threshold: f64,
    close_threshold: f64,
}

impl HysteresisGate {
    /// New gate, initially open
    pub fn new(name: impl Into<String>, open_threshold: f64, close_threshold: f64) -> Result<Self> {
        Self::from_gate(
            Arc::new(ToggleGate::new(name, true)),
            open_threshold,
            close_threshold,
        )
    }

    /// Drive an existing gate
    pub fn from_gate(
        gate: Arc<ToggleGate>,
        open_threshold: f64,
        close_threshold: f64,
    ) -> Result<Self> {
        if open_threshold.partial_cmp(&close_threshold) != Some(std::cmp::Ordering::Less) {
            return Err(IndexSyncError::config(format!(
                "gate {}: open threshold {} must be below close threshold {}",
                gate.name(),
                open_threshold,
                close_threshold
            )));
        }
        Ok(Self {
            gate,
            open_threshold,
            close_threshold,
        })
    }

    pub fn gate(&self) -> &Arc<ToggleGate> {
        &self.gate
    }

    pub fn is_open(&self) -> bool {
        self.gate.is_open()
    }

    /// Apply a reading; returns whether the gate is open afterwards
    pub fn update(&self, utilization: f64) -> bool {
        if utilization > self.close_threshold {
            self.gate.close();
        } else if utilization < self.open_threshold {
            self.gate.open();
        }
        self.gate.is_open()
    }
}
