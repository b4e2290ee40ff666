//! Resource protection
//!
//! - `gate`: open/closed gates with hysteresis
//! - `disk_monitor`: polls disk utilization, drives gates, enforces the crash rule
//! - `supervisor`: turns fatal conditions and task panics into process exit

pub mod disk_monitor;
pub mod gate;
pub mod supervisor;

pub use disk_monitor::{DiskMonitor, FsUtilizationSource, UtilizationSource};
pub use gate::{HysteresisGate, ToggleGate};
pub use supervisor::{
    FatalSignal, ProcessExit, Supervisor, SupervisorHandle, Terminator, FATAL_EXIT_CODE,
};
