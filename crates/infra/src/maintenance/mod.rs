//! Storage maintenance: health checks, retention cleanup, recovery

pub mod monitor;

pub use monitor::{MaintenanceConfig, MaintenanceMonitor};
