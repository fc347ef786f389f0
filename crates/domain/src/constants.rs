//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Batch processing configuration
pub const DEFAULT_BATCH_CONCURRENCY: usize = 5;
pub const DEFAULT_BATCH_PAUSE_MS: u64 = 200;

// Job scheduling configuration
pub const MIN_JOB_SPACING_SECS: u64 = 1800; // 30 minutes
pub const STARTUP_PASS_DELAY_SECS: u64 = 10;
pub const DAILY_GOAL_CRON: &str = "0 5 0 * * *"; // daily at 00:05
pub const RECOMMENDATION_CRON: &str = "0 15 */6 * * *"; // every 6 hours
pub const MAINTENANCE_CRON: &str = "0 45 * * * *"; // hourly

// Retention windows (days)
pub const GOAL_RETENTION_DAYS: u32 = 90;
pub const RECOMMENDATION_RETENTION_DAYS: u32 = 30;

// Storage health thresholds (stale row counts)
pub const STALE_ROWS_WARNING_THRESHOLD: u64 = 500;
pub const STALE_ROWS_CRITICAL_THRESHOLD: u64 = 5000;
