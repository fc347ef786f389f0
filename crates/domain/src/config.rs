//! Application configuration structures
//!
//! Loaded by the infrastructure configuration loader from environment
//! variables or a TOML file. Defaults mirror the domain constants.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DAILY_GOAL_CRON, DEFAULT_BATCH_CONCURRENCY, DEFAULT_BATCH_PAUSE_MS, MAINTENANCE_CRON,
    MIN_JOB_SPACING_SECS, RECOMMENDATION_CRON, STARTUP_PASS_DELAY_SECS,
};

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path
    pub path: String,
    /// Connection pool size
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "macroplan.db".into(), pool_size: 4 }
    }
}

/// Batch orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of users processed concurrently in one worker group
    pub concurrency: usize,
    /// Pause between worker groups (milliseconds)
    pub pause_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: DEFAULT_BATCH_CONCURRENCY, pause_ms: DEFAULT_BATCH_PAUSE_MS }
    }
}

/// Job scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cron expression for the daily goal materialization job
    pub daily_goal_cron: String,
    /// Cron expression for the recommendation generation job
    pub recommendation_cron: String,
    /// Cron expression for the maintenance job
    pub maintenance_cron: String,
    /// Minimum spacing between two runs of the same job kind (seconds)
    pub min_spacing_secs: u64,
    /// Delay before the eager startup pass (seconds)
    pub startup_delay_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_goal_cron: DAILY_GOAL_CRON.into(),
            recommendation_cron: RECOMMENDATION_CRON.into(),
            maintenance_cron: MAINTENANCE_CRON.into(),
            min_spacing_secs: MIN_JOB_SPACING_SECS,
            startup_delay_secs: STARTUP_PASS_DELAY_SECS,
        }
    }
}

/// Text-generation collaborator configuration
///
/// The collaborator is optional; without an API key the deterministic
/// fallback recommendations are used.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneratorConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
}
