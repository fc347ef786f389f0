//! Configuration loader
//!
//! Loads application configuration from environment variables or a TOML
//! file.
//!
//! ## Loading Strategy
//! 1. Start from defaults
//! 2. Merge a TOML file when one is found (or explicitly given)
//! 3. Environment variables override file values
//!
//! ## Environment Variables
//! - `MACROPLAN_DB_PATH`: Database file path
//! - `MACROPLAN_DB_POOL_SIZE`: Connection pool size
//! - `MACROPLAN_BATCH_CONCURRENCY`: Users processed per worker group
//! - `MACROPLAN_BATCH_PAUSE_MS`: Pause between worker groups
//! - `MACROPLAN_MIN_JOB_SPACING_SECS`: Minimum spacing between job runs
//! - `MACROPLAN_STARTUP_DELAY_SECS`: Delay before the eager startup pass
//! - `MACROPLAN_OPENAI_API_KEY`: Text-generation API key (optional)
//! - `MACROPLAN_OPENAI_MODEL`: Text-generation model override (optional)
//!
//! ## File Locations
//! The loader probes `./macroplan.toml` and `./config.toml` in the current
//! working directory, then the same names one directory up.

use std::path::PathBuf;

use macroplan_domain::{Config, MacroPlanError, Result};
use tracing::{debug, info};

const PROBE_NAMES: [&str; 2] = ["macroplan.toml", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `MacroPlanError::Config` if a config file exists but cannot be
/// parsed, or if an environment override has an invalid value.
pub fn load() -> Result<Config> {
    let mut config = match probe_config_paths() {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration file");
            load_from_file(&path)?
        }
        None => {
            debug!("No configuration file found; using defaults");
            Config::default()
        }
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a specific TOML file
///
/// # Errors
/// Returns `MacroPlanError::Config` if the file cannot be read or parsed.
pub fn load_from_file(path: &std::path::Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        MacroPlanError::Config(format!("failed to read config file {}: {e}", path.display()))
    })?;
    toml::from_str(&raw).map_err(|e| {
        MacroPlanError::Config(format!("failed to parse config file {}: {e}", path.display()))
    })
}

fn probe_config_paths() -> Option<PathBuf> {
    for dir in [".", ".."] {
        for name in PROBE_NAMES {
            let candidate = PathBuf::from(dir).join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(path) = std::env::var("MACROPLAN_DB_PATH") {
        config.database.path = path;
    }
    if let Some(pool_size) = env_parse::<u32>("MACROPLAN_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }
    if let Some(concurrency) = env_parse::<usize>("MACROPLAN_BATCH_CONCURRENCY")? {
        config.batch.concurrency = concurrency;
    }
    if let Some(pause_ms) = env_parse::<u64>("MACROPLAN_BATCH_PAUSE_MS")? {
        config.batch.pause_ms = pause_ms;
    }
    if let Some(spacing) = env_parse::<u64>("MACROPLAN_MIN_JOB_SPACING_SECS")? {
        config.scheduler.min_spacing_secs = spacing;
    }
    if let Some(delay) = env_parse::<u64>("MACROPLAN_STARTUP_DELAY_SECS")? {
        config.scheduler.startup_delay_secs = delay;
    }
    if let Ok(api_key) = std::env::var("MACROPLAN_OPENAI_API_KEY") {
        if !api_key.is_empty() {
            config.generator.api_key = Some(api_key);
        }
    }
    if let Ok(model) = std::env::var("MACROPLAN_OPENAI_MODEL") {
        if !model.is_empty() {
            config.generator.model = Some(model);
        }
    }
    Ok(())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| MacroPlanError::Config(format!("invalid value for {name}: {e}"))),
        Err(_) => Ok(None),
    }
}
