//! Storage maintenance monitor
//!
//! Computes a storage health signal from stale-row counts, deletes rows past
//! their retention windows inside one bounded-duration transaction, and runs
//! the emergency recovery sequence the scheduler escalates to when health
//! goes critical.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use macroplan_domain::constants::{
    GOAL_RETENTION_DAYS, RECOMMENDATION_RETENTION_DAYS, STALE_ROWS_CRITICAL_THRESHOLD,
    STALE_ROWS_WARNING_THRESHOLD,
};
use macroplan_domain::{
    CleanupStats, MacroPlanError, Result, StorageHealthReport, StorageHealthStatus,
};
use rusqlite::params;
use tracing::{error, info, instrument, warn};

use crate::database::DbManager;

const SECS_PER_DAY: i64 = 86_400;

/// Configuration for the maintenance monitor
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Retention period for daily goal rows (days)
    pub goal_retention_days: u32,
    /// Retention period for recommendation rows (days)
    pub recommendation_retention_days: u32,
    /// Stale-row count at which health degrades to warning
    pub warning_threshold: u64,
    /// Stale-row count at which health degrades to critical
    pub critical_threshold: u64,
    /// Timeout for the cleanup transaction
    pub cleanup_timeout: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            goal_retention_days: GOAL_RETENTION_DAYS,
            recommendation_retention_days: RECOMMENDATION_RETENTION_DAYS,
            warning_threshold: STALE_ROWS_WARNING_THRESHOLD,
            critical_threshold: STALE_ROWS_CRITICAL_THRESHOLD,
            cleanup_timeout: Duration::from_secs(30),
        }
    }
}

/// Storage maintenance monitor
pub struct MaintenanceMonitor {
    db: Arc<DbManager>,
    config: MaintenanceConfig,
}

impl MaintenanceMonitor {
    /// Create a monitor with the default configuration
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db, config: MaintenanceConfig::default() }
    }

    /// Create a monitor with a custom configuration
    pub fn with_config(db: Arc<DbManager>, config: MaintenanceConfig) -> Self {
        Self { db, config }
    }

    /// Compute the storage health signal from stale-row counts.
    ///
    /// # Errors
    ///
    /// Returns an error when the counting queries fail.
    #[instrument(skip(self))]
    pub async fn check_health(&self) -> Result<StorageHealthReport> {
        let db = Arc::clone(&self.db);
        let config = self.config.clone();
        let now = Utc::now().timestamp();

        let report = tokio::task::spawn_blocking(move || -> Result<StorageHealthReport> {
            let conn = db.get_connection()?;

            let goal_cutoff = now - i64::from(config.goal_retention_days) * SECS_PER_DAY;
            let rec_cutoff = now - i64::from(config.recommendation_retention_days) * SECS_PER_DAY;

            let expired_sessions: u64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sessions WHERE expires_at < ?1",
                    params![now],
                    |r| r.get::<_, i64>(0),
                )
                .map(|v| v.max(0) as u64)
                .map_err(count_error)?;

            let stale_recommendations: u64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM recommendations WHERE created_at < ?1",
                    params![rec_cutoff],
                    |r| r.get::<_, i64>(0),
                )
                .map(|v| v.max(0) as u64)
                .map_err(count_error)?;

            let expired_goals: u64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM daily_goals WHERE created_at < ?1",
                    params![goal_cutoff],
                    |r| r.get::<_, i64>(0),
                )
                .map(|v| v.max(0) as u64)
                .map_err(count_error)?;

            let stale_rows = expired_sessions + stale_recommendations + expired_goals;
            let status = if stale_rows >= config.critical_threshold {
                StorageHealthStatus::Critical
            } else if stale_rows >= config.warning_threshold {
                StorageHealthStatus::Warning
            } else {
                StorageHealthStatus::Healthy
            };

            Ok(StorageHealthReport {
                status,
                needs_cleanup: stale_rows > 0,
                expired_sessions,
                stale_recommendations,
                expired_goals,
            })
        })
        .await
        .map_err(|err| MacroPlanError::Internal(format!("health check task failed: {err}")))??;

        info!(
            status = ?report.status,
            stale_rows = report.stale_rows(),
            needs_cleanup = report.needs_cleanup,
            "Storage health check completed"
        );

        Ok(report)
    }

    /// Delete rows past their retention windows.
    ///
    /// All deletes run inside one transaction so the cleanup is
    /// all-or-nothing; the transaction is abandoned when it exceeds the
    /// configured timeout and the timeout surfaces as an error.
    ///
    /// # Errors
    ///
    /// Returns an error when any delete fails or the timeout elapses.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) -> Result<CleanupStats> {
        let db = Arc::clone(&self.db);
        let config = self.config.clone();
        let now = Utc::now().timestamp();
        let started = std::time::Instant::now();

        let task = tokio::task::spawn_blocking(move || -> Result<CleanupStats> {
            let mut conn = db.get_connection()?;

            let goal_cutoff = now - i64::from(config.goal_retention_days) * SECS_PER_DAY;
            let rec_cutoff = now - i64::from(config.recommendation_retention_days) * SECS_PER_DAY;

            let tx = conn
                .transaction()
                .map_err(|e| MacroPlanError::Database(format!("begin cleanup failed: {e}")))?;

            let goals_deleted = tx
                .execute("DELETE FROM daily_goals WHERE created_at < ?1", params![goal_cutoff])
                .map_err(|e| MacroPlanError::Database(format!("goal cleanup failed: {e}")))?;

            let recommendations_deleted = tx
                .execute("DELETE FROM recommendations WHERE created_at < ?1", params![rec_cutoff])
                .map_err(|e| {
                    MacroPlanError::Database(format!("recommendation cleanup failed: {e}"))
                })?;

            let sessions_deleted = tx
                .execute("DELETE FROM sessions WHERE expires_at < ?1", params![now])
                .map_err(|e| MacroPlanError::Database(format!("session cleanup failed: {e}")))?;

            tx.commit()
                .map_err(|e| MacroPlanError::Database(format!("commit cleanup failed: {e}")))?;

            Ok(CleanupStats {
                goals_deleted,
                recommendations_deleted,
                sessions_deleted,
                duration_secs: 0.0,
            })
        });

        let mut stats = match tokio::time::timeout(self.config.cleanup_timeout, task).await {
            Ok(joined) => joined
                .map_err(|err| MacroPlanError::Internal(format!("cleanup task failed: {err}")))??,
            Err(_) => {
                warn!(
                    timeout_secs = self.config.cleanup_timeout.as_secs(),
                    "Cleanup transaction exceeded timeout"
                );
                return Err(MacroPlanError::Database(format!(
                    "cleanup timed out after {}s",
                    self.config.cleanup_timeout.as_secs()
                )));
            }
        };
        stats.duration_secs = started.elapsed().as_secs_f64();

        info!(
            goals = stats.goals_deleted,
            recommendations = stats.recommendations_deleted,
            sessions = stats.sessions_deleted,
            duration_secs = stats.duration_secs,
            "Cleanup completed"
        );

        Ok(stats)
    }

    /// Run the emergency recovery sequence.
    ///
    /// Verify connectivity, clean up, compact the database, and re-verify
    /// that the critical tables are readable. Returns `false` when any step
    /// fails so the caller can escalate.
    #[instrument(skip(self))]
    pub async fn emergency_recovery(&self) -> bool {
        info!("Starting emergency recovery");

        if let Err(err) = self.db.health_check() {
            error!(error = %err, "Recovery aborted: connectivity check failed");
            return false;
        }

        match self.cleanup().await {
            Ok(stats) => {
                info!(deleted = stats.total_deleted(), "Recovery cleanup finished");
            }
            Err(err) => {
                error!(error = %err, "Recovery aborted: cleanup failed");
                return false;
            }
        }

        if let Err(err) = self.vacuum().await {
            error!(error = %err, "Recovery aborted: vacuum failed");
            return false;
        }

        match self.verify_critical_tables().await {
            Ok(()) => {
                info!("Emergency recovery completed");
                true
            }
            Err(err) => {
                error!(error = %err, "Recovery aborted: table verification failed");
                false
            }
        }
    }

    /// Rebuild the database file to reclaim space.
    async fn vacuum(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute("VACUUM", [])
                .map_err(|e| MacroPlanError::Database(format!("vacuum failed: {e}")))?;
            Ok(())
        })
        .await
        .map_err(|err| MacroPlanError::Internal(format!("vacuum task failed: {err}")))?
    }

    /// Confirm the critical tables answer a count query.
    async fn verify_critical_tables(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            for table in ["users", "daily_goals"] {
                let count: i64 = conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
                    .map_err(|e| {
                        MacroPlanError::Database(format!("count of {table} failed: {e}"))
                    })?;
                if count < 0 {
                    return Err(MacroPlanError::Database(format!(
                        "count of {table} returned {count}"
                    )));
                }
            }
            Ok(())
        })
        .await
        .map_err(|err| MacroPlanError::Internal(format!("verification task failed: {err}")))?
    }
}

fn count_error(err: rusqlite::Error) -> MacroPlanError {
    MacroPlanError::Database(format!("stale row count failed: {err}"))
}
