//! Scheduled job bodies
//!
//! Every job body funnels through the registry guard, wraps its work in a
//! timeout, and reports outcomes via structured tracing. Errors are logged
//! and swallowed so that one bad tick never prevents the next.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use macroplan_core::{GoalService, RecommendationService};
use macroplan_domain::{BatchMode, JobKind, StorageHealthStatus};
use tracing::{error, info, warn};

use crate::maintenance::MaintenanceMonitor;
use crate::scheduling::registry::JobRegistry;

/// Shared context handed to every scheduled job body
pub struct JobContext {
    pub registry: JobRegistry,
    pub goals: Arc<GoalService>,
    pub recommendations: Arc<RecommendationService>,
    pub monitor: Arc<MaintenanceMonitor>,
    pub job_timeout: Duration,
}

impl JobContext {
    /// Materialize daily goals for the whole population.
    pub async fn run_daily_goals(&self, mode: BatchMode) {
        let _lease = match self.registry.try_begin(JobKind::DailyGoals) {
            Ok(lease) => lease,
            Err(reason) => {
                info!(job = JobKind::DailyGoals.as_str(), %reason, "Job skipped");
                return;
            }
        };

        let date = Utc::now().date_naive();
        match tokio::time::timeout(self.job_timeout, self.goals.run_daily_batch(date, mode)).await
        {
            Ok(Ok(result)) => {
                info!(
                    created = result.created,
                    updated = result.updated,
                    skipped = result.skipped,
                    errors = result.error_count(),
                    "Daily goal job finished"
                );
            }
            Ok(Err(err)) => {
                error!(error = %err, "Daily goal job failed");
            }
            Err(_) => {
                warn!(timeout_secs = self.job_timeout.as_secs(), "Daily goal job timed out");
            }
        }
    }

    /// Generate recommendations for users with completed profiles.
    pub async fn run_recommendations(&self) {
        let _lease = match self.registry.try_begin(JobKind::Recommendations) {
            Ok(lease) => lease,
            Err(reason) => {
                info!(job = JobKind::Recommendations.as_str(), %reason, "Job skipped");
                return;
            }
        };

        let date = Utc::now().date_naive();
        match tokio::time::timeout(self.job_timeout, self.recommendations.run_population(date))
            .await
        {
            Ok(Ok(generated)) => {
                info!(generated, "Recommendation job finished");
            }
            Ok(Err(err)) => {
                error!(error = %err, "Recommendation job failed");
            }
            Err(_) => {
                warn!(timeout_secs = self.job_timeout.as_secs(), "Recommendation job timed out");
            }
        }
    }

    /// Check storage health and trigger cleanup or recovery as needed.
    pub async fn run_maintenance(&self) {
        let _lease = match self.registry.try_begin(JobKind::Maintenance) {
            Ok(lease) => lease,
            Err(reason) => {
                info!(job = JobKind::Maintenance.as_str(), %reason, "Job skipped");
                return;
            }
        };

        let report = match tokio::time::timeout(self.job_timeout, self.monitor.check_health())
            .await
        {
            Ok(Ok(report)) => report,
            Ok(Err(err)) => {
                error!(error = %err, "Storage health check failed");
                return;
            }
            Err(_) => {
                warn!(timeout_secs = self.job_timeout.as_secs(), "Health check timed out");
                return;
            }
        };

        if report.status == StorageHealthStatus::Critical {
            warn!(stale_rows = report.stale_rows(), "Storage health critical; running recovery");
            if !self.monitor.emergency_recovery().await {
                error!("Emergency recovery failed; storage needs operator attention");
            }
            return;
        }

        if report.needs_cleanup {
            match self.monitor.cleanup().await {
                Ok(stats) => {
                    info!(deleted = stats.total_deleted(), "Maintenance cleanup finished");
                }
                Err(err) => {
                    error!(error = %err, "Maintenance cleanup failed");
                }
            }
        }
    }
}
