//! Cron-based job scheduler for goal materialization workloads.
//!
//! Registers the daily goal, recommendation, and maintenance jobs on fixed
//! cron triggers with explicit lifecycle management: join handles are
//! tracked, cancellation is explicit, and every job execution is wrapped in
//! a timeout. Shortly after start, one eager pass backfills missing goals
//! and checks storage health so a freshly started process does not wait for
//! the next fixed-time trigger.
//!
//! Overlap prevention and minimum re-run spacing live in the
//! [`JobRegistry`](crate::scheduling::registry::JobRegistry); the scheduler
//! owns no business logic beyond invoking the job bodies.

use std::sync::Arc;
use std::time::Duration;

use macroplan_domain::{BatchMode, JobStatus, SchedulerConfig};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};
use crate::scheduling::jobs::JobContext;

/// Configuration for the goal scheduler.
#[derive(Debug, Clone)]
pub struct GoalSchedulerConfig {
    /// Cron expression for the daily goal materialization job.
    pub daily_goal_cron: String,
    /// Cron expression for the recommendation generation job.
    pub recommendation_cron: String,
    /// Cron expression for the maintenance job.
    pub maintenance_cron: String,
    /// Delay before the eager startup pass.
    pub startup_delay: Duration,
    /// Whether the eager startup pass runs at all.
    pub run_startup_pass: bool,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting spawned task join handles.
    pub join_timeout: Duration,
}

impl Default for GoalSchedulerConfig {
    fn default() -> Self {
        let scheduler = SchedulerConfig::default();
        Self {
            daily_goal_cron: scheduler.daily_goal_cron,
            recommendation_cron: scheduler.recommendation_cron,
            maintenance_cron: scheduler.maintenance_cron,
            startup_delay: Duration::from_secs(scheduler.startup_delay_secs),
            run_startup_pass: true,
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&SchedulerConfig> for GoalSchedulerConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            daily_goal_cron: config.daily_goal_cron.clone(),
            recommendation_cron: config.recommendation_cron.clone(),
            maintenance_cron: config.maintenance_cron.clone(),
            startup_delay: Duration::from_secs(config.startup_delay_secs),
            ..Self::default()
        }
    }
}

/// Goal scheduler with explicit lifecycle management.
pub struct GoalScheduler {
    scheduler: Arc<RwLock<Option<JobScheduler>>>,
    config: GoalSchedulerConfig,
    context: Arc<JobContext>,
    monitor_handle: Option<JoinHandle<()>>,
    startup_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
}

impl GoalScheduler {
    /// Create a scheduler over the given job context.
    pub fn new(config: GoalSchedulerConfig, context: Arc<JobContext>) -> Self {
        Self {
            scheduler: Arc::new(RwLock::new(None)),
            config,
            context,
            monitor_handle: None,
            startup_handle: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Start the scheduler, registering all jobs and spawning the eager
    /// startup pass.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
            .map_err(|e| SchedulerError::StartFailed(e.to_string()))?;

        {
            let mut guard = self.scheduler.write().await;
            *guard = Some(scheduler_instance);
        }

        let cancel = self.cancellation.clone();
        self.monitor_handle = Some(tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("Goal scheduler monitor cancelled");
        }));

        if self.config.run_startup_pass {
            let context = Arc::clone(&self.context);
            let delay = self.config.startup_delay;
            let cancel = self.cancellation.clone();
            self.startup_handle = Some(tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Startup pass cancelled before running");
                    }
                    _ = tokio::time::sleep(delay) => {
                        info!("Running eager startup pass");
                        context.run_daily_goals(BatchMode::BackfillMissing).await;
                        context.run_maintenance().await;
                    }
                }
            }));
        }

        info!("Goal scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for spawned tasks to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let scheduler = {
            let mut guard = self.scheduler.write().await;
            guard.take()
        };

        let mut scheduler = match scheduler {
            Some(scheduler) => scheduler,
            None => return Err(SchedulerError::NotRunning),
        };

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
            .map_err(|e| SchedulerError::StopFailed(e.to_string()))?;

        let join_timeout = self.config.join_timeout;
        for handle in [self.monitor_handle.take(), self.startup_handle.take()]
            .into_iter()
            .flatten()
        {
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("Goal scheduler stopped");
        Ok(())
    }

    /// Returns true when the monitor task is active.
    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Read-only snapshot of every job kind's run state, for the status
    /// query surface.
    pub fn job_status(&self) -> Vec<JobStatus> {
        self.context.registry.snapshot()
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::CreationFailed(e.to_string()))?;

        let jobs: [(&str, &str, fn(Arc<JobContext>) -> JobFuture); 3] = [
            ("daily_goals", self.config.daily_goal_cron.as_str(), |context| {
                Box::pin(async move { context.run_daily_goals(BatchMode::Refresh).await })
            }),
            ("recommendations", self.config.recommendation_cron.as_str(), |context| {
                Box::pin(async move { context.run_recommendations().await })
            }),
            ("maintenance", self.config.maintenance_cron.as_str(), |context| {
                Box::pin(async move { context.run_maintenance().await })
            }),
        ];

        for (name, cron_expr, body) in jobs {
            let context = Arc::clone(&self.context);
            let job = Job::new_async(cron_expr, move |_id, _lock| {
                let context = Arc::clone(&context);
                body(context)
            })
            .map_err(|e| {
                SchedulerError::JobRegistrationFailed(format!("{name} ({cron_expr}): {e}"))
            })?;

            let job_id = job.guid();
            scheduler
                .add(job)
                .await
                .map_err(|e| SchedulerError::JobRegistrationFailed(format!("{name}: {e}")))?;

            debug!(job = name, cron = cron_expr, job_id = %job_id, "Registered job");
        }

        Ok(scheduler)
    }
}

type JobFuture = std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>;

impl Drop for GoalScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("GoalScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
