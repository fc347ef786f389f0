//! Goal materialization service - core business logic
//!
//! Orchestrates the population-wide daily goal batch: enumerate users,
//! compute targets, upsert, and classify outcomes against a pre-run
//! snapshot. Per-user failures are isolated; the batch always runs to
//! completion.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use macroplan_domain::{
    BatchConfig, BatchMode, BatchRunResult, DailyGoal, MacroPlanError, Result, UserOutcome,
};
use tracing::{debug, info, instrument, warn};

use super::calculator;
use super::ports::{DailyGoalRepository, ProfileRepository, UserDirectory};

/// Goal materialization service
pub struct GoalService {
    users: Arc<dyn UserDirectory>,
    profiles: Arc<dyn ProfileRepository>,
    goals: Arc<dyn DailyGoalRepository>,
    config: BatchConfig,
}

impl GoalService {
    /// Create a new goal service with the default batch configuration
    pub fn new(
        users: Arc<dyn UserDirectory>,
        profiles: Arc<dyn ProfileRepository>,
        goals: Arc<dyn DailyGoalRepository>,
    ) -> Self {
        Self { users, profiles, goals, config: BatchConfig::default() }
    }

    /// Override the batch configuration
    pub fn with_batch_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Materialize the daily goal for every user.
    ///
    /// Users are processed in bounded worker groups with a short pause
    /// between groups. Created vs updated is classified against a single
    /// pre-run snapshot of the rows already present for `date`, so results
    /// stay consistent even though work inside a group is concurrent.
    ///
    /// # Errors
    ///
    /// Returns an error only when the population or the pre-run snapshot
    /// cannot be read. Per-user failures are recorded as error details and
    /// never abort the batch.
    #[instrument(skip(self), fields(date = %date))]
    pub async fn run_daily_batch(&self, date: NaiveDate, mode: BatchMode) -> Result<BatchRunResult> {
        let users = self.users.list_users().await?;
        let existing = Arc::new(self.goals.user_ids_for_date(date).await?);

        info!(user_count = users.len(), mode = ?mode, "Starting daily goal batch");

        let mut result = BatchRunResult::new(date);
        let concurrency = self.config.concurrency.max(1);
        let pause = Duration::from_millis(self.config.pause_ms);

        for (group_idx, group) in users.chunks(concurrency).enumerate() {
            if group_idx > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }

            let mut handles = Vec::with_capacity(group.len());
            for user in group {
                if mode == BatchMode::BackfillMissing && existing.contains(&user.id) {
                    debug!(user_id = %user.id, "Goal already materialized; skipping");
                    result.record(UserOutcome::skipped(&user.id));
                    continue;
                }

                let profiles = Arc::clone(&self.profiles);
                let goals = Arc::clone(&self.goals);
                let snapshot = Arc::clone(&existing);
                let user_id = user.id.clone();

                handles.push((
                    user.id.clone(),
                    tokio::spawn(async move {
                        materialize_outcome(profiles, goals, snapshot, user_id, date).await
                    }),
                ));
            }

            for (user_id, handle) in handles {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        warn!(user_id = %user_id, error = %err, "Goal worker task failed");
                        UserOutcome::error(user_id, format!("task join failed: {err}"))
                    }
                };
                result.record(outcome);
            }
        }

        info!(
            created = result.created,
            updated = result.updated,
            skipped = result.skipped,
            errors = result.error_count(),
            "Daily goal batch completed"
        );

        Ok(result)
    }

    /// Materialize the goal for a single user (manual trigger surface).
    ///
    /// # Errors
    ///
    /// Propagates storage failures and reports a verification error when
    /// the stored row does not echo the computed targets.
    pub async fn materialize_user(&self, user_id: &str, date: NaiveDate) -> Result<DailyGoal> {
        let profile = self.profiles.latest_profile(user_id).await?;
        let targets = calculator::compute(profile.as_ref());
        let stored = self.goals.upsert(user_id, date, &targets).await?;

        if stored.targets() != targets {
            return Err(MacroPlanError::Verification(format!(
                "stored goal for user {user_id} does not match computed targets"
            )));
        }

        Ok(stored)
    }

    /// Get the goal for (user, date), materializing it on first access.
    pub async fn get_or_create(&self, user_id: &str, date: NaiveDate) -> Result<DailyGoal> {
        if let Some(goal) = self.goals.get(user_id, date).await? {
            return Ok(goal);
        }
        self.materialize_user(user_id, date).await
    }
}

/// Process one user and classify the outcome. Never returns an error; every
/// failure path folds into an error detail for the run result.
async fn materialize_outcome(
    profiles: Arc<dyn ProfileRepository>,
    goals: Arc<dyn DailyGoalRepository>,
    snapshot: Arc<HashSet<String>>,
    user_id: String,
    date: NaiveDate,
) -> UserOutcome {
    // Absent profile is valid; the calculator applies defaults
    let profile = match profiles.latest_profile(&user_id).await {
        Ok(profile) => profile,
        Err(err) => {
            warn!(user_id = %user_id, error = %err, "Profile lookup failed");
            return UserOutcome::error(user_id, format!("profile lookup failed: {err}"));
        }
    };

    let targets = calculator::compute(profile.as_ref());

    let stored = match goals.upsert(&user_id, date, &targets).await {
        Ok(stored) => stored,
        Err(err) => {
            warn!(user_id = %user_id, error = %err, "Goal upsert failed");
            return UserOutcome::error(user_id, format!("goal upsert failed: {err}"));
        }
    };

    // Read-back verification: a mismatch signals a storage-layer bug and is
    // surfaced instead of retried
    if stored.targets() != targets {
        warn!(user_id = %user_id, "Stored goal does not match computed targets");
        return UserOutcome::error(
            user_id,
            "verification mismatch: stored goal does not match computed targets",
        );
    }

    if snapshot.contains(&user_id) {
        UserOutcome::updated(user_id)
    } else {
        UserOutcome::created(user_id)
    }
}
