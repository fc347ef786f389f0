//! Port interfaces for goal materialization
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations for goal operations.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use macroplan_domain::{DailyGoal, GoalTargets, Result, UserAccount, UserProfile};

/// Trait for enumerating the user population
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// List every user account known to the service
    async fn list_users(&self) -> Result<Vec<UserAccount>>;
}

/// Trait for reading user biometric profiles
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Get the most recent profile for a user, if one exists
    async fn latest_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
}

/// Trait for daily goal persistence
///
/// Implementations must enforce the one-row-per-(user, date) invariant at
/// the storage layer; callers never perform a check-then-act sequence.
#[async_trait]
pub trait DailyGoalRepository: Send + Sync {
    /// Get the goal row for a user and date, if one exists
    async fn get(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyGoal>>;

    /// Atomically insert or overwrite the goal row for (user, date) and
    /// return the stored row
    async fn upsert(
        &self,
        user_id: &str,
        date: NaiveDate,
        targets: &GoalTargets,
    ) -> Result<DailyGoal>;

    /// Ids of all users that already hold a goal row for the given date
    async fn user_ids_for_date(&self, date: NaiveDate) -> Result<HashSet<String>>;
}
