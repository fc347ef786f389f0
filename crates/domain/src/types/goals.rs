//! Goal materialization model types
//!
//! These types represent the materialized daily targets, batch run
//! accounting, scheduler bookkeeping, and maintenance reports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Computed nutrition targets, before persistence
///
/// Pure output of the goal calculator: no identity, no timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalTargets {
    pub calories: i32,
    pub protein_g: i32,
    pub carbs_g: i32,
    pub fats_g: i32,
    pub fiber_g: i32,
    pub sodium_mg: i32,
    pub sugar_g: i32,
    pub water_ml: i32,
}

/// Materialized daily nutrition target
///
/// Exactly one row exists per (user_id, goal_date); the uniqueness is
/// enforced by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyGoal {
    pub id: String,
    pub user_id: String,
    pub goal_date: NaiveDate,
    pub calories: i32,
    pub protein_g: i32,
    pub carbs_g: i32,
    pub fats_g: i32,
    pub fiber_g: i32,
    pub sodium_mg: i32,
    pub sugar_g: i32,
    pub water_ml: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DailyGoal {
    /// Targets currently stored on this row.
    pub fn targets(&self) -> GoalTargets {
        GoalTargets {
            calories: self.calories,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fats_g: self.fats_g,
            fiber_g: self.fiber_g,
            sodium_mg: self.sodium_mg,
            sugar_g: self.sugar_g,
            water_ml: self.water_ml,
        }
    }
}

/// How the batch orchestrator treats users that already hold a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Recompute and overwrite every user's target
    Refresh,
    /// Skip users that already hold a row for the run date
    BackfillMissing,
}

/// Outcome classification for a single user within a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Created,
    Updated,
    Skipped,
    Error,
}

/// Per-user detail entry of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOutcome {
    pub user_id: String,
    pub outcome: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UserOutcome {
    pub fn created(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), outcome: OutcomeKind::Created, message: None }
    }

    pub fn updated(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), outcome: OutcomeKind::Updated, message: None }
    }

    pub fn skipped(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), outcome: OutcomeKind::Skipped, message: None }
    }

    pub fn error(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            outcome: OutcomeKind::Error,
            message: Some(message.into()),
        }
    }
}

/// Aggregated result of one batch orchestrator pass
///
/// Invariant: created + updated + skipped + error count equals the number
/// of users examined in the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRunResult {
    pub run_date: NaiveDate,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub details: Vec<UserOutcome>,
}

impl BatchRunResult {
    pub fn new(run_date: NaiveDate) -> Self {
        Self { run_date, created: 0, updated: 0, skipped: 0, details: Vec::new() }
    }

    /// Record one user outcome, keeping counters and details in sync.
    pub fn record(&mut self, detail: UserOutcome) {
        match detail.outcome {
            OutcomeKind::Created => self.created += 1,
            OutcomeKind::Updated => self.updated += 1,
            OutcomeKind::Skipped => self.skipped += 1,
            OutcomeKind::Error => {}
        }
        self.details.push(detail);
    }

    pub fn error_count(&self) -> usize {
        self.details.iter().filter(|d| d.outcome == OutcomeKind::Error).count()
    }

    pub fn has_errors(&self) -> bool {
        self.details.iter().any(|d| d.outcome == OutcomeKind::Error)
    }

    /// Total users examined: created + updated + skipped + errors.
    pub fn users_examined(&self) -> usize {
        self.created + self.updated + self.skipped + self.error_count()
    }
}

/// Job kinds managed by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    DailyGoals,
    Recommendations,
    Maintenance,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyGoals => "daily_goals",
            Self::Recommendations => "recommendations",
            Self::Maintenance => "maintenance",
        }
    }
}

/// Read-only snapshot of one job kind's run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub kind: JobKind,
    pub running: bool,
    /// Unix timestamp of the last completed run, if any
    pub last_completed: Option<i64>,
}

/// Free-text (or fallback) recommendation row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub source: RecommendationSource,
    pub created_at: i64,
}

/// Where a recommendation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Model,
    Fallback,
}

impl RecommendationSource {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "model" => Some(Self::Model),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Fallback => "fallback",
        }
    }
}

/// Storage health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageHealthStatus {
    Healthy,
    Warning,
    Critical,
}

/// Output of the maintenance health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageHealthReport {
    pub status: StorageHealthStatus,
    pub needs_cleanup: bool,
    pub expired_sessions: u64,
    pub stale_recommendations: u64,
    pub expired_goals: u64,
}

impl StorageHealthReport {
    /// Total count of rows past their retention window.
    pub fn stale_rows(&self) -> u64 {
        self.expired_sessions + self.stale_recommendations + self.expired_goals
    }
}

/// Statistics from one cleanup operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupStats {
    pub goals_deleted: usize,
    pub recommendations_deleted: usize,
    pub sessions_deleted: usize,
    pub duration_secs: f64,
}

impl CleanupStats {
    pub fn total_deleted(&self) -> usize {
        self.goals_deleted + self.recommendations_deleted + self.sessions_deleted
    }
}
