//! Domain types and models

pub mod goals;

use serde::{Deserialize, Serialize};

// Re-export goal types for convenience
pub use goals::{
    BatchMode, BatchRunResult, CleanupStats, DailyGoal, GoalTargets, JobKind, JobStatus,
    OutcomeKind, Recommendation, RecommendationSource, StorageHealthReport, StorageHealthStatus,
    UserOutcome,
};

/// User account row as exposed by the population source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub profile_completed: bool,
}

/// Self-reported activity level used by the target calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    None,
    Light,
    Moderate,
    High,
}

impl ActivityLevel {
    /// Decode a stored string. Unrecognized values yield `None` so callers
    /// can apply the documented default.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "light" => Some(Self::Light),
            "moderate" => Some(Self::Moderate),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

/// Primary nutrition goal driving the calorie adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MainGoal {
    Maintenance,
    WeightLoss,
    WeightGain,
    SportsPerformance,
}

impl MainGoal {
    /// Decode a stored string. Unrecognized values yield `None` so callers
    /// can fall back to maintenance semantics.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "maintenance" => Some(Self::Maintenance),
            "weightloss" => Some(Self::WeightLoss),
            "weightgain" => Some(Self::WeightGain),
            "sportsperformance" => Some(Self::SportsPerformance),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maintenance => "maintenance",
            Self::WeightLoss => "weight_loss",
            Self::WeightGain => "weight_gain",
            Self::SportsPerformance => "sports_performance",
        }
    }
}

/// Biometric/preference snapshot used for target calculation
///
/// Owned by the user-profile collaborator and read-only to this core. Any
/// field may be missing; the calculator applies documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserProfile {
    pub id: String,
    pub user_id: String,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub age: Option<i32>,
    pub sex: Option<String>,
    pub activity_level: Option<ActivityLevel>,
    pub main_goal: Option<MainGoal>,
    pub dietary_style: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
