//! Port interfaces for recommendation generation

use async_trait::async_trait;
use macroplan_domain::{Recommendation, Result};

/// Trait for the optional text-generation collaborator
///
/// Implementations may be unavailable or fail; callers fall back to the
/// deterministic recommendation set.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate free text for the given prompt
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Trait for recommendation persistence
#[async_trait]
pub trait RecommendationRepository: Send + Sync {
    /// Persist a recommendation row
    async fn save(&self, recommendation: &Recommendation) -> Result<()>;

    /// Most recent recommendation for a user, if any
    async fn latest_for_user(&self, user_id: &str) -> Result<Option<Recommendation>>;
}
