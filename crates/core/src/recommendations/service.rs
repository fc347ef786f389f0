//! Recommendation service - core business logic
//!
//! Consumes the optional text-generation collaborator. When the generator
//! is absent, fails, or returns empty text, a deterministic fallback set
//! keyed by the user's main goal is used instead, so the pass always
//! produces a stored recommendation.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use macroplan_domain::{
    MainGoal, Recommendation, RecommendationSource, Result, UserProfile,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::goals::ports::{DailyGoalRepository, ProfileRepository, UserDirectory};

use super::ports::{RecommendationRepository, TextGenerator};

const GENERATION_MAX_TOKENS: u32 = 300;

/// Recommendation service
pub struct RecommendationService {
    users: Arc<dyn UserDirectory>,
    profiles: Arc<dyn ProfileRepository>,
    goals: Arc<dyn DailyGoalRepository>,
    store: Arc<dyn RecommendationRepository>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl RecommendationService {
    /// Create a new recommendation service without a text generator
    pub fn new(
        users: Arc<dyn UserDirectory>,
        profiles: Arc<dyn ProfileRepository>,
        goals: Arc<dyn DailyGoalRepository>,
        store: Arc<dyn RecommendationRepository>,
    ) -> Self {
        Self { users, profiles, goals, store, generator: None }
    }

    /// Attach the optional text-generation collaborator
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Generate and persist a recommendation for one user
    pub async fn generate_for_user(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Recommendation> {
        let profile = self.profiles.latest_profile(user_id).await?;

        let (content, source) = match &self.generator {
            Some(generator) => {
                let goal = self.goals.get(user_id, date).await?;
                let prompt = build_prompt(profile.as_ref(), goal.as_ref().map(|g| g.calories));
                match generator.generate(&prompt, GENERATION_MAX_TOKENS).await {
                    Ok(text) if !text.trim().is_empty() => {
                        (text.trim().to_string(), RecommendationSource::Model)
                    }
                    Ok(_) => {
                        debug!(user_id = %user_id, "Generator returned empty text; using fallback");
                        (fallback_content(&profile), RecommendationSource::Fallback)
                    }
                    Err(err) => {
                        warn!(user_id = %user_id, error = %err, "Text generation failed; using fallback");
                        (fallback_content(&profile), RecommendationSource::Fallback)
                    }
                }
            }
            None => (fallback_content(&profile), RecommendationSource::Fallback),
        };

        let recommendation = Recommendation {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            content,
            source,
            created_at: Utc::now().timestamp(),
        };

        self.store.save(&recommendation).await?;
        Ok(recommendation)
    }

    /// Generate recommendations for every user with a completed profile.
    ///
    /// Per-user failures are logged and excluded from the returned count;
    /// they never abort the pass.
    pub async fn run_population(&self, date: NaiveDate) -> Result<usize> {
        let users = self.users.list_users().await?;

        let mut generated = 0usize;
        for user in users.iter().filter(|u| u.profile_completed) {
            match self.generate_for_user(&user.id, date).await {
                Ok(recommendation) => {
                    debug!(
                        user_id = %user.id,
                        source = recommendation.source.as_str(),
                        "Recommendation stored"
                    );
                    generated += 1;
                }
                Err(err) => {
                    warn!(user_id = %user.id, error = %err, "Recommendation generation failed");
                }
            }
        }

        info!(generated, total = users.len(), "Recommendation pass completed");
        Ok(generated)
    }
}

fn build_prompt(profile: Option<&UserProfile>, calories: Option<i32>) -> String {
    let mut prompt = String::from(
        "Write three short, practical nutrition tips for a user of a meal-tracking app.\n",
    );

    if let Some(profile) = profile {
        if let Some(goal) = profile.main_goal {
            prompt.push_str(&format!("Main goal: {}.\n", goal.as_str()));
        }
        if let Some(level) = profile.activity_level {
            prompt.push_str(&format!("Activity level: {}.\n", level.as_str()));
        }
        if let Some(style) = &profile.dietary_style {
            prompt.push_str(&format!("Dietary style: {style}.\n"));
        }
    }

    if let Some(calories) = calories {
        prompt.push_str(&format!("Daily calorie target: {calories} kcal.\n"));
    }

    prompt.push_str("Answer as a plain list, one tip per line.");
    prompt
}

/// Deterministic fallback recommendations, keyed by the user's main goal.
fn fallback_content(profile: &Option<UserProfile>) -> String {
    let goal = profile.as_ref().and_then(|p| p.main_goal).unwrap_or(MainGoal::Maintenance);
    let tips: [&str; 3] = match goal {
        MainGoal::WeightLoss => [
            "Prioritize protein at every meal to preserve muscle while in a deficit.",
            "Fill half your plate with vegetables to stay full on fewer calories.",
            "Plan meals ahead; most overshooting happens on unplanned snacks.",
        ],
        MainGoal::WeightGain => [
            "Add calorie-dense foods like nuts, oats and olive oil to regular meals.",
            "Eat on a schedule; appetite alone under-delivers in a surplus.",
            "Pair your surplus with resistance training so the gain is lean mass.",
        ],
        MainGoal::SportsPerformance => [
            "Center carbohydrates around training sessions for performance and recovery.",
            "Spread protein evenly across the day, not in one large meal.",
            "Rehydrate with electrolytes after long or intense sessions.",
        ],
        MainGoal::Maintenance => [
            "Keep consistent meal times; routine makes maintenance nearly automatic.",
            "Weigh in weekly, not daily, and act on the trend rather than the noise.",
            "Favor whole foods; they regulate appetite better than processed ones.",
        ],
    };
    tips.join("\n")
}
