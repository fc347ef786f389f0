//! Database implementations

pub mod daily_goal_repository;
pub mod manager;
pub mod recommendation_repository;
pub mod user_repository;

pub use daily_goal_repository::SqliteDailyGoalRepository;
pub use manager::{DbConnection, DbManager};
pub use recommendation_repository::SqliteRecommendationRepository;
pub use user_repository::SqliteUserRepository;
