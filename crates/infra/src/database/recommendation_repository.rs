//! Recommendation repository implementation using SQLite

use std::sync::Arc;

use async_trait::async_trait;
use macroplan_core::recommendations::ports::RecommendationRepository as RecommendationRepositoryPort;
use macroplan_domain::{Recommendation, RecommendationSource, Result as DomainResult};
use rusqlite::{params, Row};
use tokio::task;

use super::daily_goal_repository::map_join_error;
use super::manager::{map_sql_error, DbManager};

/// SQLite-backed implementation of `RecommendationRepository`
pub struct SqliteRecommendationRepository {
    db: Arc<DbManager>,
}

impl SqliteRecommendationRepository {
    /// Create a new repository instance
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecommendationRepositoryPort for SqliteRecommendationRepository {
    async fn save(&self, recommendation: &Recommendation) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let recommendation = recommendation.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO recommendations (id, user_id, content, source, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    &recommendation.id,
                    &recommendation.user_id,
                    &recommendation.content,
                    recommendation.source.as_str(),
                    recommendation.created_at,
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn latest_for_user(&self, user_id: &str) -> DomainResult<Option<Recommendation>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<Recommendation>> {
            let conn = db.get_connection()?;

            let result = conn.query_row(
                "SELECT id, user_id, content, source, created_at
                 FROM recommendations
                 WHERE user_id = ?1
                 ORDER BY created_at DESC
                 LIMIT 1",
                params![&user_id],
                map_recommendation_row,
            );

            match result {
                Ok(recommendation) => Ok(Some(recommendation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(err) => Err(map_sql_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }
}

/// Map a row to a Recommendation
fn map_recommendation_row(row: &Row<'_>) -> rusqlite::Result<Recommendation> {
    let raw_source: String = row.get(3)?;
    // Unknown source strings fold into the fallback bucket
    let source = RecommendationSource::parse(&raw_source).unwrap_or(RecommendationSource::Fallback);

    Ok(Recommendation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        source,
        created_at: row.get(4)?,
    })
}
