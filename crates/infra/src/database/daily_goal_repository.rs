//! Daily goal repository implementation using SQLite
//!
//! Provides the idempotent per-(user, date) goal store. The single upsert
//! statement leans on the UNIQUE(user_id, goal_date) index; there is no
//! application-level existence check anywhere on the write path.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use macroplan_core::goals::ports::DailyGoalRepository as DailyGoalRepositoryPort;
use macroplan_domain::{DailyGoal, GoalTargets, MacroPlanError, Result as DomainResult};
use rusqlite::{params, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_sql_error, DbManager};

const GOAL_COLUMNS: &str = "id, user_id, goal_date, calories, protein_g, carbs_g, fats_g,
                            fiber_g, sodium_mg, sugar_g, water_ml, created_at, updated_at";

/// SQLite-backed implementation of `DailyGoalRepository`
pub struct SqliteDailyGoalRepository {
    db: Arc<DbManager>,
}

impl SqliteDailyGoalRepository {
    /// Create a new repository instance
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DailyGoalRepositoryPort for SqliteDailyGoalRepository {
    async fn get(&self, user_id: &str, date: NaiveDate) -> DomainResult<Option<DailyGoal>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<DailyGoal>> {
            let conn = db.get_connection()?;

            let result = conn.query_row(
                &format!("SELECT {GOAL_COLUMNS} FROM daily_goals WHERE user_id = ?1 AND goal_date = ?2"),
                params![&user_id, date.to_string()],
                map_goal_row,
            );

            match result {
                Ok(goal) => Ok(Some(goal)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(err) => Err(map_sql_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn upsert(
        &self,
        user_id: &str,
        date: NaiveDate,
        targets: &GoalTargets,
    ) -> DomainResult<DailyGoal> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let targets = *targets;

        task::spawn_blocking(move || -> DomainResult<DailyGoal> {
            let conn = db.get_connection()?;
            let now = Utc::now().timestamp();
            let id = Uuid::new_v4().to_string();

            // Insert-or-overwrite in one statement; the unique index arbitrates
            // concurrent writers. Row id and created_at survive a conflict.
            conn.execute(
                "INSERT INTO daily_goals (
                    id, user_id, goal_date, calories, protein_g, carbs_g, fats_g,
                    fiber_g, sodium_mg, sugar_g, water_ml, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(user_id, goal_date) DO UPDATE SET
                    calories = excluded.calories,
                    protein_g = excluded.protein_g,
                    carbs_g = excluded.carbs_g,
                    fats_g = excluded.fats_g,
                    fiber_g = excluded.fiber_g,
                    sodium_mg = excluded.sodium_mg,
                    sugar_g = excluded.sugar_g,
                    water_ml = excluded.water_ml,
                    updated_at = excluded.updated_at",
                params![
                    &id,
                    &user_id,
                    date.to_string(),
                    targets.calories,
                    targets.protein_g,
                    targets.carbs_g,
                    targets.fats_g,
                    targets.fiber_g,
                    targets.sodium_mg,
                    targets.sugar_g,
                    targets.water_ml,
                    now,
                    now,
                ],
            )
            .map_err(map_sql_error)?;

            // Read back the stored row so callers can verify the write
            conn.query_row(
                &format!("SELECT {GOAL_COLUMNS} FROM daily_goals WHERE user_id = ?1 AND goal_date = ?2"),
                params![&user_id, date.to_string()],
                map_goal_row,
            )
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn user_ids_for_date(&self, date: NaiveDate) -> DomainResult<HashSet<String>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<HashSet<String>> {
            let conn = db.get_connection()?;

            let mut stmt = conn
                .prepare("SELECT user_id FROM daily_goals WHERE goal_date = ?1")
                .map_err(map_sql_error)?;

            let ids = stmt
                .query_map(params![date.to_string()], |row| row.get::<_, String>(0))
                .map_err(map_sql_error)?
                .collect::<std::result::Result<HashSet<String>, _>>()
                .map_err(map_sql_error)?;

            Ok(ids)
        })
        .await
        .map_err(map_join_error)?
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Map a row to a DailyGoal
fn map_goal_row(row: &Row<'_>) -> rusqlite::Result<DailyGoal> {
    let raw_date: String = row.get(2)?;
    let goal_date = raw_date.parse::<NaiveDate>().map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(err))
    })?;

    Ok(DailyGoal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        goal_date,
        calories: row.get(3)?,
        protein_g: row.get(4)?,
        carbs_g: row.get(5)?,
        fats_g: row.get(6)?,
        fiber_g: row.get(7)?,
        sodium_mg: row.get(8)?,
        sugar_g: row.get(9)?,
        water_ml: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub(crate) fn map_join_error(err: task::JoinError) -> MacroPlanError {
    MacroPlanError::Internal(format!("blocking database task failed: {err}"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn setup_test_db() -> (Arc<DbManager>, TempDir) {
        let temp_dir = TempDir::new().expect("create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let manager = DbManager::new(&db_path, 5).expect("create db manager");
        manager.run_migrations().expect("run migrations");
        (Arc::new(manager), temp_dir)
    }

    fn targets() -> GoalTargets {
        GoalTargets {
            calories: 2046,
            protein_g: 112,
            carbs_g: 230,
            fats_g: 68,
            fiber_g: 26,
            sodium_mg: 2300,
            sugar_g: 51,
            water_ml: 2450,
        }
    }

    fn goal_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
    }

    fn row_count(db: &DbManager) -> i64 {
        let conn = db.get_connection().expect("connection");
        conn.query_row("SELECT COUNT(*) FROM daily_goals", [], |r| r.get(0)).expect("count")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_then_get_round_trips() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteDailyGoalRepository::new(Arc::clone(&db));

        let stored = repo.upsert("user-1", goal_date(), &targets()).await.expect("upsert");
        assert_eq!(stored.user_id, "user-1");
        assert_eq!(stored.goal_date, goal_date());
        assert_eq!(stored.targets(), targets());

        let fetched = repo.get("user-1", goal_date()).await.expect("get").expect("row exists");
        assert_eq!(fetched.id, stored.id);
        assert_eq!(fetched.targets(), targets());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_missing_row_returns_none() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteDailyGoalRepository::new(db);

        let fetched = repo.get("nobody", goal_date()).await.expect("get");
        assert!(fetched.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn repeated_upsert_keeps_exactly_one_row() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteDailyGoalRepository::new(Arc::clone(&db));

        let first = repo.upsert("user-1", goal_date(), &targets()).await.expect("first upsert");

        let mut changed = targets();
        changed.calories = 1900;
        let second = repo.upsert("user-1", goal_date(), &changed).await.expect("second upsert");

        assert_eq!(row_count(&db), 1);
        // Identity and creation time survive the conflict; targets are overwritten
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.calories, 1900);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn same_user_different_dates_are_distinct_rows() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteDailyGoalRepository::new(Arc::clone(&db));

        let other_date = NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date");
        repo.upsert("user-1", goal_date(), &targets()).await.expect("day one");
        repo.upsert("user-1", other_date, &targets()).await.expect("day two");

        assert_eq!(row_count(&db), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn user_ids_for_date_reflects_rows_for_that_date_only() {
        let (db, _temp_dir) = setup_test_db();
        let repo = SqliteDailyGoalRepository::new(db);

        let other_date = NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date");
        repo.upsert("user-1", goal_date(), &targets()).await.expect("upsert");
        repo.upsert("user-2", goal_date(), &targets()).await.expect("upsert");
        repo.upsert("user-3", other_date, &targets()).await.expect("upsert");

        let ids = repo.user_ids_for_date(goal_date()).await.expect("snapshot");
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("user-1"));
        assert!(ids.contains("user-2"));
        assert!(!ids.contains("user-3"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_upserts_converge_to_one_row() {
        let (db, _temp_dir) = setup_test_db();
        let repo = Arc::new(SqliteDailyGoalRepository::new(Arc::clone(&db)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.upsert("user-1", goal_date(), &targets()).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("upsert succeeds");
        }

        assert_eq!(row_count(&db), 1);
    }
}
