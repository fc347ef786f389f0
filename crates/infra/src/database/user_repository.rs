//! User directory and profile repository implementations using SQLite
//!
//! Both tables are owned by external collaborators (account service, profile
//! editor); this core only reads them.

use std::sync::Arc;

use async_trait::async_trait;
use macroplan_core::goals::ports::{ProfileRepository, UserDirectory};
use macroplan_domain::{
    ActivityLevel, MainGoal, Result as DomainResult, UserAccount, UserProfile,
};
use rusqlite::{params, Row};
use tokio::task;

use super::daily_goal_repository::map_join_error;
use super::manager::{map_sql_error, DbManager};

/// SQLite-backed implementation of `UserDirectory` and `ProfileRepository`
pub struct SqliteUserRepository {
    db: Arc<DbManager>,
}

impl SqliteUserRepository {
    /// Create a new repository instance
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for SqliteUserRepository {
    async fn list_users(&self) -> DomainResult<Vec<UserAccount>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<UserAccount>> {
            let conn = db.get_connection()?;

            let mut stmt = conn
                .prepare(
                    "SELECT id, email, profile_completed FROM users
                     WHERE is_active = 1
                     ORDER BY created_at ASC",
                )
                .map_err(map_sql_error)?;

            let users = stmt
                .query_map([], map_user_row)
                .map_err(map_sql_error)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(map_sql_error)?;

            Ok(users)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl ProfileRepository for SqliteUserRepository {
    async fn latest_profile(&self, user_id: &str) -> DomainResult<Option<UserProfile>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<UserProfile>> {
            let conn = db.get_connection()?;

            let result = conn.query_row(
                "SELECT id, user_id, weight_kg, height_cm, age, sex, activity_level,
                        main_goal, dietary_style, created_at, updated_at
                 FROM user_profiles
                 WHERE user_id = ?1
                 ORDER BY created_at DESC
                 LIMIT 1",
                params![&user_id],
                map_profile_row,
            );

            match result {
                Ok(profile) => Ok(Some(profile)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(err) => Err(map_sql_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<UserAccount> {
    Ok(UserAccount {
        id: row.get(0)?,
        email: row.get(1)?,
        profile_completed: row.get::<_, i64>(2)? != 0,
    })
}

/// Map a row to a UserProfile
///
/// Unrecognized activity or goal strings decode to `None`; the calculator
/// applies the documented defaults.
fn map_profile_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    let activity_level: Option<String> = row.get(6)?;
    let main_goal: Option<String> = row.get(7)?;

    Ok(UserProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        weight_kg: row.get(2)?,
        height_cm: row.get(3)?,
        age: row.get(4)?,
        sex: row.get(5)?,
        activity_level: activity_level.as_deref().and_then(ActivityLevel::parse),
        main_goal: main_goal.as_deref().and_then(MainGoal::parse),
        dietary_style: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
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
        let manager = DbManager::new(&db_path, 4).expect("create db manager");
        manager.run_migrations().expect("run migrations");
        (Arc::new(manager), temp_dir)
    }

    fn seed_user(db: &DbManager, id: &str, active: bool, created_at: i64) {
        let conn = db.get_connection().expect("connection");
        conn.execute(
            "INSERT INTO users (id, email, profile_completed, is_active, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?4, ?4)",
            params![id, format!("{id}@example.com"), active as i64, created_at],
        )
        .expect("seed user");
    }

    fn seed_profile(db: &DbManager, user_id: &str, activity: &str, created_at: i64) {
        let conn = db.get_connection().expect("connection");
        conn.execute(
            "INSERT INTO user_profiles (id, user_id, weight_kg, height_cm, age, sex,
                                        activity_level, main_goal, dietary_style,
                                        created_at, updated_at)
             VALUES (?1, ?2, 70.0, 170.0, 25, 'male', ?3, 'weight_loss', NULL, ?4, ?4)",
            params![format!("profile-{user_id}-{created_at}"), user_id, activity, created_at],
        )
        .expect("seed profile");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_users_returns_active_users_in_creation_order() {
        let (db, _temp_dir) = setup_test_db();
        seed_user(&db, "user-b", true, 200);
        seed_user(&db, "user-a", true, 100);
        seed_user(&db, "user-c", false, 300);

        let repo = SqliteUserRepository::new(db);
        let users = repo.list_users().await.expect("list users");

        let ids: Vec<&str> = users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["user-a", "user-b"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn latest_profile_picks_most_recent_row() {
        let (db, _temp_dir) = setup_test_db();
        seed_user(&db, "user-1", true, 100);
        seed_profile(&db, "user-1", "light", 100);
        seed_profile(&db, "user-1", "high", 200);

        let repo = SqliteUserRepository::new(db);
        let profile =
            repo.latest_profile("user-1").await.expect("lookup").expect("profile exists");

        assert_eq!(profile.activity_level, Some(ActivityLevel::High));
        assert_eq!(profile.main_goal, Some(MainGoal::WeightLoss));
        assert_eq!(profile.weight_kg, Some(70.0));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_profile_returns_none() {
        let (db, _temp_dir) = setup_test_db();
        seed_user(&db, "user-1", true, 100);

        let repo = SqliteUserRepository::new(db);
        let profile = repo.latest_profile("user-1").await.expect("lookup");
        assert!(profile.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unrecognized_enum_strings_decode_to_none() {
        let (db, _temp_dir) = setup_test_db();
        seed_user(&db, "user-1", true, 100);
        seed_profile(&db, "user-1", "extreme", 100);

        let repo = SqliteUserRepository::new(db);
        let profile =
            repo.latest_profile("user-1").await.expect("lookup").expect("profile exists");

        assert_eq!(profile.activity_level, None);
    }
}
