//! End-to-end integration coverage for the goal materialization pipeline.
//!
//! These tests exercise the real workspace schema: seeded users and
//! profiles, the batch orchestrator over SQLite repositories, idempotent
//! re-runs, the maintenance monitor, and the recommendation fallback path.
//! Each test operates on an isolated database with migrations applied.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use macroplan_core::{GoalService, RecommendationService};
use macroplan_domain::{BatchConfig, BatchMode, OutcomeKind, RecommendationSource};
use macroplan_infra::database::{
    DbManager, SqliteDailyGoalRepository, SqliteRecommendationRepository, SqliteUserRepository,
};
use macroplan_infra::maintenance::MaintenanceMonitor;
use rusqlite::params;
use tempfile::TempDir;

struct DbHarness {
    #[allow(dead_code)]
    temp_dir: TempDir,
    manager: Arc<DbManager>,
}

impl DbHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("temporary directory should be created");
        let db_path = temp_dir.path().join("pipeline-integration.db");

        let manager =
            Arc::new(DbManager::new(&db_path, 4).expect("database manager should initialise"));
        manager.run_migrations().expect("schema migrations should apply");

        Self { temp_dir, manager }
    }

    fn seed_user(&self, id: &str, created_at: i64) {
        let conn = self.manager.get_connection().expect("connection");
        conn.execute(
            "INSERT INTO users (id, email, profile_completed, is_active, created_at, updated_at)
             VALUES (?1, ?2, 1, 1, ?3, ?3)",
            params![id, format!("{id}@example.com"), created_at],
        )
        .expect("user should persist");
    }

    #[allow(clippy::too_many_arguments)]
    fn seed_profile(
        &self,
        user_id: &str,
        weight: f64,
        sex: &str,
        activity: &str,
        goal: &str,
        dietary_style: Option<&str>,
    ) {
        let conn = self.manager.get_connection().expect("connection");
        conn.execute(
            "INSERT INTO user_profiles (id, user_id, weight_kg, height_cm, age, sex,
                                        activity_level, main_goal, dietary_style,
                                        created_at, updated_at)
             VALUES (?1, ?2, ?3, 170.0, 25, ?4, ?5, ?6, ?7, 100, 100)",
            params![
                format!("profile-{user_id}"),
                user_id,
                weight,
                sex,
                activity,
                goal,
                dietary_style
            ],
        )
        .expect("profile should persist");
    }

    fn goal_service(&self) -> GoalService {
        let users = Arc::new(SqliteUserRepository::new(Arc::clone(&self.manager)));
        let profiles = Arc::new(SqliteUserRepository::new(Arc::clone(&self.manager)));
        let goals = Arc::new(SqliteDailyGoalRepository::new(Arc::clone(&self.manager)));
        GoalService::new(users, profiles, goals)
            .with_batch_config(BatchConfig { concurrency: 3, pause_ms: 0 })
    }

    fn recommendation_service(&self) -> RecommendationService {
        let users = Arc::new(SqliteUserRepository::new(Arc::clone(&self.manager)));
        let profiles = Arc::new(SqliteUserRepository::new(Arc::clone(&self.manager)));
        let goals = Arc::new(SqliteDailyGoalRepository::new(Arc::clone(&self.manager)));
        let store = Arc::new(SqliteRecommendationRepository::new(Arc::clone(&self.manager)));
        RecommendationService::new(users, profiles, goals, store)
    }

    fn goal_row_count(&self) -> i64 {
        let conn = self.manager.get_connection().expect("connection");
        conn.query_row("SELECT COUNT(*) FROM daily_goals", [], |r| r.get(0)).expect("count")
    }
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_materializes_population_with_correct_targets() {
    let harness = DbHarness::new();
    harness.seed_user("user-standard", 100);
    harness.seed_profile("user-standard", 70.0, "male", "moderate", "weight_loss", None);
    harness.seed_user("user-keto", 200);
    harness.seed_profile("user-keto", 70.0, "male", "moderate", "maintenance", Some("keto"));
    harness.seed_user("user-blank", 300);

    let service = harness.goal_service();
    let result = service.run_daily_batch(run_date(), BatchMode::Refresh).await.expect("batch");

    assert_eq!(result.created, 3);
    assert_eq!(result.updated, 0);
    assert_eq!(result.skipped, 0);
    assert_eq!(result.error_count(), 0);
    assert_eq!(result.users_examined(), 3);

    let goals = SqliteDailyGoalRepository::new(Arc::clone(&harness.manager));
    use macroplan_core::goals::ports::DailyGoalRepository;

    // Worked example of the canonical rule set
    let standard =
        goals.get("user-standard", run_date()).await.expect("get").expect("row exists");
    assert_eq!(standard.calories, 2046);
    assert_eq!(standard.protein_g, 112);
    assert_eq!(standard.carbs_g, 230);
    assert_eq!(standard.fats_g, 68);
    assert_eq!(standard.water_ml, 2450);
    assert_eq!(standard.fiber_g, 26);
    assert_eq!(standard.sugar_g, 51);
    assert_eq!(standard.sodium_mg, 2300);

    // Keto split: 5% carbs, 75% fats of the maintenance calories
    let keto = goals.get("user-keto", run_date()).await.expect("get").expect("row exists");
    assert_eq!(keto.calories, 2546);
    assert_eq!(keto.carbs_g, 32);
    assert_eq!(keto.fats_g, 212);

    // No profile at all: the fixed default bundle
    let blank = goals.get("user-blank", run_date()).await.expect("get").expect("row exists");
    assert_eq!(blank.calories, 2000);
    assert_eq!(blank.protein_g, 150);
    assert_eq!(blank.carbs_g, 250);
    assert_eq!(blank.fats_g, 67);
    assert_eq!(blank.water_ml, 2500);
}

#[tokio::test(flavor = "multi_thread")]
async fn rerun_is_idempotent_and_reports_updated() {
    let harness = DbHarness::new();
    for i in 0..5 {
        harness.seed_user(&format!("user-{i}"), 100 + i);
    }

    let service = harness.goal_service();
    let first = service.run_daily_batch(run_date(), BatchMode::Refresh).await.expect("first");
    assert_eq!(first.created, 5);

    let second = service.run_daily_batch(run_date(), BatchMode::Refresh).await.expect("second");
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 5);
    assert_eq!(second.skipped, 0);
    assert!(!second.has_errors());

    // Still exactly one row per user
    assert_eq!(harness.goal_row_count(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn backfill_mode_skips_existing_rows() {
    let harness = DbHarness::new();
    for i in 0..4 {
        harness.seed_user(&format!("user-{i}"), 100 + i);
    }

    let service = harness.goal_service();
    service.materialize_user("user-1", run_date()).await.expect("seed single row");

    let result =
        service.run_daily_batch(run_date(), BatchMode::BackfillMissing).await.expect("backfill");

    assert_eq!(result.created, 3);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.updated, 0);

    let skipped: Vec<&str> = result
        .details
        .iter()
        .filter(|d| d.outcome == OutcomeKind::Skipped)
        .map(|d| d.user_id.as_str())
        .collect();
    assert_eq!(skipped, vec!["user-1"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn get_or_create_returns_stable_row() {
    let harness = DbHarness::new();
    harness.seed_user("user-1", 100);

    let service = harness.goal_service();
    let created = service.get_or_create("user-1", run_date()).await.expect("create");
    let read_back = service.get_or_create("user-1", run_date()).await.expect("read");

    assert_eq!(created.id, read_back.id);
    assert_eq!(created.created_at, read_back.created_at);
    assert_eq!(harness.goal_row_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn maintenance_cycle_detects_and_removes_stale_rows() {
    let harness = DbHarness::new();
    harness.seed_user("user-1", 100);

    // A goal row well past the 90-day retention window
    {
        let conn = harness.manager.get_connection().expect("connection");
        let old = Utc::now().timestamp() - 120 * 86_400;
        conn.execute(
            "INSERT INTO daily_goals (id, user_id, goal_date, calories, protein_g, carbs_g,
                                      fats_g, fiber_g, sodium_mg, sugar_g, water_ml,
                                      created_at, updated_at)
             VALUES ('stale', 'user-1', '2025-01-01', 2000, 150, 250, 67, 25, 2300, 50, 2500, ?1, ?1)",
            params![old],
        )
        .expect("stale goal seeded");
        conn.execute(
            "INSERT INTO sessions (id, user_id, token, expires_at, created_at)
             VALUES ('dead', 'user-1', 'token', ?1, ?1)",
            params![Utc::now().timestamp() - 3600],
        )
        .expect("expired session seeded");
    }

    let monitor = MaintenanceMonitor::new(Arc::clone(&harness.manager));

    let before = monitor.check_health().await.expect("health check");
    assert!(before.needs_cleanup);
    assert_eq!(before.expired_goals, 1);
    assert_eq!(before.expired_sessions, 1);

    let stats = monitor.cleanup().await.expect("cleanup");
    assert_eq!(stats.goals_deleted, 1);
    assert_eq!(stats.sessions_deleted, 1);

    let after = monitor.check_health().await.expect("health check");
    assert!(!after.needs_cleanup);

    assert!(monitor.emergency_recovery().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn recommendation_pass_stores_fallback_rows() {
    let harness = DbHarness::new();
    harness.seed_user("user-1", 100);
    harness.seed_profile("user-1", 70.0, "male", "moderate", "weight_loss", None);

    // Materialize the goal first so the prompt path has data available
    harness.goal_service().materialize_user("user-1", run_date()).await.expect("goal");

    let service = harness.recommendation_service();
    let generated = service.run_population(run_date()).await.expect("pass");
    assert_eq!(generated, 1);

    let store = SqliteRecommendationRepository::new(Arc::clone(&harness.manager));
    use macroplan_core::recommendations::ports::RecommendationRepository;
    let latest =
        store.latest_for_user("user-1").await.expect("lookup").expect("recommendation exists");
    assert_eq!(latest.source, RecommendationSource::Fallback);
    assert!(!latest.content.is_empty());
}
