//! Integration tests for the statistics engine over the SQLite store
//!
//! Each test builds a fresh in-memory database, logs sessions through the
//! store, and checks what the engine computes and persists.

use chrono::{NaiveDate, NaiveDateTime};
use mindlog_core::analytics::{ChartStyle, StatsService, StatsStore, Trend};
use mindlog_core::db::Database;
use mindlog_core::types::{
    DateRange, Difficulty, NewSession, PreferredDuration, Role, Session, TimeSlot, User,
    UserPreferences, UserStatsSummary,
};
use mindlog_core::{Error, Result};

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn setup_db() -> Database {
    let db = Database::open_in_memory().expect("open in-memory database");
    db.migrate().expect("migrate");
    db
}

/// Catalog used by the scenarios: Mindfulness tagged "stress", Metta tagged "sleep".
struct Catalog {
    mindfulness: i64,
    metta: i64,
}

fn seed_catalog(db: &Database) -> Catalog {
    let mindfulness_type = db
        .create_meditation_type(
            "Mindfulness",
            Some("Attention to the present moment"),
            Some("5-30 mins"),
            &["stress".to_string()],
        )
        .unwrap();
    let metta_type = db
        .create_meditation_type("Metta", None, None, &["sleep".to_string()])
        .unwrap();

    let mindfulness = db
        .create_meditation("Breathing Space", 20, Difficulty::Beginner, Some(mindfulness_type.id))
        .unwrap();
    let metta = db
        .create_meditation("Loving Kindness", 10, Difficulty::Intermediate, Some(metta_type.id))
        .unwrap();

    Catalog {
        mindfulness: mindfulness.id,
        metta: metta.id,
    }
}

fn log(
    service: &StatsService<'_, Database>,
    user: &User,
    meditation_id: i64,
    minutes: i64,
    date: NaiveDateTime,
) -> Session {
    service
        .log_session(
            user.id,
            &NewSession {
                meditation_id,
                duration_completed: minutes,
                date,
            },
        )
        .expect("log session")
}

// ============================================
// Reference scenario
// ============================================

#[test]
fn test_three_day_scenario() {
    let db = setup_db();
    let catalog = seed_catalog(&db);
    let user = db.create_user("ana@example.com", Role::User).unwrap();
    let service = StatsService::with_now(&db, at(2024, 1, 3, 21));

    log(&service, &user, catalog.mindfulness, 20, at(2024, 1, 1, 7));
    log(&service, &user, catalog.mindfulness, 10, at(2024, 1, 2, 7));
    log(&service, &user, catalog.metta, 5, at(2024, 1, 3, 7));

    let outcome = service.recompute(user.id).unwrap();
    assert!(outcome.is_stored());

    let summary = db.get_summary(user.id).unwrap().expect("summary stored");
    assert_eq!(summary.total_minutes, 35);
    assert_eq!(summary.total_sessions, 3);
    assert!((summary.average_session_duration - 11.67).abs() < 0.01);
    assert_eq!(summary.current_streak, 3);
    assert_eq!(summary.longest_streak, 3);

    let prefs = db.get_preferences(user.id).unwrap().expect("preferences stored");
    assert_eq!(prefs.preferred_duration, PreferredDuration::Medium);
    assert_eq!(prefs.preferred_time, TimeSlot::Morning);
    assert_eq!(prefs.goals.first().map(String::as_str), Some("stress"));
    assert_eq!(prefs.goals, vec!["stress", "sleep"]);
}

#[test]
fn test_streak_breaks_after_gap() {
    let db = setup_db();
    let catalog = seed_catalog(&db);
    let user = db.create_user("ana@example.com", Role::User).unwrap();
    let service = StatsService::with_now(&db, at(2024, 1, 5, 12));

    log(&service, &user, catalog.mindfulness, 20, at(2024, 1, 1, 7));
    log(&service, &user, catalog.mindfulness, 10, at(2024, 1, 2, 7));
    log(&service, &user, catalog.metta, 5, at(2024, 1, 3, 7));

    let summary = service.stats(user.id).unwrap();
    assert_eq!(summary.current_streak, 0);
    assert_eq!(summary.longest_streak, 3);
}

#[test]
fn test_summary_upsert_keeps_one_row_per_user() {
    let db = setup_db();
    let catalog = seed_catalog(&db);
    let user = db.create_user("ana@example.com", Role::User).unwrap();
    let service = StatsService::with_now(&db, at(2024, 1, 3, 21));

    log(&service, &user, catalog.mindfulness, 20, at(2024, 1, 1, 7));
    service.recompute(user.id).unwrap();
    log(&service, &user, catalog.metta, 5, at(2024, 1, 3, 7));
    service.recompute(user.id).unwrap();

    let summaries = db.list_summaries().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_minutes, 25);
}

// ============================================
// Batch refresh
// ============================================

/// Store that fails every session read for one user.
struct FailingStore<'a> {
    inner: &'a Database,
    failing_user: i64,
}

impl StatsStore for FailingStore<'_> {
    fn sessions_for_user(&self, user_id: i64, range: Option<&DateRange>) -> Result<Vec<Session>> {
        if user_id == self.failing_user {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk unavailable",
            )));
        }
        self.inner.sessions_for_user(user_id, range)
    }

    fn users_with_sessions(&self) -> Result<Vec<i64>> {
        StatsStore::users_with_sessions(self.inner)
    }

    fn get_summary(&self, user_id: i64) -> Result<Option<UserStatsSummary>> {
        self.inner.get_summary(user_id)
    }

    fn upsert_summary(&self, summary: &UserStatsSummary) -> Result<()> {
        self.inner.upsert_summary(summary)
    }

    fn delete_summary(&self, user_id: i64) -> Result<bool> {
        self.inner.delete_summary(user_id)
    }

    fn list_summaries(&self) -> Result<Vec<UserStatsSummary>> {
        self.inner.list_summaries()
    }

    fn get_preferences(&self, user_id: i64) -> Result<Option<UserPreferences>> {
        self.inner.get_preferences(user_id)
    }

    fn upsert_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        self.inner.upsert_preferences(prefs)
    }

    fn delete_preferences(&self, user_id: i64) -> Result<bool> {
        self.inner.delete_preferences(user_id)
    }
}

#[test]
fn test_batch_refresh_skips_failing_user() {
    let db = setup_db();
    let catalog = seed_catalog(&db);
    let now = at(2024, 1, 3, 21);
    let writer = StatsService::with_now(&db, now);

    let users: Vec<User> = (1..=5)
        .map(|i| {
            db.create_user(&format!("user{}@example.com", i), Role::User)
                .unwrap()
        })
        .collect();
    for (i, user) in users.iter().enumerate() {
        log(&writer, user, catalog.mindfulness, 10 * (i as i64 + 1), at(2024, 1, 3, 7));
    }
    let admin = db.create_user("admin@example.com", Role::Admin).unwrap();

    let failing = users[2].id;
    let store = FailingStore {
        inner: &db,
        failing_user: failing,
    };
    let service = StatsService::with_now(&store, now);
    let report = service.refresh_all(&admin).unwrap();

    assert_eq!(report.refreshed, 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].user_id, failing);
    assert!(report.failed[0].error.contains("disk unavailable"));

    for (i, user) in users.iter().enumerate() {
        let summary = db.get_summary(user.id).unwrap();
        if user.id == failing {
            assert!(summary.is_none());
        } else {
            assert_eq!(summary.unwrap().total_minutes, 10 * (i as i64 + 1));
        }
    }
}

#[test]
fn test_all_summaries_ordered_by_minutes() {
    let db = setup_db();
    let catalog = seed_catalog(&db);
    let now = at(2024, 1, 3, 21);
    let service = StatsService::with_now(&db, now);
    let admin = db.create_user("admin@example.com", Role::Admin).unwrap();
    let light = db.create_user("light@example.com", Role::User).unwrap();
    let heavy = db.create_user("heavy@example.com", Role::User).unwrap();

    log(&service, &light, catalog.metta, 5, at(2024, 1, 3, 7));
    log(&service, &heavy, catalog.mindfulness, 45, at(2024, 1, 3, 7));
    service.refresh_all(&admin).unwrap();

    let all = service.all_summaries(&admin).unwrap();
    let ids: Vec<i64> = all.iter().map(|s| s.user_id).collect();
    assert_eq!(ids, vec![heavy.id, light.id]);

    assert!(matches!(
        service.all_summaries(&light),
        Err(Error::Forbidden(_))
    ));
}

// ============================================
// Preferences
// ============================================

#[test]
fn test_deleting_only_session_removes_preferences() {
    let db = setup_db();
    let catalog = seed_catalog(&db);
    let user = db.create_user("ana@example.com", Role::User).unwrap();
    let service = StatsService::with_now(&db, at(2024, 1, 3, 21));

    let session = log(&service, &user, catalog.mindfulness, 20, at(2024, 1, 1, 7));
    assert!(db.get_preferences(user.id).unwrap().is_some());

    service.delete_session(user.id, session.id).unwrap();
    assert!(db.get_preferences(user.id).unwrap().is_none());
    assert!(service.refresh_preferences(user.id).unwrap().is_none());
}

#[test]
fn test_sessions_are_owner_scoped() {
    let db = setup_db();
    let catalog = seed_catalog(&db);
    let owner = db.create_user("owner@example.com", Role::User).unwrap();
    let other = db.create_user("other@example.com", Role::User).unwrap();
    let service = StatsService::with_now(&db, at(2024, 1, 3, 21));

    let session = log(&service, &owner, catalog.mindfulness, 20, at(2024, 1, 1, 7));
    assert!(matches!(
        service.delete_session(other.id, session.id),
        Err(Error::SessionNotFound(_))
    ));
    assert!(db.get_preferences(owner.id).unwrap().is_some());
}

// ============================================
// Rollups, progress and charts
// ============================================

#[test]
fn test_weekly_and_monthly_rollups() {
    let db = setup_db();
    let catalog = seed_catalog(&db);
    let user = db.create_user("ana@example.com", Role::User).unwrap();
    let service = StatsService::with_now(&db, at(2024, 2, 10, 12));

    log(&service, &user, catalog.mindfulness, 20, at(2024, 1, 29, 7));
    log(&service, &user, catalog.mindfulness, 10, at(2024, 1, 30, 7));
    log(&service, &user, catalog.metta, 15, at(2024, 2, 1, 21));
    log(&service, &user, catalog.metta, 15, at(2024, 2, 6, 21));

    let weeks = service.weekly(user.id, 4).unwrap();
    assert_eq!(weeks.len(), 2);
    assert_eq!(weeks[0].label(), "2024-01-29/2024-02-04");
    assert_eq!(weeks[0].total_minutes, 45);
    assert_eq!(weeks[0].days_practiced, 3);
    assert_eq!(weeks[0].most_used_type, "Mindfulness");
    assert_eq!(weeks[1].most_used_type, "Metta");

    let months = service.monthly(user.id, 6).unwrap();
    assert_eq!(months.len(), 2);
    assert_eq!(months[0].label(), "2024-01");
    assert_eq!(months[0].streak_days, 2);
    assert_eq!(months[1].month_name, "February");
    assert_eq!(months[1].total_sessions, 2);
}

#[test]
fn test_progress_report_window() {
    let db = setup_db();
    let catalog = seed_catalog(&db);
    let user = db.create_user("ana@example.com", Role::User).unwrap();
    let service = StatsService::with_now(&db, at(2024, 3, 1, 12));

    // outside a 10-day window
    log(&service, &user, catalog.mindfulness, 60, at(2024, 2, 1, 7));
    log(&service, &user, catalog.mindfulness, 10, at(2024, 2, 25, 7));
    log(&service, &user, catalog.metta, 30, at(2024, 2, 28, 7));

    let report = service.progress(user.id, 10).unwrap();
    assert_eq!(report.total_sessions, 2);
    assert_eq!(report.total_minutes, 40);
    assert_eq!(report.average_daily_minutes, 4.0);
    assert_eq!(report.consistency_percentage, 20.0);
    assert_eq!(report.improvement_trend, Trend::Improving);
    assert_eq!(report.meditation_types_used, vec!["Mindfulness", "Metta"]);
}

#[test]
fn test_types_chart_over_two_types() {
    let db = setup_db();
    let catalog = seed_catalog(&db);
    let user = db.create_user("ana@example.com", Role::User).unwrap();
    let service = StatsService::with_now(&db, at(2024, 1, 3, 21));

    log(&service, &user, catalog.mindfulness, 20, at(2024, 1, 1, 7));
    log(&service, &user, catalog.mindfulness, 10, at(2024, 1, 2, 7));
    log(&service, &user, catalog.metta, 5, at(2024, 1, 3, 7));

    let chart = service.chart(user.id, "types").unwrap();
    assert_eq!(chart.chart_type, ChartStyle::Pie);
    assert_eq!(chart.data.len(), 2);
    let sums: Vec<(&str, i64)> = chart.data.iter().map(|p| (p.x.as_str(), p.y)).collect();
    assert_eq!(sums, vec![("Metta", 5), ("Mindfulness", 30)]);
    assert!(chart.colors.len() <= 2);
}

#[test]
fn test_chart_for_user_without_sessions() {
    let db = setup_db();
    let user = db.create_user("new@example.com", Role::User).unwrap();
    let service = StatsService::with_now(&db, at(2024, 1, 3, 21));

    assert_eq!(
        service.chart(user.id, "weekly").unwrap().chart_type,
        ChartStyle::Empty
    );
    assert_eq!(
        service.chart(user.id, "heatmap").unwrap().chart_type,
        ChartStyle::Unsupported
    );
}

#[test]
fn test_analysis_for_user_without_sessions() {
    let db = setup_db();
    let user = db.create_user("new@example.com", Role::User).unwrap();
    let service = StatsService::with_now(&db, at(2024, 1, 3, 21));

    let snapshot = service.analyze(user.id).unwrap();
    assert_eq!(snapshot.total_sessions, 0);
    assert_eq!(snapshot.most_active_day, "N/A");
    assert_eq!(snapshot.growth_rate_7d, 0.0);
}
