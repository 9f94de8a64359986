//! Statistics operations bound to a store and a pinned clock.
//!
//! [`StatsService`] is the entry point front ends use. It reads sessions
//! through [`StatsStore`], runs the pure computations of the sibling modules,
//! validates windows and enforces admin-only operations. "Now" is captured
//! once at construction so every result of one service call agrees on the
//! current day.

use chrono::{Local, NaiveDateTime};

use super::charts::{build_chart, Chart, ChartKind};
use super::insights::{analyze, AnalyticsSnapshot};
use super::periods::{group_by_month, group_by_week, MonthlyBucket, WeeklyBucket};
use super::preferences::refresh_preferences;
use super::progress::{analyze_progress, ProgressReport};
use super::store::StatsStore;
use super::summary::{self, RefreshReport, RefreshTick, SummaryOutcome};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{DateRange, NewSession, Session, User, UserPreferences, UserStatsSummary};

/// Days per month when converting a month window to a date range.
pub const DAYS_PER_MONTH: i64 = 30;

pub struct StatsService<'a, S: StatsStore + ?Sized> {
    store: &'a S,
    now: NaiveDateTime,
}

impl<'a, S: StatsStore + ?Sized> StatsService<'a, S> {
    /// Service pinned to the current local time.
    pub fn new(store: &'a S) -> Self {
        Self::with_now(store, Local::now().naive_local())
    }

    pub fn with_now(store: &'a S, now: NaiveDateTime) -> Self {
        Self { store, now }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    // ---- summaries ----

    /// Stored summary, computed and stored on first request.
    pub fn stats(&self, user_id: i64) -> Result<UserStatsSummary> {
        if let Some(summary) = self.store.get_summary(user_id)? {
            return Ok(summary);
        }
        Ok(self.recompute(user_id)?.into_summary())
    }

    pub fn recompute(&self, user_id: i64) -> Result<SummaryOutcome> {
        summary::recompute(self.store, user_id, self.now)
    }

    /// Drop the stored summary and recompute it from scratch.
    pub fn refresh(&self, user_id: i64) -> Result<SummaryOutcome> {
        let existed = self.store.delete_summary(user_id)?;
        tracing::info!(user_id, existed, "Refreshing stats summary");
        self.recompute(user_id)
    }

    /// Recompute every user with sessions. Admin only.
    pub fn refresh_all(&self, actor: &User) -> Result<RefreshReport> {
        actor.require_admin("refresh all stats")?;
        summary::refresh_all(self.store, self.now)
    }

    /// Like [`Self::refresh_all`], reporting progress after each user.
    pub fn refresh_all_with<F>(&self, actor: &User, on_tick: F) -> Result<RefreshReport>
    where
        F: FnMut(RefreshTick),
    {
        actor.require_admin("refresh all stats")?;
        let user_ids = self.store.users_with_sessions()?;
        Ok(summary::refresh_users(self.store, &user_ids, self.now, on_tick))
    }

    /// Every stored summary, most minutes first. Admin only.
    pub fn all_summaries(&self, actor: &User) -> Result<Vec<UserStatsSummary>> {
        actor.require_admin("list all stats")?;
        self.store.list_summaries()
    }

    // ---- analytics ----

    pub fn analyze(&self, user_id: i64) -> Result<AnalyticsSnapshot> {
        let sessions = self.store.sessions_for_user(user_id, None)?;
        Ok(analyze(user_id, &sessions, self.now))
    }

    /// Weekly buckets over the last `weeks` weeks.
    pub fn weekly(&self, user_id: i64, weeks: i64) -> Result<Vec<WeeklyBucket>> {
        let weeks = positive_window("weeks", weeks)?;
        let days = window_days("weeks", weeks, 7)?;
        let sessions = self.trailing_sessions(user_id, days)?;
        Ok(group_by_week(&sessions))
    }

    /// Monthly buckets over the last `months` 30-day months.
    pub fn monthly(&self, user_id: i64, months: i64) -> Result<Vec<MonthlyBucket>> {
        let months = positive_window("months", months)?;
        let days = window_days("months", months, DAYS_PER_MONTH)?;
        let sessions = self.trailing_sessions(user_id, days)?;
        Ok(group_by_month(&sessions))
    }

    pub fn progress(&self, user_id: i64, days: i64) -> Result<ProgressReport> {
        let days = positive_window("days", days)?;
        let sessions = self.trailing_sessions(user_id, days)?;
        Ok(analyze_progress(&sessions, days))
    }

    /// Chart of the given kind. Unknown kinds never touch the store.
    pub fn chart(&self, user_id: i64, kind: &str) -> Result<Chart> {
        if kind.parse::<ChartKind>().is_err() {
            tracing::debug!(user_id, kind, "Unsupported chart kind requested");
            return Ok(Chart::unsupported(kind));
        }
        let sessions = self.store.sessions_for_user(user_id, None)?;
        Ok(build_chart(&sessions, kind))
    }

    // ---- preferences ----

    pub fn preferences(&self, user_id: i64) -> Result<Option<UserPreferences>> {
        self.store.get_preferences(user_id)
    }

    pub fn refresh_preferences(&self, user_id: i64) -> Result<Option<UserPreferences>> {
        refresh_preferences(self.store, user_id)
    }

    /// Hook fired after a session of `user_id` was created, edited or deleted.
    pub fn session_changed(&self, user_id: i64) -> Result<Option<UserPreferences>> {
        self.refresh_preferences(user_id)
    }

    fn trailing_sessions(&self, user_id: i64, days: i64) -> Result<Vec<Session>> {
        let range = DateRange::trailing_days(self.now, days)?;
        self.store.sessions_for_user(user_id, Some(&range))
    }
}

/// Session writes that keep derived preferences in step.
impl StatsService<'_, Database> {
    pub fn log_session(&self, user_id: i64, session: &NewSession) -> Result<Session> {
        let created = self.store.insert_session(user_id, session)?;
        self.session_changed(user_id)?;
        Ok(created)
    }

    pub fn edit_session(
        &self,
        user_id: i64,
        session_id: i64,
        session: &NewSession,
    ) -> Result<Session> {
        let updated = self.store.update_session(user_id, session_id, session)?;
        self.session_changed(user_id)?;
        Ok(updated)
    }

    pub fn delete_session(&self, user_id: i64, session_id: i64) -> Result<()> {
        self.store.delete_session(user_id, session_id)?;
        self.session_changed(user_id)?;
        Ok(())
    }
}

fn positive_window(name: &str, value: i64) -> Result<i64> {
    if value <= 0 {
        return Err(Error::InvalidParameter(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(value)
}

/// Convert a window of `units` to days, rejecting overflow.
fn window_days(name: &str, units: i64, days_per_unit: i64) -> Result<i64> {
    units.checked_mul(days_per_unit).ok_or_else(|| {
        Error::InvalidParameter(format!("{} window of {} is out of range", name, units))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testutil::at;
    use crate::types::Role;

    fn setup() -> (Database, User, i64) {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let user = db.create_user("sam@example.com", Role::User).unwrap();
        let kind = db
            .create_meditation_type("Mindfulness", None, None, &["stress".to_string()])
            .unwrap();
        let meditation = db
            .create_meditation("Breath", 10, crate::types::Difficulty::Beginner, Some(kind.id))
            .unwrap();
        (db, user, meditation.id)
    }

    fn new_session(meditation_id: i64, minutes: i64, day: u32) -> NewSession {
        NewSession {
            meditation_id,
            duration_completed: minutes,
            date: at(2024, 1, day, 8),
        }
    }

    #[test]
    fn test_stats_computed_on_first_request() {
        let (db, user, meditation) = setup();
        let service = StatsService::with_now(&db, at(2024, 1, 2, 20));
        service.log_session(user.id, &new_session(meditation, 15, 1)).unwrap();
        service.log_session(user.id, &new_session(meditation, 5, 2)).unwrap();

        assert!(db.get_summary(user.id).unwrap().is_none());
        let stats = service.stats(user.id).unwrap();
        assert_eq!(stats.total_minutes, 20);
        assert_eq!(stats.current_streak, 2);
        assert!(db.get_summary(user.id).unwrap().is_some());
    }

    #[test]
    fn test_stats_without_sessions_is_zero_and_not_stored() {
        let (db, user, _) = setup();
        let service = StatsService::with_now(&db, at(2024, 1, 2, 20));
        let stats = service.stats(user.id).unwrap();
        assert_eq!(stats.total_sessions, 0);
        assert!(db.get_summary(user.id).unwrap().is_none());
    }

    #[test]
    fn test_refresh_clears_stale_summary() {
        let (db, user, meditation) = setup();
        let service = StatsService::with_now(&db, at(2024, 1, 2, 20));
        let session = service.log_session(user.id, &new_session(meditation, 15, 1)).unwrap();
        service.recompute(user.id).unwrap();
        service.delete_session(user.id, session.id).unwrap();

        // recompute alone keeps the stale summary
        assert!(!service.recompute(user.id).unwrap().is_stored());
        assert_eq!(db.get_summary(user.id).unwrap().unwrap().total_minutes, 15);

        let outcome = service.refresh(user.id).unwrap();
        assert!(!outcome.is_stored());
        assert!(db.get_summary(user.id).unwrap().is_none());
    }

    #[test]
    fn test_windows_must_be_positive() {
        let (db, user, _) = setup();
        let service = StatsService::with_now(&db, at(2024, 1, 2, 20));
        assert!(matches!(
            service.weekly(user.id, 0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            service.monthly(user.id, -1),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            service.progress(user.id, 0),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_huge_windows_are_rejected() {
        let (db, user, meditation) = setup();
        let service = StatsService::with_now(&db, at(2024, 1, 2, 20));
        service.log_session(user.id, &new_session(meditation, 15, 1)).unwrap();

        assert!(matches!(
            service.progress(user.id, 200_000_000),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            service.weekly(user.id, i64::MAX / 2),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            service.monthly(user.id, i64::MAX),
            Err(Error::InvalidParameter(_))
        ));
        // large but representable windows still work
        assert_eq!(service.progress(user.id, 100_000).unwrap().total_minutes, 15);
    }

    #[test]
    fn test_weekly_window_excludes_older_sessions() {
        let (db, user, meditation) = setup();
        let service = StatsService::with_now(&db, at(2024, 1, 20, 12));
        service.log_session(user.id, &new_session(meditation, 10, 2)).unwrap();
        service.log_session(user.id, &new_session(meditation, 20, 16)).unwrap();

        let weeks = service.weekly(user.id, 1).unwrap();
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].total_minutes, 20);

        let weeks = service.weekly(user.id, 4).unwrap();
        assert_eq!(weeks.len(), 2);
    }

    #[test]
    fn test_admin_operations_require_admin() {
        let (db, user, _) = setup();
        let admin = db.create_user("root@example.com", Role::Admin).unwrap();
        let service = StatsService::with_now(&db, at(2024, 1, 2, 20));

        assert!(matches!(service.refresh_all(&user), Err(Error::Forbidden(_))));
        assert!(matches!(service.all_summaries(&user), Err(Error::Forbidden(_))));
        assert_eq!(service.refresh_all(&admin).unwrap().refreshed, 0);
        assert!(service.all_summaries(&admin).unwrap().is_empty());
    }

    #[test]
    fn test_session_writes_refresh_preferences() {
        let (db, user, meditation) = setup();
        let service = StatsService::with_now(&db, at(2024, 1, 2, 20));

        let session = service.log_session(user.id, &new_session(meditation, 12, 1)).unwrap();
        let prefs = db.get_preferences(user.id).unwrap().unwrap();
        assert_eq!(prefs.goals, vec!["stress"]);

        service
            .edit_session(user.id, session.id, &new_session(meditation, 30, 1))
            .unwrap();
        let prefs = db.get_preferences(user.id).unwrap().unwrap();
        assert_eq!(prefs.preferred_duration, crate::types::PreferredDuration::Long);

        service.delete_session(user.id, session.id).unwrap();
        assert!(db.get_preferences(user.id).unwrap().is_none());
    }

    #[test]
    fn test_unsupported_chart() {
        let (db, user, _) = setup();
        let service = StatsService::with_now(&db, at(2024, 1, 2, 20));
        let chart = service.chart(user.id, "radar").unwrap();
        assert_eq!(chart.chart_type, crate::analytics::ChartStyle::Unsupported);
    }
}
