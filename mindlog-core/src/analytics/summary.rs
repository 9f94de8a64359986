//! Stats aggregation: per-user totals and streaks, persisted as a summary.
//!
//! A summary is always recomputed from the full session history and upserted
//! wholesale. Batch refresh treats each user as an isolated sub-operation: one
//! user's failure is logged and recorded, and the batch moves on.

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use super::daily::DailyTotals;
use super::store::StatsStore;
use super::streaks::calculate_streaks;
use crate::error::Result;
use crate::types::{Session, UserStatsSummary};

/// Result of recomputing one user's summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "summary", rename_all = "snake_case")]
pub enum SummaryOutcome {
    /// Sessions exist; the summary was computed and upserted.
    Stored(UserStatsSummary),
    /// The user has no sessions; nothing was written. Carries an all-zero summary.
    NoSessions(UserStatsSummary),
}

impl SummaryOutcome {
    pub fn summary(&self) -> &UserStatsSummary {
        match self {
            SummaryOutcome::Stored(s) | SummaryOutcome::NoSessions(s) => s,
        }
    }

    pub fn into_summary(self) -> UserStatsSummary {
        match self {
            SummaryOutcome::Stored(s) | SummaryOutcome::NoSessions(s) => s,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, SummaryOutcome::Stored(_))
    }
}

/// Compute a summary from a session list. `None` when there are no sessions.
pub fn compute_summary(
    user_id: i64,
    sessions: &[Session],
    now: NaiveDateTime,
) -> Option<UserStatsSummary> {
    if sessions.is_empty() {
        return None;
    }

    let total_minutes: i64 = sessions.iter().map(|s| s.duration_completed).sum();
    let total_sessions = sessions.len() as i64;
    let average_session_duration = total_minutes as f64 / total_sessions as f64;

    let daily = DailyTotals::from_sessions(sessions);
    let streaks = calculate_streaks(&daily, now.date());

    Some(UserStatsSummary {
        user_id,
        total_minutes,
        current_streak: streaks.current_streak,
        longest_streak: streaks.longest_streak,
        total_sessions,
        average_session_duration,
        last_updated: Utc::now(),
    })
}

/// Recompute and upsert one user's summary.
///
/// A user without sessions gets [`SummaryOutcome::NoSessions`]; any summary
/// already stored for them is left untouched.
pub fn recompute<S: StatsStore + ?Sized>(
    store: &S,
    user_id: i64,
    now: NaiveDateTime,
) -> Result<SummaryOutcome> {
    let sessions = store.sessions_for_user(user_id, None)?;

    let Some(summary) = compute_summary(user_id, &sessions, now) else {
        tracing::debug!(user_id, "No sessions, summary not written");
        return Ok(SummaryOutcome::NoSessions(UserStatsSummary::empty(
            user_id,
            Utc::now(),
        )));
    };

    store.upsert_summary(&summary)?;

    tracing::debug!(
        user_id,
        total_minutes = summary.total_minutes,
        total_sessions = summary.total_sessions,
        current_streak = summary.current_streak,
        longest_streak = summary.longest_streak,
        "Summary recomputed"
    );

    Ok(SummaryOutcome::Stored(summary))
}

/// A user whose refresh failed during a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshFailure {
    pub user_id: i64,
    pub error: String,
}

/// Outcome of a batch refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshReport {
    /// Users whose summary was recomputed successfully
    pub refreshed: usize,
    /// Users whose recompute failed; their siblings were still processed
    pub failed: Vec<RefreshFailure>,
}

/// Progress of a batch refresh, reported after each user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTick {
    pub user_id: i64,
    pub succeeded: bool,
    /// Users processed so far, this one included
    pub done: usize,
    pub total: usize,
}

/// Recompute every user with at least one session.
///
/// Failing to list users is a collaborator failure and propagates; a failure
/// for an individual user does not.
pub fn refresh_all<S: StatsStore + ?Sized>(store: &S, now: NaiveDateTime) -> Result<RefreshReport> {
    let user_ids = store.users_with_sessions()?;
    Ok(refresh_users(store, &user_ids, now, |_| {}))
}

/// Recompute the given users independently, reporting each result to `on_tick`.
pub fn refresh_users<S, F>(
    store: &S,
    user_ids: &[i64],
    now: NaiveDateTime,
    mut on_tick: F,
) -> RefreshReport
where
    S: StatsStore + ?Sized,
    F: FnMut(RefreshTick),
{
    tracing::info!(users = user_ids.len(), "Refreshing stats for all users");

    let mut report = RefreshReport::default();

    for (i, &user_id) in user_ids.iter().enumerate() {
        let succeeded = match recompute(store, user_id, now) {
            Ok(_) => {
                report.refreshed += 1;
                true
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to refresh stats for user");
                report.failed.push(RefreshFailure {
                    user_id,
                    error: e.to_string(),
                });
                false
            }
        };
        on_tick(RefreshTick {
            user_id,
            succeeded,
            done: i + 1,
            total: user_ids.len(),
        });
    }

    tracing::info!(
        refreshed = report.refreshed,
        failed = report.failed.len(),
        "Batch stats refresh complete"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testutil::{at, session};

    #[test]
    fn test_compute_summary_totals() {
        let sessions = vec![
            session(2024, 1, 1, 7, 20, "Mindfulness"),
            session(2024, 1, 2, 7, 10, "Mindfulness"),
            session(2024, 1, 3, 7, 5, "Metta"),
        ];
        let summary = compute_summary(7, &sessions, at(2024, 1, 3, 22)).unwrap();

        assert_eq!(summary.user_id, 7);
        assert_eq!(summary.total_minutes, 35);
        assert_eq!(summary.total_sessions, 3);
        assert!((summary.average_session_duration - 35.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.longest_streak, 3);
    }

    #[test]
    fn test_compute_summary_empty() {
        assert!(compute_summary(1, &[], at(2024, 1, 1, 0)).is_none());
    }

    #[test]
    fn test_zero_minute_sessions_keep_average_defined() {
        let sessions = vec![session(2024, 1, 1, 7, 0, "Mindfulness")];
        let summary = compute_summary(1, &sessions, at(2024, 1, 1, 8)).unwrap();
        assert_eq!(summary.total_minutes, 0);
        assert_eq!(summary.average_session_duration, 0.0);
        assert_eq!(summary.current_streak, 1);
    }

    #[test]
    fn test_outcome_accessors() {
        let empty = SummaryOutcome::NoSessions(UserStatsSummary::empty(3, Utc::now()));
        assert!(!empty.is_stored());
        assert_eq!(empty.summary().total_minutes, 0);
        assert_eq!(empty.into_summary().user_id, 3);
    }
}
