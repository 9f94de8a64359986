//! Storage seam for the statistics engine.
//!
//! The engine reads sessions and writes derived records exclusively through
//! [`StatsStore`]. [`crate::Database`] is the production implementation; tests
//! wrap it to inject failures.

use crate::error::Result;
use crate::types::{DateRange, Session, UserPreferences, UserStatsSummary};

/// Persistence operations consumed by the statistics engine.
pub trait StatsStore {
    /// Sessions for a user, ascending by date, optionally bounded (inclusive).
    fn sessions_for_user(&self, user_id: i64, range: Option<&DateRange>) -> Result<Vec<Session>>;

    /// IDs of every user with at least one session.
    fn users_with_sessions(&self) -> Result<Vec<i64>>;

    fn get_summary(&self, user_id: i64) -> Result<Option<UserStatsSummary>>;

    /// Insert or overwrite; at most one summary exists per user.
    fn upsert_summary(&self, summary: &UserStatsSummary) -> Result<()>;

    /// Returns whether a summary existed.
    fn delete_summary(&self, user_id: i64) -> Result<bool>;

    /// Every stored summary, most minutes first.
    fn list_summaries(&self) -> Result<Vec<UserStatsSummary>>;

    fn get_preferences(&self, user_id: i64) -> Result<Option<UserPreferences>>;

    /// Insert or overwrite; at most one preference record exists per user.
    fn upsert_preferences(&self, prefs: &UserPreferences) -> Result<()>;

    /// Returns whether a record existed.
    fn delete_preferences(&self, user_id: i64) -> Result<bool>;
}
