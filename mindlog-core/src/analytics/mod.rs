//! Statistics and preference inference for mindlog
//!
//! Turns a user's raw session history into:
//! - Streaks and persisted per-user summaries ([`summary`])
//! - Weekly and monthly rollups ([`periods`])
//! - A behavioral snapshot ([`insights`]) and a trailing-window progress report ([`progress`])
//! - Inferred preferences ([`preferences`])
//! - Chart-ready series ([`charts`])
//!
//! ## Layout
//!
//! Every computation is a pure function of `(sessions, now)`; sessions are
//! first normalized to one entry per calendar day by [`DailyTotals`].
//! [`StatsService`] binds those functions to a [`StatsStore`] and a pinned
//! clock, and is what front ends call.

pub mod charts;
pub mod daily;
pub mod insights;
pub mod periods;
pub mod preferences;
pub mod progress;
pub mod service;
pub mod store;
pub mod streaks;
pub mod summary;
pub mod tally;

#[cfg(test)]
pub(crate) mod testutil;

pub use charts::{build_chart, Chart, ChartKind, ChartPoint, ChartStyle};
pub use daily::{DailyTotals, DayTotal};
pub use insights::{analyze, growth_rate, AnalyticsSnapshot, SessionLength};
pub use periods::{group_by_month, group_by_week, MonthlyBucket, WeeklyBucket};
pub use preferences::{infer_preferences, refresh_preferences};
pub use progress::{analyze_progress, ProgressReport, Trend};
pub use service::StatsService;
pub use store::StatsStore;
pub use streaks::{calculate_streaks, StreakStats};
pub use summary::{
    compute_summary, refresh_all, RefreshFailure, RefreshReport, RefreshTick, SummaryOutcome,
};
