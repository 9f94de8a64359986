//! Behavioral profile of a user's full session history.
//!
//! [`analyze`] produces an [`AnalyticsSnapshot`]: averages, the busiest
//! weekday and hour, the dominant session length and type, trailing-window
//! totals with growth rates, and consistency measures. Users without sessions
//! get zeros and `"N/A"` in place of names.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;

use super::daily::{chronological, DailyTotals};
use super::tally::Tally;
use crate::types::Session;

/// Placeholder for name-valued fields when there is nothing to name.
pub const NOT_AVAILABLE: &str = "N/A";

/// Calendar days, ending today, over which consistency is measured.
pub const CONSISTENCY_WINDOW_DAYS: i64 = 30;

/// Length class of a single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionLength {
    /// Over 0 and up to 10 minutes
    Short,
    /// Over 10 and up to 20 minutes
    Medium,
    /// Over 20 and up to 30 minutes
    Long,
    /// Over 30 minutes
    Extended,
}

impl SessionLength {
    /// `None` for zero-minute sessions.
    pub fn classify(minutes: i64) -> Option<Self> {
        match minutes {
            m if m <= 0 => None,
            1..=10 => Some(SessionLength::Short),
            11..=20 => Some(SessionLength::Medium),
            21..=30 => Some(SessionLength::Long),
            _ => Some(SessionLength::Extended),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionLength::Short => "short",
            SessionLength::Medium => "medium",
            SessionLength::Long => "long",
            SessionLength::Extended => "extended",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSnapshot {
    pub user_id: i64,
    pub analysis_date: NaiveDateTime,
    pub total_sessions: i64,
    pub total_minutes: i64,
    pub daily_average: f64,
    pub weekly_average: f64,
    pub monthly_average: f64,
    /// English weekday name with the most minutes
    pub most_active_day: String,
    /// Hour (0-23) with the most minutes
    pub most_active_hour: u32,
    /// Most common [`SessionLength`]
    pub preferred_duration: String,
    /// Session count per type name
    pub meditation_type_distribution: BTreeMap<String, i64>,
    pub most_used_type: String,
    pub last_7_days_minutes: i64,
    pub last_30_days_minutes: i64,
    pub growth_rate_7d: f64,
    pub growth_rate_30d: f64,
    pub consistency_score: f64,
    pub active_days_last_month: i64,
    pub longest_gap_days: i64,
}

impl AnalyticsSnapshot {
    pub fn empty(user_id: i64, now: NaiveDateTime) -> Self {
        Self {
            user_id,
            analysis_date: now,
            total_sessions: 0,
            total_minutes: 0,
            daily_average: 0.0,
            weekly_average: 0.0,
            monthly_average: 0.0,
            most_active_day: NOT_AVAILABLE.to_string(),
            most_active_hour: 0,
            preferred_duration: NOT_AVAILABLE.to_string(),
            meditation_type_distribution: BTreeMap::new(),
            most_used_type: NOT_AVAILABLE.to_string(),
            last_7_days_minutes: 0,
            last_30_days_minutes: 0,
            growth_rate_7d: 0.0,
            growth_rate_30d: 0.0,
            consistency_score: 0.0,
            active_days_last_month: 0,
            longest_gap_days: 0,
        }
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage change from `previous` to `current`; 0 when `previous` is 0.
pub fn growth_rate(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    (current - previous) as f64 / previous as f64 * 100.0
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Index of the largest value; the lowest index on ties.
fn argmax(values: &[i64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(0, |best, (i, v)| if *v > values[best] { i } else { best })
}

/// Minutes in `[now - days, ..)`, and in the equally long window before it.
fn trailing_windows(sessions: &[&Session], now: NaiveDateTime, days: i64) -> (i64, i64) {
    let start = now - Duration::days(days);
    let previous_start = now - Duration::days(days * 2);

    sessions.iter().fold((0, 0), |(current, previous), s| {
        if s.date >= start {
            (current + s.duration_completed, previous)
        } else if s.date >= previous_start {
            (current, previous + s.duration_completed)
        } else {
            (current, previous)
        }
    })
}

/// Build the analytics snapshot for `sessions` as of `now`.
pub fn analyze(user_id: i64, sessions: &[Session], now: NaiveDateTime) -> AnalyticsSnapshot {
    let sessions = chronological(sessions);
    let daily = DailyTotals::from_sessions(sessions.iter().copied());

    let (Some(first), Some(last)) = (daily.first_day(), daily.last_day()) else {
        return AnalyticsSnapshot::empty(user_id, now);
    };

    let total_minutes = daily.total_minutes();
    let span_days = (last - first).num_days() + 1;
    let daily_average = total_minutes as f64 / span_days as f64;

    let mut by_weekday = [0i64; 7];
    let mut by_hour = [0i64; 24];
    for s in &sessions {
        by_weekday[s.date.weekday().num_days_from_monday() as usize] += s.duration_completed;
        by_hour[s.date.hour() as usize] += s.duration_completed;
    }
    let most_active_day = weekday_name(WEEK[argmax(&by_weekday)]);

    let mut lengths = [0i64; 4];
    for s in &sessions {
        if let Some(length) = SessionLength::classify(s.duration_completed) {
            lengths[length as usize] += 1;
        }
    }
    let preferred_duration = if lengths.iter().all(|c| *c == 0) {
        NOT_AVAILABLE
    } else {
        [
            SessionLength::Short,
            SessionLength::Medium,
            SessionLength::Long,
            SessionLength::Extended,
        ][argmax(&lengths)]
        .as_str()
    };

    let types: Tally<&str> = sessions.iter().map(|s| s.type_name()).collect();
    let mut distribution = BTreeMap::new();
    for s in &sessions {
        *distribution.entry(s.type_name().to_string()).or_insert(0) += 1;
    }

    let (last_7, prev_7) = trailing_windows(&sessions, now, 7);
    let (last_30, prev_30) = trailing_windows(&sessions, now, 30);

    let today = now.date();
    let window_start = today - Duration::days(CONSISTENCY_WINDOW_DAYS - 1);
    let active_days_last_month = daily
        .days()
        .filter(|day| (window_start..=today).contains(day))
        .count() as i64;

    tracing::debug!(
        user_id,
        sessions = sessions.len(),
        total_minutes,
        span_days,
        "Analytics snapshot computed"
    );

    AnalyticsSnapshot {
        user_id,
        analysis_date: now,
        total_sessions: sessions.len() as i64,
        total_minutes,
        daily_average: round2(daily_average),
        weekly_average: round2(daily_average * 7.0),
        monthly_average: round2(daily_average * 30.0),
        most_active_day: most_active_day.to_string(),
        most_active_hour: argmax(&by_hour) as u32,
        preferred_duration: preferred_duration.to_string(),
        meditation_type_distribution: distribution,
        most_used_type: types
            .most_frequent()
            .map(|t| t.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        last_7_days_minutes: last_7,
        last_30_days_minutes: last_30,
        growth_rate_7d: round2(growth_rate(last_7, prev_7)),
        growth_rate_30d: round2(growth_rate(last_30, prev_30)),
        consistency_score: round2(
            active_days_last_month as f64 / CONSISTENCY_WINDOW_DAYS as f64 * 100.0,
        ),
        active_days_last_month,
        longest_gap_days: daily.longest_gap(),
    }
}
