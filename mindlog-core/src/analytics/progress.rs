//! Progress over a trailing window of days.

use chrono::NaiveDate;
use serde::Serialize;

use super::daily::{chronological, DailyTotals};
use super::insights::{round2, NOT_AVAILABLE};
use super::tally::Tally;
use crate::types::{Session, TimeSlot};

/// Direction of average session length across the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl Trend {
    /// Compare the mean session length of the later half against the earlier half.
    ///
    /// More than 10% longer is improving, more than 10% shorter is declining.
    pub fn between(first_half: f64, second_half: f64) -> Self {
        if second_half > first_half * 1.1 {
            Trend::Improving
        } else if second_half < first_half * 0.9 {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub period_days: i64,
    pub total_minutes: i64,
    pub total_sessions: i64,
    /// Minutes per calendar day of the window, practiced or not
    pub average_daily_minutes: f64,
    /// Share of the window's days with at least one session
    pub consistency_percentage: f64,
    pub improvement_trend: Trend,
    pub best_day: Option<NaiveDate>,
    pub best_day_minutes: i64,
    /// Type names in the order they were first practiced
    pub meditation_types_used: Vec<String>,
    pub favorite_time_slot: String,
}

impl ProgressReport {
    pub fn empty(period_days: i64) -> Self {
        Self {
            period_days,
            total_minutes: 0,
            total_sessions: 0,
            average_daily_minutes: 0.0,
            consistency_percentage: 0.0,
            improvement_trend: Trend::Stable,
            best_day: None,
            best_day_minutes: 0,
            meditation_types_used: Vec::new(),
            favorite_time_slot: NOT_AVAILABLE.to_string(),
        }
    }
}

fn mean_minutes(sessions: &[&Session]) -> f64 {
    if sessions.is_empty() {
        return 0.0;
    }
    sessions.iter().map(|s| s.duration_completed).sum::<i64>() as f64 / sessions.len() as f64
}

/// Summarize the sessions of a `period_days`-long window.
///
/// The caller selects the window; every session passed in is counted.
pub fn analyze_progress(sessions: &[Session], period_days: i64) -> ProgressReport {
    if sessions.is_empty() || period_days <= 0 {
        return ProgressReport::empty(period_days);
    }

    let sessions = chronological(sessions);
    let daily = DailyTotals::from_sessions(sessions.iter().copied());
    let total_minutes = daily.total_minutes();
    let days = period_days as f64;
    // a window of N days can touch N + 1 calendar dates
    let practiced_days = (daily.len() as i64).min(period_days);

    let mid = sessions.len() / 2;
    let improvement_trend = if mid == 0 {
        Trend::Stable
    } else {
        Trend::between(mean_minutes(&sessions[..mid]), mean_minutes(&sessions[mid..]))
    };

    let (best_day, best_day_minutes) = daily
        .best_day()
        .map(|(day, total)| (Some(day), total.minutes))
        .unwrap_or((None, 0));

    let types: Tally<&str> = sessions.iter().map(|s| s.type_name()).collect();
    let slots: Tally<TimeSlot> = sessions.iter().map(|s| TimeSlot::of(s.date)).collect();

    ProgressReport {
        period_days,
        total_minutes,
        total_sessions: sessions.len() as i64,
        average_daily_minutes: round2(total_minutes as f64 / days),
        consistency_percentage: round2(practiced_days as f64 / days * 100.0),
        improvement_trend,
        best_day,
        best_day_minutes,
        meditation_types_used: types.keys().map(|t| t.to_string()).collect(),
        favorite_time_slot: slots
            .most_frequent()
            .map(|slot| slot.as_str().to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testutil::{day, session};

    #[test]
    fn test_empty_window() {
        let report = analyze_progress(&[], 30);
        assert_eq!(report, ProgressReport::empty(30));
        assert_eq!(report.improvement_trend, Trend::Stable);
        assert_eq!(report.favorite_time_slot, "N/A");
    }

    #[test]
    fn test_trend_thresholds() {
        assert_eq!(Trend::between(10.0, 11.5), Trend::Improving);
        assert_eq!(Trend::between(10.0, 11.0), Trend::Stable);
        assert_eq!(Trend::between(10.0, 9.0), Trend::Stable);
        assert_eq!(Trend::between(10.0, 8.5), Trend::Declining);
    }

    #[test]
    fn test_progress_report() {
        let sessions = vec![
            session(2024, 1, 1, 7, 10, "Mindfulness"),
            session(2024, 1, 2, 19, 10, "Metta"),
            session(2024, 1, 2, 8, 20, "Mindfulness"),
            session(2024, 1, 5, 8, 30, "Body Scan"),
        ];
        let report = analyze_progress(&sessions, 10);

        assert_eq!(report.total_minutes, 70);
        assert_eq!(report.total_sessions, 4);
        assert_eq!(report.average_daily_minutes, 7.0);
        assert_eq!(report.consistency_percentage, 30.0);
        // first half (10, 20) vs second half (10, 30)
        assert_eq!(report.improvement_trend, Trend::Improving);
        // 01-02 and 01-05 both total 30 minutes
        assert_eq!(report.best_day, Some(day(2024, 1, 2)));
        assert_eq!(report.best_day_minutes, 30);
        assert_eq!(
            report.meditation_types_used,
            vec!["Mindfulness", "Metta", "Body Scan"]
        );
        assert_eq!(report.favorite_time_slot, "morning");
    }

    #[test]
    fn test_single_session_is_stable() {
        let report = analyze_progress(&[session(2024, 1, 1, 7, 10, "Mindfulness")], 7);
        assert_eq!(report.improvement_trend, Trend::Stable);
        assert_eq!(report.best_day_minutes, 10);
    }

    #[test]
    fn test_consistency_never_exceeds_window() {
        // a one-day window ending in the evening reaches back into yesterday
        let sessions = vec![
            session(2024, 1, 1, 21, 10, "Mindfulness"),
            session(2024, 1, 2, 8, 10, "Mindfulness"),
        ];
        let report = analyze_progress(&sessions, 1);
        assert_eq!(report.consistency_percentage, 100.0);
    }
}
