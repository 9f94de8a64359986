//! Weekly and monthly rollups of a session history.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use super::daily::{chronological, DailyTotals};
use super::streaks::longest_run;
use super::tally::Tally;
use crate::types::Session;

/// Aggregates for one Monday-to-Sunday week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyBucket {
    /// Monday of the week
    pub period_start: NaiveDate,
    /// Sunday of the week
    pub period_end: NaiveDate,
    pub total_minutes: i64,
    pub total_sessions: i64,
    pub average_duration: f64,
    pub days_practiced: i64,
    pub most_used_type: String,
}

impl WeeklyBucket {
    /// Chart label, e.g. `2024-01-01/2024-01-07`.
    pub fn label(&self) -> String {
        format!(
            "{}/{}",
            self.period_start.format("%Y-%m-%d"),
            self.period_end.format("%Y-%m-%d")
        )
    }
}

/// Aggregates for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub year: i32,
    /// 1-12
    pub month: u32,
    pub month_name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_minutes: i64,
    pub total_sessions: i64,
    pub average_duration: f64,
    pub days_practiced: i64,
    pub most_used_type: String,
    /// Longest run of consecutive practiced days inside the month
    pub streak_days: i64,
}

impl MonthlyBucket {
    /// Chart label, e.g. `2024-01`.
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Last day of the month starting at `first`.
fn month_end(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

/// Sessions of one bucket plus the aggregates every bucket kind shares.
struct BucketStats {
    total_minutes: i64,
    total_sessions: i64,
    average_duration: f64,
    days_practiced: i64,
    most_used_type: String,
    daily: DailyTotals,
}

impl BucketStats {
    /// `sessions` must be non-empty and chronological.
    fn from_sessions(sessions: &[&Session]) -> Self {
        let total_minutes: i64 = sessions.iter().map(|s| s.duration_completed).sum();
        let total_sessions = sessions.len() as i64;
        let daily = DailyTotals::from_sessions(sessions.iter().copied());
        let types: Tally<&str> = sessions.iter().map(|s| s.type_name()).collect();

        Self {
            total_minutes,
            total_sessions,
            average_duration: if total_sessions > 0 {
                total_minutes as f64 / total_sessions as f64
            } else {
                0.0
            },
            days_practiced: daily.len() as i64,
            most_used_type: types
                .most_frequent()
                .map(|t| t.to_string())
                .unwrap_or_default(),
            daily,
        }
    }
}

/// Partition sessions by a period key, keeping chronological order inside each group.
fn partition<'a, K, F>(sessions: &'a [Session], key: F) -> BTreeMap<K, Vec<&'a Session>>
where
    K: Ord,
    F: Fn(NaiveDate) -> K,
{
    let mut groups: BTreeMap<K, Vec<&Session>> = BTreeMap::new();
    for session in chronological(sessions) {
        groups.entry(key(session.date.date())).or_default().push(session);
    }
    groups
}

/// Group sessions into Monday-start weeks. Weeks without sessions are omitted.
pub fn group_by_week(sessions: &[Session]) -> Vec<WeeklyBucket> {
    partition(sessions, week_start)
        .into_iter()
        .map(|(start, group)| {
            let stats = BucketStats::from_sessions(&group);
            WeeklyBucket {
                period_start: start,
                period_end: start + Days::new(6),
                total_minutes: stats.total_minutes,
                total_sessions: stats.total_sessions,
                average_duration: stats.average_duration,
                days_practiced: stats.days_practiced,
                most_used_type: stats.most_used_type,
            }
        })
        .collect()
}

/// Group sessions into calendar months. Months without sessions are omitted.
pub fn group_by_month(sessions: &[Session]) -> Vec<MonthlyBucket> {
    partition(sessions, |d| (d.year(), d.month()))
        .into_iter()
        .filter_map(|((year, month), group)| {
            let start = NaiveDate::from_ymd_opt(year, month, 1)?;
            let stats = BucketStats::from_sessions(&group);
            Some(MonthlyBucket {
                year,
                month,
                month_name: month_name(month).to_string(),
                period_start: start,
                period_end: month_end(start),
                total_minutes: stats.total_minutes,
                total_sessions: stats.total_sessions,
                average_duration: stats.average_duration,
                days_practiced: stats.days_practiced,
                most_used_type: stats.most_used_type,
                streak_days: longest_run(stats.daily.days()),
            })
        })
        .collect()
}
