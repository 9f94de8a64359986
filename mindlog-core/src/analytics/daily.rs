//! Day-level normalization of a session history.
//!
//! Every statistic that reasons about calendar days starts from a
//! [`DailyTotals`]: one entry per practiced date, ordered, carrying the summed
//! minutes and the session count of that date.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::types::Session;

/// Sessions sorted by timestamp, then id.
///
/// First-encountered tie-breaks depend on this order, so callers never trust
/// the order a store returned.
pub fn chronological(sessions: &[Session]) -> Vec<&Session> {
    let mut sorted: Vec<&Session> = sessions.iter().collect();
    sorted.sort_by_key(|s| (s.date, s.id));
    sorted
}

/// Minutes and session count of one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayTotal {
    pub minutes: i64,
    pub sessions: i64,
}

/// Ordered `date -> DayTotal` mapping built once per computation.
#[derive(Debug, Clone, Default)]
pub struct DailyTotals {
    days: BTreeMap<NaiveDate, DayTotal>,
}

impl DailyTotals {
    /// Sum sessions per calendar date. Input order does not matter.
    pub fn from_sessions<'a, I>(sessions: I) -> Self
    where
        I: IntoIterator<Item = &'a Session>,
    {
        let mut days: BTreeMap<NaiveDate, DayTotal> = BTreeMap::new();
        for session in sessions {
            let entry = days.entry(session.date.date()).or_default();
            entry.minutes += session.duration_completed;
            entry.sessions += 1;
        }
        Self { days }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Number of practiced days.
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.days.keys().next().copied()
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.days.keys().next_back().copied()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.days.contains_key(&day)
    }

    pub fn get(&self, day: NaiveDate) -> Option<DayTotal> {
        self.days.get(&day).copied()
    }

    /// Practiced days with their totals, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, DayTotal)> + '_ {
        self.days.iter().map(|(day, total)| (*day, *total))
    }

    /// Practiced days, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn total_minutes(&self) -> i64 {
        self.days.values().map(|t| t.minutes).sum()
    }

    /// Day with the most minutes; the earliest one on ties.
    pub fn best_day(&self) -> Option<(NaiveDate, DayTotal)> {
        self.iter().fold(None, |best, (day, total)| match best {
            Some((_, best_total)) if best_total.minutes >= total.minutes => best,
            _ => Some((day, total)),
        })
    }

    /// Largest number of fully skipped days between two consecutive practiced days.
    pub fn longest_gap(&self) -> i64 {
        let days: Vec<NaiveDate> = self.days().collect();
        days.windows(2)
            .map(|pair| (pair[1] - pair[0]).num_days() - 1)
            .max()
            .unwrap_or(0)
            .max(0)
    }
}
