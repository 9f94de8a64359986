//! Consecutive-day practice streaks.

use chrono::NaiveDate;
use serde::Serialize;

use super::daily::DailyTotals;

/// Current and longest streaks, in days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreakStats {
    /// Run of practiced days ending today; 0 if today has no session yet
    pub current_streak: i64,
    /// Longest run of practiced days up to today
    pub longest_streak: i64,
}

/// Calculate streaks over the day range from the first practiced day through `today`.
///
/// Days after `today` are outside the range and ignored. `today` is pinned by
/// the caller so one computation never straddles a day boundary.
pub fn calculate_streaks(daily: &DailyTotals, today: NaiveDate) -> StreakStats {
    let Some(first) = daily.first_day() else {
        return StreakStats::default();
    };

    let mut longest = 0i64;
    let mut run = 0i64;

    for day in first.iter_days().take_while(|d| *d <= today) {
        if daily.contains(day) {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }

    // The walk ends at today, so the open run is the current streak.
    StreakStats {
        current_streak: run,
        longest_streak: longest,
    }
}

/// Longest run of consecutive dates in an ascending, de-duplicated sequence.
///
/// Returns 0 for an empty sequence.
pub fn longest_run<I>(days: I) -> i64
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut longest = 0i64;
    let mut run = 0i64;
    let mut prev: Option<NaiveDate> = None;

    for day in days {
        run = match prev {
            Some(p) if (day - p).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }

    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testutil::{day, session};

    fn daily_for(days: &[(i32, u32, u32)]) -> DailyTotals {
        let sessions: Vec<_> = days
            .iter()
            .map(|&(y, m, d)| session(y, m, d, 8, 10, "Mindfulness"))
            .collect();
        DailyTotals::from_sessions(&sessions)
    }

    #[test]
    fn test_no_sessions() {
        let stats = calculate_streaks(&DailyTotals::default(), day(2024, 1, 1));
        assert_eq!(stats, StreakStats::default());
    }

    #[test]
    fn test_single_session_today() {
        let daily = daily_for(&[(2024, 1, 1)]);
        let stats = calculate_streaks(&daily, day(2024, 1, 1));
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 1);
    }

    #[test]
    fn test_consecutive_days_through_today() {
        let daily = daily_for(&[(2024, 1, 1), (2024, 1, 2), (2024, 1, 3)]);
        let stats = calculate_streaks(&daily, day(2024, 1, 3));
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.longest_streak, 3);
    }

    #[test]
    fn test_gap_before_today_breaks_current() {
        let daily = daily_for(&[(2024, 1, 1), (2024, 1, 2), (2024, 1, 3)]);
        let stats = calculate_streaks(&daily, day(2024, 1, 5));
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.longest_streak, 3);
    }

    #[test]
    fn test_unpracticed_today_breaks_current() {
        let daily = daily_for(&[(2024, 1, 1), (2024, 1, 2)]);
        let stats = calculate_streaks(&daily, day(2024, 1, 3));
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.longest_streak, 2);
    }

    #[test]
    fn test_current_shorter_than_longest() {
        let daily = daily_for(&[
            (2024, 1, 1),
            (2024, 1, 2),
            (2024, 1, 3),
            (2024, 1, 4),
            (2024, 1, 7),
            (2024, 1, 8),
        ]);
        let stats = calculate_streaks(&daily, day(2024, 1, 8));
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 4);
    }

    #[test]
    fn test_future_days_ignored() {
        let daily = daily_for(&[(2024, 1, 1), (2024, 1, 10)]);
        let stats = calculate_streaks(&daily, day(2024, 1, 1));
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 1);
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run(Vec::new()), 0);
        assert_eq!(longest_run(vec![day(2024, 3, 5)]), 1);
        assert_eq!(
            longest_run(vec![
                day(2024, 3, 1),
                day(2024, 3, 2),
                day(2024, 3, 4),
                day(2024, 3, 5),
                day(2024, 3, 6),
            ]),
            3
        );
    }
}
