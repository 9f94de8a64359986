//! Preference inference from session habits.

use super::daily::chronological;
use super::store::StatsStore;
use super::tally::Tally;
use crate::error::Result;
use crate::types::{PreferredDuration, Session, TimeSlot, UserPreferences};

/// Number of goal tags kept.
pub const MAX_GOALS: usize = 3;

/// Infer preferences from a full session history. `None` without sessions.
pub fn infer_preferences(user_id: i64, sessions: &[Session]) -> Option<UserPreferences> {
    if sessions.is_empty() {
        return None;
    }

    let sessions = chronological(sessions);

    let total: i64 = sessions.iter().map(|s| s.duration_completed).sum();
    let average = total as f64 / sessions.len() as f64;

    let slots: Tally<TimeSlot> = sessions.iter().map(|s| TimeSlot::of(s.date)).collect();
    let tags: Tally<&str> = sessions
        .iter()
        .flat_map(|s| s.tags.iter().map(String::as_str))
        .collect();

    Some(UserPreferences {
        user_id,
        preferred_duration: PreferredDuration::from_average_minutes(average),
        preferred_time: slots.most_frequent().copied().unwrap_or(TimeSlot::Evening),
        goals: tags.top(MAX_GOALS).into_iter().map(str::to_string).collect(),
    })
}

/// Recompute and persist a user's preferences from their full history.
///
/// Without sessions any stored record is deleted and `None` returned;
/// otherwise the record is overwritten wholesale.
pub fn refresh_preferences<S: StatsStore + ?Sized>(
    store: &S,
    user_id: i64,
) -> Result<Option<UserPreferences>> {
    let sessions = store.sessions_for_user(user_id, None)?;

    match infer_preferences(user_id, &sessions) {
        Some(prefs) => {
            store.upsert_preferences(&prefs)?;
            tracing::debug!(
                user_id,
                duration = prefs.preferred_duration.as_str(),
                time = prefs.preferred_time.as_str(),
                goals = ?prefs.goals,
                "Preferences updated"
            );
            Ok(Some(prefs))
        }
        None => {
            if store.delete_preferences(user_id)? {
                tracing::debug!(user_id, "Preferences removed, no sessions left");
            }
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testutil::{session, tagged};

    #[test]
    fn test_no_sessions() {
        assert!(infer_preferences(1, &[]).is_none());
    }

    #[test]
    fn test_inferred_from_habits() {
        let sessions = vec![
            tagged(2024, 1, 1, 7, 20, "Mindfulness", &["stress", "focus"]),
            tagged(2024, 1, 2, 7, 10, "Mindfulness", &["stress", "focus"]),
            tagged(2024, 1, 3, 21, 5, "Metta", &["sleep"]),
        ];
        let prefs = infer_preferences(9, &sessions).unwrap();

        assert_eq!(prefs.user_id, 9);
        assert_eq!(prefs.preferred_duration, PreferredDuration::Medium);
        assert_eq!(prefs.preferred_time, TimeSlot::Morning);
        assert_eq!(prefs.goals, vec!["stress", "focus", "sleep"]);
    }

    #[test]
    fn test_goals_capped_at_three() {
        let sessions = vec![
            tagged(2024, 1, 1, 7, 10, "A", &["a", "b"]),
            tagged(2024, 1, 2, 7, 10, "B", &["c", "d"]),
            tagged(2024, 1, 3, 7, 10, "C", &["d"]),
        ];
        let prefs = infer_preferences(1, &sessions).unwrap();
        assert_eq!(prefs.goals, vec!["d", "a", "b"]);
    }

    #[test]
    fn test_time_slot_tie_goes_to_earliest_session() {
        let sessions = vec![
            session(2024, 1, 2, 8, 10, "Mindfulness"),
            session(2024, 1, 1, 14, 10, "Mindfulness"),
        ];
        let prefs = infer_preferences(1, &sessions).unwrap();
        assert_eq!(prefs.preferred_time, TimeSlot::Afternoon);
        assert!(prefs.goals.is_empty());
    }

    #[test]
    fn test_duration_bucket_boundary() {
        let sessions = vec![
            session(2024, 1, 1, 8, 10, "Mindfulness"),
            session(2024, 1, 2, 8, 10, "Mindfulness"),
        ];
        let prefs = infer_preferences(1, &sessions).unwrap();
        assert_eq!(prefs.preferred_duration, PreferredDuration::Short);
    }
}
