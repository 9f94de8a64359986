//! Core domain types for mindlog
//!
//! These types mirror the rows of the session store plus the records derived
//! from them by the statistics engine.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **User** | A person who logs meditation sessions; has a [`Role`] |
//! | **MeditationType** | A family of practice ("Mindfulness", "Metta") carrying goal tags |
//! | **Meditation** | A catalog entry (a guided track) belonging to a type |
//! | **Session** | One completed sitting: user, meditation, minutes, wall-clock time |
//! | **Summary** | Persisted per-user totals and streaks ([`UserStatsSummary`]) |
//! | **Preferences** | Persisted per-user inferred habits ([`UserPreferences`]) |
//!
//! Session timestamps are local wall-clock times ([`NaiveDateTime`]); every
//! day-level computation uses their calendar date as recorded.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Type name reported for sessions whose meditation has no type.
pub const UNKNOWN_TYPE: &str = "Unknown";

/// Storage format for session timestamps (matches SQLite's `datetime()`).
pub const SESSION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================
// Users
// ============================================

/// Authorization role resolved for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with [`Error::Forbidden`] unless this user is an admin.
    pub fn require_admin(&self, action: &str) -> crate::error::Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "user {} is not allowed to {}",
                self.id, action
            )))
        }
    }
}

// ============================================
// Catalog
// ============================================

/// A family of meditation practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeditationType {
    pub id: i64,
    /// Display name, e.g. "Mindfulness"
    pub name: String,
    pub description: Option<String>,
    /// Free-form range text, e.g. "5-30 mins"
    pub duration_range: Option<String>,
    /// Goal tags, e.g. `["stress", "sleep"]`
    pub tags: Vec<String>,
}

/// Difficulty level of a catalog meditation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(format!("unknown difficulty: {}", s)),
        }
    }
}

/// A catalog meditation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meditation {
    pub id: i64,
    pub title: String,
    /// Nominal length in minutes
    pub duration: i64,
    pub difficulty: Difficulty,
    pub type_id: Option<i64>,
}

/// Partial update of a meditation type; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeditationTypePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_range: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl MeditationTypePatch {
    pub fn apply(&self, kind: &mut MeditationType) {
        if let Some(name) = &self.name {
            kind.name = name.clone();
        }
        if let Some(description) = &self.description {
            kind.description = Some(description.clone());
        }
        if let Some(range) = &self.duration_range {
            kind.duration_range = Some(range.clone());
        }
        if let Some(tags) = &self.tags {
            kind.tags = tags.clone();
        }
    }
}

/// Partial update of a catalog meditation; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeditationPatch {
    pub title: Option<String>,
    pub duration: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub type_id: Option<i64>,
}

impl MeditationPatch {
    pub fn apply(&self, meditation: &mut Meditation) {
        if let Some(title) = &self.title {
            meditation.title = title.clone();
        }
        if let Some(duration) = self.duration {
            meditation.duration = duration;
        }
        if let Some(difficulty) = self.difficulty {
            meditation.difficulty = difficulty;
        }
        if let Some(type_id) = self.type_id {
            meditation.type_id = Some(type_id);
        }
    }
}

// ============================================
// Sessions
// ============================================

/// A completed meditation session, joined with its meditation's type.
///
/// Read-only input to every statistic in [`crate::analytics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub meditation_id: i64,
    /// Minutes actually completed
    pub duration_completed: i64,
    /// Local wall-clock time of the session
    pub date: NaiveDateTime,
    /// Name of the meditation's type, if it has one
    pub meditation_type: Option<String>,
    /// Tags of the meditation's type, in catalog order
    pub tags: Vec<String>,
}

impl Session {
    /// Type name used for grouping, falling back to [`UNKNOWN_TYPE`].
    pub fn type_name(&self) -> &str {
        self.meditation_type.as_deref().unwrap_or(UNKNOWN_TYPE)
    }
}

/// Fields supplied when logging or editing a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub meditation_id: i64,
    pub duration_completed: i64,
    pub date: NaiveDateTime,
}

/// Inclusive timestamp window for bounded session reads.
///
/// Either end may be open; an open end places no constraint on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn between(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Window of `days` days ending at `now`.
    ///
    /// Fails with [`Error::InvalidParameter`] when the start of the window
    /// falls outside the representable calendar.
    pub fn trailing_days(now: NaiveDateTime, days: i64) -> crate::error::Result<Self> {
        let from = chrono::Duration::try_days(days)
            .and_then(|span| now.checked_sub_signed(span))
            .ok_or_else(|| {
                Error::InvalidParameter(format!("window of {} days is out of range", days))
            })?;
        Ok(Self::between(from, now))
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }
}

// ============================================
// Derived records
// ============================================

/// Persisted per-user totals and streaks.
///
/// Always fully recomputed from the user's session history:
/// `total_minutes` is the sum of every session and
/// `average_session_duration` is `total_minutes / total_sessions` (0 with no sessions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatsSummary {
    pub user_id: i64,
    pub total_minutes: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_sessions: i64,
    pub average_session_duration: f64,
    pub last_updated: DateTime<Utc>,
}

impl UserStatsSummary {
    /// All-zero summary for a user without sessions.
    pub fn empty(user_id: i64, last_updated: DateTime<Utc>) -> Self {
        Self {
            user_id,
            total_minutes: 0,
            current_streak: 0,
            longest_streak: 0,
            total_sessions: 0,
            average_session_duration: 0.0,
            last_updated,
        }
    }
}

/// Preferred session length, from the average completed duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredDuration {
    /// Average of 10 minutes or less
    Short,
    /// Average above 10 and at most 15 minutes
    Medium,
    /// Average above 15 minutes
    Long,
}

impl PreferredDuration {
    pub fn from_average_minutes(avg: f64) -> Self {
        if avg <= 10.0 {
            PreferredDuration::Short
        } else if avg <= 15.0 {
            PreferredDuration::Medium
        } else {
            PreferredDuration::Long
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferredDuration::Short => "short",
            PreferredDuration::Medium => "medium",
            PreferredDuration::Long => "long",
        }
    }
}

impl std::str::FromStr for PreferredDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(PreferredDuration::Short),
            "medium" => Ok(PreferredDuration::Medium),
            "long" => Ok(PreferredDuration::Long),
            _ => Err(format!("unknown preferred duration: {}", s)),
        }
    }
}

/// Time-of-day slot of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    /// 05:00 to 11:59
    Morning,
    /// 12:00 to 17:59
    Afternoon,
    /// 18:00 to 04:59
    Evening,
}

impl TimeSlot {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeSlot::Morning,
            12..=17 => TimeSlot::Afternoon,
            _ => TimeSlot::Evening,
        }
    }

    pub fn of(ts: NaiveDateTime) -> Self {
        Self::from_hour(ts.hour())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
        }
    }
}

impl std::str::FromStr for TimeSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(TimeSlot::Morning),
            "afternoon" => Ok(TimeSlot::Afternoon),
            "evening" => Ok(TimeSlot::Evening),
            _ => Err(format!("unknown time slot: {}", s)),
        }
    }
}

/// Persisted per-user inferred preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: i64,
    pub preferred_duration: PreferredDuration,
    pub preferred_time: TimeSlot,
    /// Up to three most frequent tags, most frequent first
    pub goals: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_role_roundtrip() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::User.as_str(), "user");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_preferred_duration_boundaries() {
        assert_eq!(
            PreferredDuration::from_average_minutes(10.0),
            PreferredDuration::Short
        );
        assert_eq!(
            PreferredDuration::from_average_minutes(10.1),
            PreferredDuration::Medium
        );
        assert_eq!(
            PreferredDuration::from_average_minutes(15.0),
            PreferredDuration::Medium
        );
        assert_eq!(
            PreferredDuration::from_average_minutes(15.1),
            PreferredDuration::Long
        );
    }

    #[test]
    fn test_time_slot_boundaries() {
        assert_eq!(TimeSlot::from_hour(4), TimeSlot::Evening);
        assert_eq!(TimeSlot::from_hour(5), TimeSlot::Morning);
        assert_eq!(TimeSlot::from_hour(11), TimeSlot::Morning);
        assert_eq!(TimeSlot::from_hour(12), TimeSlot::Afternoon);
        assert_eq!(TimeSlot::from_hour(17), TimeSlot::Afternoon);
        assert_eq!(TimeSlot::from_hour(18), TimeSlot::Evening);
        assert_eq!(TimeSlot::from_hour(0), TimeSlot::Evening);
    }

    #[test]
    fn test_session_type_name_fallback() {
        let session = Session {
            id: 1,
            user_id: 1,
            meditation_id: 1,
            duration_completed: 10,
            date: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            meditation_type: None,
            tags: vec![],
        };
        assert_eq!(session.type_name(), UNKNOWN_TYPE);
    }

    #[test]
    fn test_date_range_contains_bounds() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let range = DateRange::trailing_days(now, 7).unwrap();
        assert!(range.contains(now));
        assert!(range.contains(now - chrono::Duration::days(7)));
        assert!(!range.contains(now - chrono::Duration::days(8)));
        assert!(!range.contains(now + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_date_range_open_ends() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let since = DateRange {
            from: Some(now),
            to: None,
        };
        assert!(since.contains(now + chrono::Duration::days(10_000)));
        assert!(!since.contains(now - chrono::Duration::seconds(1)));

        let until = DateRange {
            from: None,
            to: Some(now),
        };
        assert!(until.contains(now - chrono::Duration::days(10_000)));
        assert!(!until.contains(now + chrono::Duration::seconds(1)));

        assert!(DateRange::default().is_unbounded());
    }

    #[test]
    fn test_trailing_days_out_of_range() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert!(matches!(
            DateRange::trailing_days(now, 200_000_000),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            DateRange::trailing_days(now, i64::MAX),
            Err(Error::InvalidParameter(_))
        ));
    }
}
