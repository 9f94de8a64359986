//! Database repository layer
//!
//! Provides query and insert operations for all entity types.

use crate::analytics::StatsStore;
use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Columns selected for every session read: the session row joined with its
/// meditation's type name and tags.
const SESSION_SELECT: &str = r#"
    SELECT s.id, s.user_id, s.meditation_id, s.duration_completed, s.date,
           mt.name AS type_name, mt.tags AS type_tags
    FROM sessions s
    JOIN meditations m ON m.id = s.meditation_id
    LEFT JOIN meditation_types mt ON mt.id = m.type_id
"#;

/// Database handle with connection pooling (single connection for now)
///
/// All access goes through one mutex-guarded connection, so writes for the
/// same user are serialized.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied statement
        // behind, so a poisoned guard is still usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================
    // User operations
    // ============================================

    /// Register a user
    pub fn create_user(&self, email: &str, role: Role) -> Result<User> {
        let conn = self.connection();
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO users (email, role, is_active, created_at) VALUES (?1, ?2, 1, ?3)",
            params![email, role.as_str(), created_at.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(user_id = id, role = role.as_str(), "User created");
        Ok(User {
            id,
            email: email.to_string(),
            role,
            is_active: true,
            created_at,
        })
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.connection();
        conn.query_row("SELECT * FROM users WHERE id = ?", [id], Self::row_to_user)
            .optional()
            .map_err(Error::from)
    }

    /// Get a user by ID, failing with [`Error::UserNotFound`]
    pub fn require_user(&self, id: i64) -> Result<User> {
        self.get_user(id)?.ok_or(Error::UserNotFound(id))
    }

    /// List all users ordered by ID
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT * FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        let role_str: String = row.get("role")?;
        let created_at_str: String = row.get("created_at")?;
        let is_active: i64 = row.get("is_active")?;

        Ok(User {
            id: row.get("id")?,
            email: row.get("email")?,
            role: role_str.parse().unwrap_or_default(),
            is_active: is_active != 0,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    // ============================================
    // Catalog operations
    // ============================================

    /// Insert a meditation type
    pub fn create_meditation_type(
        &self,
        name: &str,
        description: Option<&str>,
        duration_range: Option<&str>,
        tags: &[String],
    ) -> Result<MeditationType> {
        let tags_json = serde_json::to_string(tags)?;
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO meditation_types (name, description, duration_range, tags)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![name, description, duration_range, tags_json],
        )?;
        Ok(MeditationType {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            duration_range: duration_range.map(str::to_string),
            tags: tags.to_vec(),
        })
    }

    /// Get a meditation type by ID
    pub fn get_meditation_type(&self, id: i64) -> Result<Option<MeditationType>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT * FROM meditation_types WHERE id = ?",
            [id],
            Self::row_to_meditation_type,
        )
        .optional()
        .map_err(Error::from)
    }

    /// List meditation types ordered by name
    pub fn list_meditation_types(&self) -> Result<Vec<MeditationType>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT * FROM meditation_types ORDER BY name, id")?;
        let types = stmt
            .query_map([], Self::row_to_meditation_type)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(types)
    }

    /// Apply a partial update to a meditation type
    pub fn update_meditation_type(
        &self,
        id: i64,
        patch: &MeditationTypePatch,
    ) -> Result<MeditationType> {
        let mut kind = self
            .get_meditation_type(id)?
            .ok_or(Error::MeditationTypeNotFound(id))?;
        patch.apply(&mut kind);

        let tags_json = serde_json::to_string(&kind.tags)?;
        let conn = self.connection();
        conn.execute(
            r#"
            UPDATE meditation_types
            SET name = ?1, description = ?2, duration_range = ?3, tags = ?4
            WHERE id = ?5
            "#,
            params![kind.name, kind.description, kind.duration_range, tags_json, id],
        )?;
        tracing::info!(type_id = id, "Meditation type updated");
        Ok(kind)
    }

    /// Delete a meditation type that no meditation refers to
    pub fn delete_meditation_type(&self, id: i64) -> Result<()> {
        let conn = self.connection();
        let in_use: i64 = conn.query_row(
            "SELECT COUNT(*) FROM meditations WHERE type_id = ?",
            [id],
            |r| r.get(0),
        )?;
        if in_use > 0 {
            return Err(Error::InvalidParameter(format!(
                "meditation type {} is still used by {} meditation(s)",
                id, in_use
            )));
        }
        let deleted = conn.execute("DELETE FROM meditation_types WHERE id = ?", [id])?;
        if deleted == 0 {
            return Err(Error::MeditationTypeNotFound(id));
        }
        tracing::info!(type_id = id, "Meditation type deleted");
        Ok(())
    }

    fn row_to_meditation_type(row: &Row) -> rusqlite::Result<MeditationType> {
        let tags_str: Option<String> = row.get("tags")?;
        Ok(MeditationType {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            duration_range: row.get("duration_range")?,
            tags: parse_tags(tags_str.as_deref()),
        })
    }

    /// Insert a catalog meditation
    pub fn create_meditation(
        &self,
        title: &str,
        duration: i64,
        difficulty: Difficulty,
        type_id: Option<i64>,
    ) -> Result<Meditation> {
        if duration < 0 {
            return Err(Error::InvalidParameter(format!(
                "meditation duration must be non-negative, got {}",
                duration
            )));
        }
        if let Some(type_id) = type_id {
            if self.get_meditation_type(type_id)?.is_none() {
                return Err(Error::MeditationTypeNotFound(type_id));
            }
        }

        let conn = self.connection();
        conn.execute(
            "INSERT INTO meditations (title, duration, difficulty, type_id) VALUES (?1, ?2, ?3, ?4)",
            params![title, duration, difficulty.as_str(), type_id],
        )?;
        Ok(Meditation {
            id: conn.last_insert_rowid(),
            title: title.to_string(),
            duration,
            difficulty,
            type_id,
        })
    }

    /// Get a meditation by ID
    pub fn get_meditation(&self, id: i64) -> Result<Option<Meditation>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT * FROM meditations WHERE id = ?",
            [id],
            Self::row_to_meditation,
        )
        .optional()
        .map_err(Error::from)
    }

    /// List meditations ordered by ID
    pub fn list_meditations(&self) -> Result<Vec<Meditation>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT * FROM meditations ORDER BY id")?;
        let meditations = stmt
            .query_map([], Self::row_to_meditation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(meditations)
    }

    /// Apply a partial update to a catalog meditation
    pub fn update_meditation(&self, id: i64, patch: &MeditationPatch) -> Result<Meditation> {
        let mut meditation = self
            .get_meditation(id)?
            .ok_or(Error::MeditationNotFound(id))?;
        patch.apply(&mut meditation);

        if meditation.duration < 0 {
            return Err(Error::InvalidParameter(format!(
                "meditation duration must be non-negative, got {}",
                meditation.duration
            )));
        }
        if let Some(type_id) = patch.type_id {
            if self.get_meditation_type(type_id)?.is_none() {
                return Err(Error::MeditationTypeNotFound(type_id));
            }
        }

        let conn = self.connection();
        conn.execute(
            r#"
            UPDATE meditations
            SET title = ?1, duration = ?2, difficulty = ?3, type_id = ?4
            WHERE id = ?5
            "#,
            params![
                meditation.title,
                meditation.duration,
                meditation.difficulty.as_str(),
                meditation.type_id,
                id,
            ],
        )?;
        tracing::info!(meditation_id = id, "Meditation updated");
        Ok(meditation)
    }

    /// Delete a catalog meditation that has no logged sessions
    pub fn delete_meditation(&self, id: i64) -> Result<()> {
        let conn = self.connection();
        let in_use: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE meditation_id = ?",
            [id],
            |r| r.get(0),
        )?;
        if in_use > 0 {
            return Err(Error::InvalidParameter(format!(
                "meditation {} still has {} logged session(s)",
                id, in_use
            )));
        }
        let deleted = conn.execute("DELETE FROM meditations WHERE id = ?", [id])?;
        if deleted == 0 {
            return Err(Error::MeditationNotFound(id));
        }
        tracing::info!(meditation_id = id, "Meditation deleted");
        Ok(())
    }

    fn row_to_meditation(row: &Row) -> rusqlite::Result<Meditation> {
        let difficulty_str: String = row.get("difficulty")?;
        Ok(Meditation {
            id: row.get("id")?,
            title: row.get("title")?,
            duration: row.get("duration")?,
            difficulty: difficulty_str
                .parse()
                .map_err(|e: String| conversion_error(3, e))?,
            type_id: row.get("type_id")?,
        })
    }

    // ============================================
    // Session operations
    // ============================================

    /// Log a session for a user
    pub fn insert_session(&self, user_id: i64, session: &NewSession) -> Result<Session> {
        self.validate_new_session(user_id, session)?;

        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO sessions (user_id, meditation_id, duration_completed, date)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                user_id,
                session.meditation_id,
                session.duration_completed,
                format_session_date(session.date),
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(user_id, session_id = id, "Session logged");
        Self::fetch_session(&conn, user_id, id)?.ok_or(Error::SessionNotFound(id))
    }

    /// Overwrite a session owned by `user_id`
    pub fn update_session(
        &self,
        user_id: i64,
        session_id: i64,
        session: &NewSession,
    ) -> Result<Session> {
        self.validate_new_session(user_id, session)?;

        let conn = self.connection();
        let updated = conn.execute(
            r#"
            UPDATE sessions
            SET meditation_id = ?1, duration_completed = ?2, date = ?3
            WHERE id = ?4 AND user_id = ?5
            "#,
            params![
                session.meditation_id,
                session.duration_completed,
                format_session_date(session.date),
                session_id,
                user_id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::SessionNotFound(session_id));
        }
        Self::fetch_session(&conn, user_id, session_id)?.ok_or(Error::SessionNotFound(session_id))
    }

    /// Delete a session owned by `user_id`
    pub fn delete_session(&self, user_id: i64, session_id: i64) -> Result<()> {
        let conn = self.connection();
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE id = ?1 AND user_id = ?2",
            params![session_id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::SessionNotFound(session_id));
        }
        tracing::debug!(user_id, session_id, "Session deleted");
        Ok(())
    }

    /// Get a session owned by `user_id`
    pub fn get_session(&self, user_id: i64, session_id: i64) -> Result<Option<Session>> {
        let conn = self.connection();
        Self::fetch_session(&conn, user_id, session_id)
    }

    /// List a user's sessions in ascending date order, optionally bounded
    pub fn list_sessions(&self, user_id: i64, range: Option<&DateRange>) -> Result<Vec<Session>> {
        let conn = self.connection();

        let mut sql = format!("{} WHERE s.user_id = ?", SESSION_SELECT);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(from) = range.and_then(|r| r.from) {
            sql.push_str(" AND s.date >= ?");
            params.push(Box::new(format_session_date(from)));
        }
        if let Some(to) = range.and_then(|r| r.to) {
            sql.push_str(" AND s.date <= ?");
            params.push(Box::new(format_session_date(to)));
        }

        sql.push_str(" ORDER BY s.date, s.id");

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let sessions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    fn validate_new_session(&self, user_id: i64, session: &NewSession) -> Result<()> {
        if session.duration_completed < 0 {
            return Err(Error::InvalidParameter(format!(
                "duration_completed must be non-negative, got {}",
                session.duration_completed
            )));
        }
        self.require_user(user_id)?;
        if self.get_meditation(session.meditation_id)?.is_none() {
            return Err(Error::MeditationNotFound(session.meditation_id));
        }
        Ok(())
    }

    fn fetch_session(conn: &Connection, user_id: i64, session_id: i64) -> Result<Option<Session>> {
        let sql = format!("{} WHERE s.id = ?1 AND s.user_id = ?2", SESSION_SELECT);
        conn.query_row(&sql, params![session_id, user_id], Self::row_to_session)
            .optional()
            .map_err(Error::from)
    }

    fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
        let date_str: String = row.get("date")?;
        let tags_str: Option<String> = row.get("type_tags")?;

        Ok(Session {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            meditation_id: row.get("meditation_id")?,
            duration_completed: row.get("duration_completed")?,
            date: NaiveDateTime::parse_from_str(&date_str, SESSION_DATE_FORMAT)
                .map_err(|e| conversion_error(4, e.to_string()))?,
            meditation_type: row.get("type_name")?,
            tags: parse_tags(tags_str.as_deref()),
        })
    }

    /// IDs of every user with at least one session
    pub fn users_with_sessions(&self) -> Result<Vec<i64>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT DISTINCT user_id FROM sessions ORDER BY user_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    // ============================================
    // Stats summary operations
    // ============================================

    /// Get the stored summary for a user
    pub fn get_summary(&self, user_id: i64) -> Result<Option<UserStatsSummary>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT * FROM user_stats WHERE user_id = ?",
            [user_id],
            Self::row_to_summary,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Insert or overwrite the summary for a user
    pub fn upsert_summary(&self, summary: &UserStatsSummary) -> Result<()> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO user_stats (user_id, total_minutes, current_streak, longest_streak,
                                    total_sessions, average_session_duration, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id) DO UPDATE SET
                total_minutes = excluded.total_minutes,
                current_streak = excluded.current_streak,
                longest_streak = excluded.longest_streak,
                total_sessions = excluded.total_sessions,
                average_session_duration = excluded.average_session_duration,
                last_updated = excluded.last_updated
            "#,
            params![
                summary.user_id,
                summary.total_minutes,
                summary.current_streak,
                summary.longest_streak,
                summary.total_sessions,
                summary.average_session_duration,
                summary.last_updated.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete the summary for a user. Returns whether a row existed.
    pub fn delete_summary(&self, user_id: i64) -> Result<bool> {
        let conn = self.connection();
        let deleted = conn.execute("DELETE FROM user_stats WHERE user_id = ?", [user_id])?;
        Ok(deleted > 0)
    }

    /// All stored summaries, most minutes first
    pub fn list_summaries(&self) -> Result<Vec<UserStatsSummary>> {
        let conn = self.connection();
        let mut stmt =
            conn.prepare("SELECT * FROM user_stats ORDER BY total_minutes DESC, user_id")?;
        let summaries = stmt
            .query_map([], Self::row_to_summary)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    fn row_to_summary(row: &Row) -> rusqlite::Result<UserStatsSummary> {
        let last_updated_str: Option<String> = row.get("last_updated")?;
        Ok(UserStatsSummary {
            user_id: row.get("user_id")?,
            total_minutes: row.get("total_minutes")?,
            current_streak: row.get("current_streak")?,
            longest_streak: row.get("longest_streak")?,
            total_sessions: row.get("total_sessions")?,
            average_session_duration: row.get("average_session_duration")?,
            last_updated: last_updated_str
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now),
        })
    }

    // ============================================
    // Preference operations
    // ============================================

    /// Get the stored preferences for a user
    pub fn get_preferences(&self, user_id: i64) -> Result<Option<UserPreferences>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT * FROM user_preferences WHERE user_id = ?",
            [user_id],
            Self::row_to_preferences,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Insert or overwrite the preferences for a user
    pub fn upsert_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        let goals_json = serde_json::to_string(&prefs.goals)?;
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO user_preferences (user_id, preferred_duration, preferred_time, goals)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id) DO UPDATE SET
                preferred_duration = excluded.preferred_duration,
                preferred_time = excluded.preferred_time,
                goals = excluded.goals
            "#,
            params![
                prefs.user_id,
                prefs.preferred_duration.as_str(),
                prefs.preferred_time.as_str(),
                goals_json,
            ],
        )?;
        Ok(())
    }

    /// Delete the preferences for a user. Returns whether a row existed.
    pub fn delete_preferences(&self, user_id: i64) -> Result<bool> {
        let conn = self.connection();
        let deleted = conn.execute("DELETE FROM user_preferences WHERE user_id = ?", [user_id])?;
        Ok(deleted > 0)
    }

    fn row_to_preferences(row: &Row) -> rusqlite::Result<UserPreferences> {
        let duration_str: String = row.get("preferred_duration")?;
        let time_str: String = row.get("preferred_time")?;
        let goals_str: Option<String> = row.get("goals")?;

        Ok(UserPreferences {
            user_id: row.get("user_id")?,
            preferred_duration: duration_str
                .parse()
                .map_err(|e: String| conversion_error(2, e))?,
            preferred_time: time_str
                .parse()
                .map_err(|e: String| conversion_error(3, e))?,
            goals: parse_tags(goals_str.as_deref()),
        })
    }
}

impl StatsStore for Database {
    fn sessions_for_user(&self, user_id: i64, range: Option<&DateRange>) -> Result<Vec<Session>> {
        self.list_sessions(user_id, range)
    }

    fn users_with_sessions(&self) -> Result<Vec<i64>> {
        Database::users_with_sessions(self)
    }

    fn get_summary(&self, user_id: i64) -> Result<Option<UserStatsSummary>> {
        Database::get_summary(self, user_id)
    }

    fn upsert_summary(&self, summary: &UserStatsSummary) -> Result<()> {
        Database::upsert_summary(self, summary)
    }

    fn delete_summary(&self, user_id: i64) -> Result<bool> {
        Database::delete_summary(self, user_id)
    }

    fn list_summaries(&self) -> Result<Vec<UserStatsSummary>> {
        Database::list_summaries(self)
    }

    fn get_preferences(&self, user_id: i64) -> Result<Option<UserPreferences>> {
        Database::get_preferences(self, user_id)
    }

    fn upsert_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        Database::upsert_preferences(self, prefs)
    }

    fn delete_preferences(&self, user_id: i64) -> Result<bool> {
        Database::delete_preferences(self, user_id)
    }
}

fn format_session_date(ts: NaiveDateTime) -> String {
    ts.format(SESSION_DATE_FORMAT).to_string()
}

fn parse_tags(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}
