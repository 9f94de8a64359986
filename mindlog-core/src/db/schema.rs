//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 3;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Initial schema
    r#"
    -- ============================================
    -- Catalog and session log
    -- ============================================

    CREATE TABLE IF NOT EXISTS users (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        email            TEXT NOT NULL UNIQUE,
        is_active        INTEGER NOT NULL DEFAULT 1,
        created_at       TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS meditation_types (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        name             TEXT NOT NULL,
        description      TEXT,
        duration_range   TEXT,
        tags             JSON NOT NULL DEFAULT '[]'
    );

    CREATE TABLE IF NOT EXISTS meditations (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        title            TEXT NOT NULL,
        duration         INTEGER NOT NULL CHECK (duration >= 0),
        difficulty       TEXT NOT NULL,
        type_id          INTEGER REFERENCES meditation_types(id)
    );

    CREATE TABLE IF NOT EXISTS sessions (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id            INTEGER NOT NULL REFERENCES users(id),
        meditation_id      INTEGER NOT NULL REFERENCES meditations(id),
        duration_completed INTEGER NOT NULL CHECK (duration_completed >= 0),
        date               TEXT NOT NULL
    );

    -- ============================================
    -- Derived (regenerable)
    -- ============================================

    CREATE TABLE IF NOT EXISTS user_stats (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id          INTEGER NOT NULL UNIQUE REFERENCES users(id),
        total_minutes    INTEGER NOT NULL DEFAULT 0,
        current_streak   INTEGER NOT NULL DEFAULT 0,
        longest_streak   INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS user_preferences (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id            INTEGER NOT NULL UNIQUE REFERENCES users(id),
        preferred_duration TEXT NOT NULL,
        preferred_time     TEXT NOT NULL,
        goals              JSON NOT NULL DEFAULT '[]'
    );

    -- ============================================
    -- Indexes
    -- ============================================

    CREATE INDEX IF NOT EXISTS idx_sessions_user_date ON sessions(user_id, date);
    CREATE INDEX IF NOT EXISTS idx_meditations_type ON meditations(type_id);
    "#,
    // Version 2: User roles
    r#"
    ALTER TABLE users ADD COLUMN role TEXT NOT NULL DEFAULT 'user';
    "#,
    // Version 3: Session counters and refresh timestamp on user_stats
    r#"
    ALTER TABLE user_stats ADD COLUMN total_sessions INTEGER NOT NULL DEFAULT 0;
    ALTER TABLE user_stats ADD COLUMN average_session_duration REAL NOT NULL DEFAULT 0.0;
    ALTER TABLE user_stats ADD COLUMN last_updated TEXT;

    UPDATE user_stats
    SET last_updated = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
    WHERE last_updated IS NULL;

    CREATE INDEX IF NOT EXISTS idx_user_stats_minutes ON user_stats(total_minutes DESC);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version = get_schema_version(conn)?;

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
