//! # mindlog-core
//!
//! Core library for mindlog - a meditation practice tracker.
//!
//! This library provides:
//! - Domain types for users, the meditation catalog, and sessions
//! - Admin-gated catalog management
//! - Database storage layer with SQLite
//! - The statistics engine: streaks, summaries, rollups, analytics, charts
//! - Preference inference
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use mindlog_core::analytics::StatsService;
//! use mindlog_core::{Config, Database};
//!
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let service = StatsService::new(&db);
//! let summary = service.stats(1).expect("failed to compute stats");
//! println!("{} minutes", summary.total_minutes);
//! ```

// Re-export commonly used items at the crate root
pub use catalog::CatalogService;
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
