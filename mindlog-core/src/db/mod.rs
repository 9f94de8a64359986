//! Database layer for mindlog
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for queries
//! - The [`crate::analytics::StatsStore`] implementation used by the stats engine

pub mod repo;
pub mod schema;

pub use repo::Database;
