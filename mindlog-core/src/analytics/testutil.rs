//! Session builders shared by the analytics unit tests.

use chrono::{NaiveDate, NaiveDateTime};

use crate::types::Session;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    day(y, m, d).and_hms_opt(h, 0, 0).unwrap()
}

/// Session with a type name and no tags.
pub fn session(y: i32, m: u32, d: u32, h: u32, minutes: i64, kind: &str) -> Session {
    tagged(y, m, d, h, minutes, kind, &[])
}

/// Session with a type name and tags.
pub fn tagged(
    y: i32,
    m: u32,
    d: u32,
    h: u32,
    minutes: i64,
    kind: &str,
    tags: &[&str],
) -> Session {
    Session {
        id: 0,
        user_id: 1,
        meditation_id: 1,
        duration_completed: minutes,
        date: at(y, m, d, h),
        meditation_type: Some(kind.to_string()),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}
