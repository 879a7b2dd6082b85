//! Row types written to the warehouse.
//!
//! These mirror the tables in [`super::schema`]. Optional fields map to
//! nullable columns.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    /// Duration in seconds.
    pub duration: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Artist {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionLevel {
    Free,
    Paid,
}

impl SubscriptionLevel {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SubscriptionLevel::Free => "free",
            SubscriptionLevel::Paid => "paid",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(SubscriptionLevel::Free),
            "paid" => Some(SubscriptionLevel::Paid),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: SubscriptionLevel,
}

/// Calendar breakdown of one event instant.
///
/// All fields are derived in UTC. `week` is the ISO-8601 week number, which
/// near a year boundary may belong to the neighbouring ISO year while `year`
/// stays the calendar year (2021-01-01 is week 53, year 2021). `weekday`
/// counts days from Monday, so Monday is 0 and Sunday is 6.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeRow {
    pub start_time: DateTime<Utc>,
    pub hour: u32,
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: i32,
    pub weekday: u32,
}

impl TimeRow {
    pub fn from_instant(start_time: DateTime<Utc>) -> Self {
        TimeRow {
            start_time,
            hour: start_time.hour(),
            day: start_time.day(),
            week: start_time.iso_week().week(),
            month: start_time.month(),
            year: start_time.year(),
            weekday: start_time.weekday().num_days_from_monday(),
        }
    }
}

/// Catalog identifiers of a resolved play. Song and artist always come as a
/// pair because they are found by a single joint lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogRef {
    pub song_id: String,
    pub artist_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayEvent {
    pub start_time: DateTime<Utc>,
    pub user_id: String,
    pub level: SubscriptionLevel,
    pub catalog_ref: Option<CatalogRef>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WarehouseCounts {
    pub songs: usize,
    pub artists: usize,
    pub users: usize,
    pub time: usize,
    pub songplays: usize,
}
