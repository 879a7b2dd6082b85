//! SQLite schema of the listening warehouse.
//!
//! `songs` and `artists` form the catalog dimension, `users` and `time` are
//! the event dimensions and `songplays` is the fact table. Instants are
//! stored as epoch milliseconds. No foreign keys are declared: the catalog
//! and the logs are loaded independently and can arrive in any order.

use crate::sqlite_column;
use crate::sqlite_persistence::{DatabaseSchema, SqlType, Table};

const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("song_id", SqlType::Text, is_primary_key = true),
        sqlite_column!("title", SqlType::Text, non_null = true),
        sqlite_column!("artist_id", SqlType::Text, non_null = true),
        sqlite_column!("year", SqlType::Integer, non_null = true),
        sqlite_column!("duration", SqlType::Real, non_null = true), // seconds
    ],
    indices: &[("idx_songs_title", "title")],
};

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("artist_id", SqlType::Text, is_primary_key = true),
        sqlite_column!("name", SqlType::Text, non_null = true),
        sqlite_column!("location", SqlType::Text),
        sqlite_column!("latitude", SqlType::Real),
        sqlite_column!("longitude", SqlType::Real),
    ],
    indices: &[("idx_artists_name", "name")],
};

const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("user_id", SqlType::Text, is_primary_key = true),
        sqlite_column!("first_name", SqlType::Text),
        sqlite_column!("last_name", SqlType::Text),
        sqlite_column!("gender", SqlType::Text),
        sqlite_column!("level", SqlType::Text, non_null = true), // 'free', 'paid'
    ],
    indices: &[],
};

const TIME_TABLE: Table = Table {
    name: "time",
    columns: &[
        sqlite_column!("start_time", SqlType::Integer, is_primary_key = true),
        sqlite_column!("hour", SqlType::Integer, non_null = true),
        sqlite_column!("day", SqlType::Integer, non_null = true),
        sqlite_column!("week", SqlType::Integer, non_null = true), // ISO-8601
        sqlite_column!("month", SqlType::Integer, non_null = true),
        sqlite_column!("year", SqlType::Integer, non_null = true),
        sqlite_column!("weekday", SqlType::Integer, non_null = true), // Monday = 0
    ],
    indices: &[],
};

const SONGPLAYS_TABLE: Table = Table {
    name: "songplays",
    columns: &[
        sqlite_column!("songplay_id", SqlType::Integer, is_primary_key = true),
        sqlite_column!("start_time", SqlType::Integer, non_null = true),
        sqlite_column!("user_id", SqlType::Text, non_null = true),
        sqlite_column!("level", SqlType::Text, non_null = true),
        sqlite_column!("song_id", SqlType::Text),
        sqlite_column!("artist_id", SqlType::Text),
        sqlite_column!("session_id", SqlType::Integer, non_null = true),
        sqlite_column!("location", SqlType::Text),
        sqlite_column!("user_agent", SqlType::Text),
    ],
    indices: &[
        ("idx_songplays_user", "user_id"),
        ("idx_songplays_start_time", "start_time"),
    ],
};

pub const WAREHOUSE_SCHEMA: DatabaseSchema = DatabaseSchema {
    version: 1,
    tables: &[
        SONGS_TABLE,
        ARTISTS_TABLE,
        USERS_TABLE,
        TIME_TABLE,
        SONGPLAYS_TABLE,
    ],
};
