//! Activity logs to `time`, `users` and (unresolved) `songplays` rows.

use super::records::{LogRecord, Numbered};
use super::LoadError;
use crate::warehouse::{PlayEvent, SubscriptionLevel, TimeRow, User};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// `page` value of a track being played. Every other page is navigation.
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// A play event whose catalog reference still has to be looked up.
#[derive(Clone, Debug, PartialEq)]
pub struct UnresolvedPlay {
    pub event: PlayEvent,
    pub song: String,
    pub artist: String,
    /// Track length in seconds, as logged by the player.
    pub length: f64,
}

/// Rows derived from one log file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogRows {
    /// One row per distinct play instant, in first-seen order.
    pub times: Vec<TimeRow>,
    /// One row per play; the warehouse upsert keeps the last one per user.
    pub users: Vec<User>,
    pub plays: Vec<UnresolvedPlay>,
}

fn required<T>(path: &Path, line: usize, field: &str, value: Option<T>) -> Result<T, LoadError> {
    value.ok_or_else(|| {
        LoadError::schema(
            path,
            line,
            format!("{} record is missing `{}`", NEXT_SONG_PAGE, field),
        )
    })
}

pub fn is_song_play(record: &LogRecord) -> bool {
    record.page.as_deref() == Some(NEXT_SONG_PAGE)
}

/// Same check on an undecoded record, so navigation events are dropped
/// whatever the shape of their other fields.
pub fn is_song_play_value(value: &Value) -> bool {
    value.get("page").and_then(Value::as_str) == Some(NEXT_SONG_PAGE)
}

struct ValidPlay {
    start_time: DateTime<Utc>,
    user_id: String,
    level: SubscriptionLevel,
    session_id: i64,
    song: String,
    artist: String,
    length: f64,
}

fn validate_play(path: &Path, line: usize, record: &mut LogRecord) -> Result<ValidPlay, LoadError> {
    let ts = required(path, line, "ts", record.ts)?;
    let start_time = DateTime::from_timestamp_millis(ts)
        .ok_or_else(|| LoadError::schema(path, line, format!("timestamp {} is out of range", ts)))?;
    Ok(ValidPlay {
        start_time,
        user_id: required(path, line, "userId", record.user_id.take())?,
        level: required(path, line, "level", record.level)?,
        session_id: required(path, line, "sessionId", record.session_id)?,
        song: required(path, line, "song", record.song.take())?,
        artist: required(path, line, "artist", record.artist.take())?,
        length: required(path, line, "length", record.length)?,
    })
}

/// Filters a log file down to its song plays and shapes them into rows.
pub fn transform_log_file<I>(path: &Path, records: I) -> Result<LogRows, LoadError>
where
    I: IntoIterator<Item = Result<Numbered<LogRecord>, LoadError>>,
{
    let mut rows = LogRows::default();
    let mut seen_instants = HashSet::new();

    for numbered in records {
        let Numbered { line, mut record } = numbered?;
        if !is_song_play(&record) {
            continue;
        }
        let play = validate_play(path, line, &mut record)?;

        if seen_instants.insert(play.start_time) {
            rows.times.push(TimeRow::from_instant(play.start_time));
        }

        rows.users.push(User {
            user_id: play.user_id.clone(),
            first_name: record.first_name,
            last_name: record.last_name,
            gender: record.gender,
            level: play.level,
        });

        rows.plays.push(UnresolvedPlay {
            event: PlayEvent {
                start_time: play.start_time,
                user_id: play.user_id,
                level: play.level,
                catalog_ref: None,
                session_id: play.session_id,
                location: record.location,
                user_agent: record.user_agent,
            },
            song: play.song,
            artist: play.artist,
            length: play.length,
        });
    }

    Ok(rows)
}
