//! SQLite-backed warehouse store.
//!
//! This module provides the `SqliteWarehouse`, the rusqlite implementation of
//! [`WarehouseSink`]. It owns a single connection; the loader borrows it
//! mutably for the duration of one file's transaction.

use super::models::*;
use super::schema::WAREHOUSE_SCHEMA;
use super::trait_def::WarehouseSink;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

pub struct SqliteWarehouse {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteWarehouse {
    /// Opens (or creates) the warehouse database at `db_path`.
    ///
    /// A database without tables gets the schema created; an existing one is
    /// validated against it.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open warehouse database {}", db_path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        WAREHOUSE_SCHEMA
            .create_or_validate(&conn)
            .context("Warehouse schema check failed")?;

        let store = SqliteWarehouse {
            conn,
            in_transaction: false,
        };
        let counts = store.counts()?;
        info!(
            "Opened warehouse: {} songs, {} artists, {} users, {} songplays",
            counts.songs, counts.artists, counts.users, counts.songplays
        );
        Ok(store)
    }

    fn count_rows(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn instant_from_millis(millis: i64) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::from_timestamp_millis(millis).ok_or(rusqlite::Error::IntegralValueOutOfRange(0, millis))
    }

    fn level_from_column(index: usize, level: String) -> rusqlite::Result<SubscriptionLevel> {
        SubscriptionLevel::from_db_str(&level).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                format!("unknown subscription level '{}'", level).into(),
            )
        })
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    pub fn get_song(&self, song_id: &str) -> Result<Option<Song>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT song_id, title, artist_id, year, duration FROM songs WHERE song_id = ?1",
        )?;
        match stmt.query_row(params![song_id], |row| {
            Ok(Song {
                song_id: row.get(0)?,
                title: row.get(1)?,
                artist_id: row.get(2)?,
                year: row.get(3)?,
                duration: row.get(4)?,
            })
        }) {
            Ok(song) => Ok(Some(song)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_artist(&self, artist_id: &str) -> Result<Option<Artist>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT artist_id, name, location, latitude, longitude FROM artists WHERE artist_id = ?1",
        )?;
        match stmt.query_row(params![artist_id], |row| {
            Ok(Artist {
                artist_id: row.get(0)?,
                name: row.get(1)?,
                location: row.get(2)?,
                latitude: row.get(3)?,
                longitude: row.get(4)?,
            })
        }) {
            Ok(artist) => Ok(Some(artist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT user_id, first_name, last_name, gender, level FROM users WHERE user_id = ?1",
        )?;
        match stmt.query_row(params![user_id], |row| {
            Ok(User {
                user_id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                gender: row.get(3)?,
                level: Self::level_from_column(4, row.get(4)?)?,
            })
        }) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_time(&self, start_time: DateTime<Utc>) -> Result<Option<TimeRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT start_time, hour, day, week, month, year, weekday FROM time WHERE start_time = ?1",
        )?;
        match stmt.query_row(params![start_time.timestamp_millis()], |row| {
            Ok(TimeRow {
                start_time: Self::instant_from_millis(row.get(0)?)?,
                hour: row.get(1)?,
                day: row.get(2)?,
                week: row.get(3)?,
                month: row.get(4)?,
                year: row.get(5)?,
                weekday: row.get(6)?,
            })
        }) {
            Ok(time) => Ok(Some(time)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All play events in insertion order.
    pub fn list_play_events(&self) -> Result<Vec<PlayEvent>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT start_time, user_id, level, song_id, artist_id, session_id, location, user_agent
             FROM songplays ORDER BY songplay_id",
        )?;
        let events = stmt
            .query_map([], |row| {
                let song_id: Option<String> = row.get(3)?;
                let artist_id: Option<String> = row.get(4)?;
                let catalog_ref = match (song_id, artist_id) {
                    (Some(song_id), Some(artist_id)) => Some(CatalogRef { song_id, artist_id }),
                    _ => None,
                };
                Ok(PlayEvent {
                    start_time: Self::instant_from_millis(row.get(0)?)?,
                    user_id: row.get(1)?,
                    level: Self::level_from_column(2, row.get(2)?)?,
                    catalog_ref,
                    session_id: row.get(5)?,
                    location: row.get(6)?,
                    user_agent: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}

impl WarehouseSink for SqliteWarehouse {
    fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            bail!("A warehouse transaction is already open");
        }
        self.conn.execute_batch("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            bail!("No warehouse transaction to commit");
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            bail!("No warehouse transaction to roll back");
        }
        // Whatever happens, the connection is no longer inside our transaction.
        self.in_transaction = false;
        self.conn.execute_batch("ROLLBACK")?;
        debug!("Rolled back warehouse transaction");
        Ok(())
    }

    fn insert_song(&mut self, song: &Song) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO songs (song_id, title, artist_id, year, duration)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (song_id) DO NOTHING",
        )?;
        stmt.execute(params![
            song.song_id,
            song.title,
            song.artist_id,
            song.year,
            song.duration
        ])
        .with_context(|| format!("Failed to insert song {}", song.song_id))?;
        Ok(())
    }

    fn insert_artist(&mut self, artist: &Artist) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO artists (artist_id, name, location, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (artist_id) DO NOTHING",
        )?;
        stmt.execute(params![
            artist.artist_id,
            artist.name,
            artist.location,
            artist.latitude,
            artist.longitude
        ])
        .with_context(|| format!("Failed to insert artist {}", artist.artist_id))?;
        Ok(())
    }

    fn insert_time(&mut self, time: &TimeRow) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (start_time) DO UPDATE SET
                hour = excluded.hour,
                day = excluded.day,
                week = excluded.week,
                month = excluded.month,
                year = excluded.year,
                weekday = excluded.weekday",
        )?;
        stmt.execute(params![
            time.start_time.timestamp_millis(),
            time.hour,
            time.day,
            time.week,
            time.month,
            time.year,
            time.weekday
        ])
        .with_context(|| format!("Failed to insert time {}", time.start_time))?;
        Ok(())
    }

    fn insert_user(&mut self, user: &User) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO users (user_id, first_name, last_name, gender, level)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (user_id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                gender = excluded.gender,
                level = excluded.level",
        )?;
        stmt.execute(params![
            user.user_id,
            user.first_name,
            user.last_name,
            user.gender,
            user.level.to_db_str()
        ])
        .with_context(|| format!("Failed to insert user {}", user.user_id))?;
        Ok(())
    }

    fn insert_play_event(&mut self, event: &PlayEvent) -> Result<()> {
        let (song_id, artist_id) = match &event.catalog_ref {
            Some(r) => (Some(r.song_id.as_str()), Some(r.artist_id.as_str())),
            None => (None, None),
        };
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO songplays
                (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        stmt.execute(params![
            event.start_time.timestamp_millis(),
            event.user_id,
            event.level.to_db_str(),
            song_id,
            artist_id,
            event.session_id,
            event.location,
            event.user_agent
        ])
        .with_context(|| {
            format!(
                "Failed to insert play event of user {} at {}",
                event.user_id, event.start_time
            )
        })?;
        Ok(())
    }

    fn find_song_artist(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
        tolerance: f64,
    ) -> Result<Option<CatalogRef>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT songs.song_id, songs.artist_id
             FROM songs JOIN artists ON songs.artist_id = artists.artist_id
             WHERE songs.title = ?1 AND artists.name = ?2 AND ABS(songs.duration - ?3) <= ?4
             ORDER BY songs.song_id
             LIMIT 1",
        )?;
        match stmt.query_row(params![title, artist_name, duration, tolerance], |row| {
            Ok(CatalogRef {
                song_id: row.get(0)?,
                artist_id: row.get(1)?,
            })
        }) {
            Ok(found) => Ok(Some(found)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn counts(&self) -> Result<WarehouseCounts> {
        Ok(WarehouseCounts {
            songs: self.count_rows("songs")?,
            artists: self.count_rows("artists")?,
            users: self.count_rows("users")?,
            time: self.count_rows("time")?,
            songplays: self.count_rows("songplays")?,
        })
    }
}
