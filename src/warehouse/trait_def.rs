//! WarehouseSink trait definition.
//!
//! The loading pipeline only talks to the store through this trait, so the
//! relational backend stays an external collaborator.

use super::models::{Artist, CatalogRef, PlayEvent, Song, TimeRow, User, WarehouseCounts};
use anyhow::Result;

/// Relational sink the batch loader writes to and resolves references against.
///
/// Writes happen inside an explicit transaction opened with [`begin`] and
/// closed with either [`commit`] or [`rollback`]. At most one transaction is
/// open at a time.
///
/// [`begin`]: WarehouseSink::begin
/// [`commit`]: WarehouseSink::commit
/// [`rollback`]: WarehouseSink::rollback
pub trait WarehouseSink {
    // =========================================================================
    // Transaction Scope
    // =========================================================================

    /// Opens a transaction. Fails if one is already open.
    fn begin(&mut self) -> Result<()>;

    /// Durably ends the open transaction.
    fn commit(&mut self) -> Result<()>;

    /// Discards every write since [`WarehouseSink::begin`].
    fn rollback(&mut self) -> Result<()>;

    // =========================================================================
    // Catalog Writes (insert-or-ignore)
    // =========================================================================

    fn insert_song(&mut self, song: &Song) -> Result<()>;

    fn insert_artist(&mut self, artist: &Artist) -> Result<()>;

    // =========================================================================
    // Event Writes
    // =========================================================================

    /// Upserts a time row keyed by its instant.
    fn insert_time(&mut self, time: &TimeRow) -> Result<()>;

    /// Upserts a user. Names, gender and level of an existing user are replaced.
    fn insert_user(&mut self, user: &User) -> Result<()>;

    /// Appends a play event.
    fn insert_play_event(&mut self, event: &PlayEvent) -> Result<()>;

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Finds the song and artist whose title, artist name and duration match.
    /// Durations match when they differ by at most `tolerance` seconds.
    fn find_song_artist(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
        tolerance: f64,
    ) -> Result<Option<CatalogRef>>;

    /// Number of rows in each table.
    fn counts(&self) -> Result<WarehouseCounts>;
}
