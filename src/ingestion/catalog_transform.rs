//! Song catalog files to `songs` and `artists` rows.

use super::records::{Numbered, SongRecord};
use super::LoadError;
use crate::warehouse::{Artist, Song};
use std::path::Path;
use tracing::warn;

pub fn song_and_artist(record: SongRecord) -> (Song, Artist) {
    let song = Song {
        song_id: record.song_id,
        title: record.title,
        artist_id: record.artist_id.clone(),
        year: record.year,
        duration: record.duration,
    };
    let artist = Artist {
        artist_id: record.artist_id,
        name: record.artist_name,
        location: record
            .artist_location
            .filter(|location| !location.trim().is_empty()),
        latitude: record.artist_latitude,
        longitude: record.artist_longitude,
    };
    (song, artist)
}

/// Turns the records of one catalog file into its song and artist.
///
/// Catalog files describe a single song. Every line is still decoded so a
/// broken file is rejected as a whole, but only the first record is used.
pub fn transform_catalog_file<I>(path: &Path, records: I) -> Result<(Song, Artist), LoadError>
where
    I: IntoIterator<Item = Result<Numbered<SongRecord>, LoadError>>,
{
    let mut first = None;
    let mut extra = 0usize;
    for record in records {
        let record = record?;
        if first.is_none() {
            first = Some(record.record);
        } else {
            extra += 1;
        }
    }

    if extra > 0 {
        warn!(
            "{} holds {} extra song records, only the first one is loaded",
            path.display(),
            extra
        );
    }

    first
        .map(song_and_artist)
        .ok_or_else(|| LoadError::schema(path, 0, "empty catalog file"))
}
