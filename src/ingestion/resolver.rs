//! Play event to catalog reference resolution.

use super::event_transform::UnresolvedPlay;
use crate::warehouse::{CatalogRef, PlayEvent, WarehouseSink};
use anyhow::{bail, Result};
use tracing::debug;

/// Matches played tracks against the catalog already committed to the
/// warehouse.
///
/// A play matches a song when the title and the artist name are equal and
/// the durations differ by at most `duration_tolerance` seconds. The default
/// tolerance of zero asks for exact equality.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolver {
    duration_tolerance: f64,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver {
            duration_tolerance: 0.0,
        }
    }
}

impl Resolver {
    pub fn with_tolerance(duration_tolerance: f64) -> Result<Self> {
        if !duration_tolerance.is_finite() || duration_tolerance < 0.0 {
            bail!(
                "Duration tolerance must be a finite, non-negative number of seconds, got {}",
                duration_tolerance
            );
        }
        Ok(Resolver { duration_tolerance })
    }

    pub fn duration_tolerance(&self) -> f64 {
        self.duration_tolerance
    }

    /// Looks up one play. `Ok(None)` is a miss, not a failure.
    pub fn resolve<S: WarehouseSink + ?Sized>(
        &self,
        sink: &S,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<CatalogRef>> {
        let found = sink.find_song_artist(title, artist_name, duration, self.duration_tolerance)?;
        if found.is_none() {
            debug!(
                "No catalog match for \"{}\" by \"{}\" ({}s)",
                title, artist_name, duration
            );
        }
        Ok(found)
    }

    /// Resolves every play with one lookup each, in order.
    pub fn resolve_plays<S: WarehouseSink + ?Sized>(
        &self,
        sink: &S,
        plays: Vec<UnresolvedPlay>,
    ) -> Result<Vec<PlayEvent>> {
        plays
            .into_iter()
            .map(|play| {
                let catalog_ref = self.resolve(sink, &play.song, &play.artist, play.length)?;
                Ok(PlayEvent {
                    catalog_ref,
                    ..play.event
                })
            })
            .collect()
    }
}
