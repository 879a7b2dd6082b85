//! Batch loading of a source tree into the warehouse.
//!
//! Each file becomes one [`RowBatch`], written inside its own warehouse
//! transaction. A file either lands completely or not at all; files already
//! committed stay committed when a later one fails.

use super::catalog_transform::transform_catalog_file;
use super::discovery::discover_source_files;
use super::event_transform::{is_song_play_value, transform_log_file};
use super::records::{read_records, read_records_where, LogRecord, SongRecord};
use super::resolver::Resolver;
use super::LoadError;
use crate::warehouse::{Artist, PlayEvent, Song, TimeRow, User, WarehouseCounts, WarehouseSink};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// All rows derived from one source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowBatch {
    pub songs: Vec<Song>,
    pub artists: Vec<Artist>,
    pub times: Vec<TimeRow>,
    pub users: Vec<User>,
    pub play_events: Vec<PlayEvent>,
}

impl RowBatch {
    /// Writes every row. The caller owns the surrounding transaction.
    pub fn write_to<S: WarehouseSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        for song in &self.songs {
            sink.insert_song(song)?;
        }
        for artist in &self.artists {
            sink.insert_artist(artist)?;
        }
        for time in &self.times {
            sink.insert_time(time)?;
        }
        for user in &self.users {
            sink.insert_user(user)?;
        }
        for event in &self.play_events {
            sink.insert_play_event(event)?;
        }
        Ok(())
    }

    pub fn row_counts(&self) -> WarehouseCounts {
        WarehouseCounts {
            songs: self.songs.len(),
            artists: self.artists.len(),
            users: self.users.len(),
            time: self.times.len(),
            songplays: self.play_events.len(),
        }
    }

    pub fn resolved_count(&self) -> usize {
        self.play_events
            .iter()
            .filter(|e| e.catalog_ref.is_some())
            .count()
    }
}

/// Turns one source file into rows.
///
/// The sink is only borrowed for reads here; writes happen in the loader once
/// the whole file has been transformed.
pub trait FileProcessor {
    /// Short name for log lines ("catalog", "log").
    fn kind(&self) -> &'static str;

    fn process_file<S: WarehouseSink + ?Sized>(
        &self,
        path: &Path,
        sink: &S,
    ) -> Result<RowBatch, LoadError>;
}

/// Song catalog files: one song and its artist per file.
#[derive(Clone, Copy, Debug, Default)]
pub struct CatalogFileProcessor;

impl FileProcessor for CatalogFileProcessor {
    fn kind(&self) -> &'static str {
        "catalog"
    }

    fn process_file<S: WarehouseSink + ?Sized>(
        &self,
        path: &Path,
        _sink: &S,
    ) -> Result<RowBatch, LoadError> {
        let (song, artist) = transform_catalog_file(path, read_records::<SongRecord>(path)?)?;
        Ok(RowBatch {
            songs: vec![song],
            artists: vec![artist],
            ..Default::default()
        })
    }
}

/// Activity log files: song plays, resolved against the loaded catalog.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogFileProcessor {
    pub resolver: Resolver,
}

impl FileProcessor for LogFileProcessor {
    fn kind(&self) -> &'static str {
        "log"
    }

    fn process_file<S: WarehouseSink + ?Sized>(
        &self,
        path: &Path,
        sink: &S,
    ) -> Result<RowBatch, LoadError> {
        let records = read_records_where::<LogRecord>(path, is_song_play_value)?;
        let rows = transform_log_file(path, records)?;
        let play_events = self
            .resolver
            .resolve_plays(sink, rows.plays)
            .map_err(|e| LoadError::sink_read(path, e))?;
        Ok(RowBatch {
            times: rows.times,
            users: rows.users,
            play_events,
            ..Default::default()
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LoadOptions {
    /// Keep going after a file fails. When false the first failure stops the
    /// run; files committed before it stay committed.
    pub continue_on_error: bool,
    /// Roll every file back instead of committing it.
    pub dry_run: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            continue_on_error: true,
            dry_run: false,
        }
    }
}

#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: LoadError,
}

/// Outcome of loading one source root.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub root: PathBuf,
    pub files_found: usize,
    pub files_processed: usize,
    pub failures: Vec<FileFailure>,
    /// Rows handed to the warehouse. Ignored duplicates are included.
    pub rows_written: WarehouseCounts,
    pub resolved: usize,
    pub unresolved: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn add_batch(&mut self, batch: &RowBatch) {
        let counts = batch.row_counts();
        self.rows_written.songs += counts.songs;
        self.rows_written.artists += counts.artists;
        self.rows_written.users += counts.users;
        self.rows_written.time += counts.time;
        self.rows_written.songplays += counts.songplays;
        let resolved = batch.resolved_count();
        self.resolved += resolved;
        self.unresolved += counts.songplays - resolved;
    }
}

/// Runs files through a [`FileProcessor`] and into the warehouse, one
/// transaction per file.
pub struct BatchLoader<'a, S: WarehouseSink + ?Sized> {
    sink: &'a mut S,
    options: LoadOptions,
}

impl<'a, S: WarehouseSink + ?Sized> BatchLoader<'a, S> {
    pub fn new(sink: &'a mut S, options: LoadOptions) -> Self {
        BatchLoader { sink, options }
    }

    /// Loads every source file below `root`.
    ///
    /// Only a missing root fails the whole call, unless `continue_on_error`
    /// is off, in which case the first file error is returned as well.
    pub fn load<P: FileProcessor>(
        &mut self,
        root: &Path,
        processor: &P,
    ) -> Result<LoadReport, LoadError> {
        let files: Vec<PathBuf> = discover_source_files(root)?.collect();
        let total = files.len();
        info!("{} {} files found in {}", total, processor.kind(), root.display());

        let mut report = LoadReport {
            root: root.to_path_buf(),
            files_found: total,
            ..Default::default()
        };

        for (index, path) in files.into_iter().enumerate() {
            match self.load_file(&path, processor) {
                Ok(batch) => {
                    report.files_processed += 1;
                    report.add_batch(&batch);
                }
                Err(e) => {
                    error!("Failed to load {}: {}", path.display(), e);
                    if !self.options.continue_on_error {
                        return Err(e);
                    }
                    report.failures.push(FileFailure { path, error: e });
                }
            }
            info!("{}/{} files processed.", index + 1, total);
        }

        if !report.is_clean() {
            warn!(
                "{} of {} {} files failed in {}",
                report.failures.len(),
                total,
                processor.kind(),
                root.display()
            );
        }
        Ok(report)
    }

    fn load_file<P: FileProcessor>(&mut self, path: &Path, processor: &P) -> Result<RowBatch, LoadError> {
        let batch = processor.process_file(path, &*self.sink)?;

        self.sink
            .begin()
            .map_err(|e| LoadError::sink_write(path, e))?;

        let written = batch.write_to(&mut *self.sink).and_then(|()| {
            if self.options.dry_run {
                self.sink.rollback()
            } else {
                self.sink.commit()
            }
        });

        if let Err(e) = written {
            if let Err(rollback_err) = self.sink.rollback() {
                // Expected when the commit itself already ended the transaction.
                warn!(
                    "Rollback after failed write to {} did not run: {}",
                    path.display(),
                    rollback_err
                );
            }
            return Err(LoadError::sink_write(path, e));
        }
        Ok(batch)
    }
}
