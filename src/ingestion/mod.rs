//! Source tree ingestion: discovery, decoding, shaping, resolution and
//! per-file transactional loading.

mod catalog_transform;
mod discovery;
mod error;
mod event_transform;
mod loader;
mod records;
mod resolver;

pub use catalog_transform::{song_and_artist, transform_catalog_file};
pub use discovery::{discover_source_files, SourceFiles};
pub use error::LoadError;
pub use event_transform::{
    is_song_play, is_song_play_value, transform_log_file, LogRows, UnresolvedPlay, NEXT_SONG_PAGE,
};
pub use loader::{
    BatchLoader, CatalogFileProcessor, FileFailure, FileProcessor, LoadOptions, LoadReport,
    LogFileProcessor, RowBatch,
};
pub use records::{
    read_records, read_records_where, LogRecord, Numbered, RecordReader, SongRecord,
};
pub use resolver::Resolver;
