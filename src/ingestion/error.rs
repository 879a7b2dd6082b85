use std::path::PathBuf;
use thiserror::Error;

type BoxedSinkError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while loading a source tree into the warehouse.
///
/// Everything but `NotFound` is scoped to a single file: the batch loader
/// records it, rolls that file back and moves on.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Source root not found or not a directory: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Malformed record at {}:{line}: {source}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Schema error at {}:{line}: {message}", .path.display())]
    Schema {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Warehouse rejected a write for {}: {source}", .path.display())]
    SinkWrite {
        path: PathBuf,
        #[source]
        source: BoxedSinkError,
    },

    #[error("Warehouse lookup failed for {}: {source}", .path.display())]
    SinkRead {
        path: PathBuf,
        #[source]
        source: BoxedSinkError,
    },

    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            LoadError::NotFound { path }
            | LoadError::MalformedRecord { path, .. }
            | LoadError::Schema { path, .. }
            | LoadError::SinkWrite { path, .. }
            | LoadError::SinkRead { path, .. }
            | LoadError::Io { path, .. } => path,
        }
    }

    pub(crate) fn schema(path: &std::path::Path, line: usize, message: impl Into<String>) -> Self {
        LoadError::Schema {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn sink_write(path: &std::path::Path, source: anyhow::Error) -> Self {
        LoadError::SinkWrite {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    pub(crate) fn sink_read(path: &std::path::Path, source: anyhow::Error) -> Self {
        LoadError::SinkRead {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}
