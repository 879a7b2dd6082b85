//! Source file discovery.

use super::LoadError;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

const SOURCE_EXTENSION: &str = "json";

/// Lazy iterator over every `*.json` file below a root directory.
///
/// Within each directory its own files come first, in file-name order, and
/// only then its subdirectories, also by name. Two walks of the same tree
/// yield the same sequence. Hidden files are skipped, like a shell glob would.
pub struct SourceFiles {
    walker: walkdir::IntoIter,
}

/// Starts a walk of `root`.
///
/// Fails with [`LoadError::NotFound`] if `root` is missing or not a directory,
/// so a typo in a path is never mistaken for an empty data set.
pub fn discover_source_files(root: &Path) -> Result<SourceFiles, LoadError> {
    if !root.is_dir() {
        return Err(LoadError::NotFound {
            path: root.to_path_buf(),
        });
    }
    let root = root.canonicalize().map_err(|source| LoadError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    Ok(SourceFiles {
        walker: WalkDir::new(root)
            .follow_links(false)
            .contents_first(false)
            .sort_by(files_before_dirs)
            .into_iter(),
    })
}

fn files_before_dirs(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn is_source_file(path: &Path) -> bool {
    let visible = path
        .file_name()
        .map(|name| !name.to_string_lossy().starts_with('.'))
        .unwrap_or(false);
    visible && path.extension().map(|ext| ext == SOURCE_EXTENSION) == Some(true)
}

impl Iterator for SourceFiles {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match self.walker.next()? {
                Ok(entry) => {
                    if entry.file_type().is_file() && is_source_file(entry.path()) {
                        return Some(entry.into_path());
                    }
                }
                Err(e) => {
                    warn!("Skipping unreadable entry while walking sources: {}", e);
                }
            }
        }
    }
}
