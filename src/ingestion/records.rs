//! JSON-lines record decoding.
//!
//! Every source file holds one JSON object per line. Lines are decoded in two
//! steps: text to `serde_json::Value` (a failure there is a malformed record),
//! then value to the typed record (a failure there is a schema error).

use super::LoadError;
use crate::warehouse::SubscriptionLevel;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Split};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A song catalog document.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub artist_name: String,
    pub year: i32,
    pub duration: f64,
    pub artist_location: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
}

/// One user action from an activity log.
///
/// Only song plays are decoded into this type; other records are dropped on
/// their `page` alone (see [`read_records_where`]). Presence of the fields a
/// play needs is checked by the event transformer.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub page: Option<String>,
    pub ts: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_user_id")]
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<SubscriptionLevel>,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserIdValue {
    Text(String),
    Number(i64),
}

/// Log exports carry `userId` either as a string or as a number; logged-out
/// events have it empty.
fn deserialize_user_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<UserIdValue>::deserialize(deserializer)? {
        Some(UserIdValue::Text(s)) if !s.trim().is_empty() => Some(s),
        Some(UserIdValue::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A decoded record with the 1-based line it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct Numbered<T> {
    pub line: usize,
    pub record: T,
}

/// Lazy reader over the records of one JSON-lines file.
///
/// Lines are split on raw bytes, so text that is not UTF-8 is reported as a
/// malformed record at its line rather than as a read failure.
pub struct RecordReader<T> {
    path: PathBuf,
    lines: Split<BufReader<File>>,
    line: usize,
    keep: fn(&Value) -> bool,
    _record: PhantomData<T>,
}

pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<RecordReader<T>, LoadError> {
    read_records_where(path, |_| true)
}

/// Like [`read_records`], but objects rejected by `keep` are skipped before
/// they are decoded into `T`. They still have to be well-formed JSON objects.
pub fn read_records_where<T: DeserializeOwned>(
    path: &Path,
    keep: fn(&Value) -> bool,
) -> Result<RecordReader<T>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(RecordReader {
        path: path.to_path_buf(),
        lines: BufReader::new(file).split(b'\n'),
        line: 0,
        keep,
        _record: PhantomData,
    })
}

impl<T: DeserializeOwned> RecordReader<T> {
    fn decode(&self, bytes: &[u8]) -> Result<Option<T>, LoadError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|source| LoadError::MalformedRecord {
                path: self.path.clone(),
                line: self.line,
                source,
            })?;
        if !value.is_object() {
            return Err(LoadError::schema(
                &self.path,
                self.line,
                "expected a JSON object",
            ));
        }
        if !(self.keep)(&value) {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| LoadError::schema(&self.path, self.line, e.to_string()))
    }
}

impl<T: DeserializeOwned> Iterator for RecordReader<T> {
    type Item = Result<Numbered<T>, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let bytes = self.lines.next()?;
            self.line += 1;
            let bytes = match bytes {
                Ok(bytes) => bytes,
                Err(source) => {
                    return Some(Err(LoadError::Io {
                        path: self.path.clone(),
                        source,
                    }))
                }
            };
            if bytes.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let line = self.line;
            match self.decode(&bytes) {
                Ok(Some(record)) => return Some(Ok(Numbered { line, record })),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
