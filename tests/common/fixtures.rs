#![allow(dead_code)]

use super::constants::*;
use sparkify_etl::warehouse::SqliteWarehouse;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn song_line(song_id: &str, title: &str, artist_id: &str, artist_name: &str, duration: f64) -> String {
    format!(
        r#"{{"num_songs":1,"artist_id":"{}","artist_latitude":null,"artist_longitude":null,"artist_location":"","artist_name":"{}","song_id":"{}","title":"{}","duration":{},"year":2000}}"#,
        artist_id, artist_name, song_id, title, duration
    )
}

pub fn log_line(page: &str, ts: i64, user_id: &str, level: &str, song: &str, artist: &str, length: f64) -> String {
    format!(
        r#"{{"artist":"{}","auth":"Logged In","firstName":"Ada","gender":"F","itemInSession":0,"lastName":"Byron","length":{},"level":"{}","location":"London","method":"PUT","page":"{}","registration":1540919166796.0,"sessionId":42,"song":"{}","status":200,"ts":{},"userAgent":"curl/8.0","userId":"{}"}}"#,
        artist, length, level, page, song, ts, user_id
    )
}

/// A temp dir holding `song_data/`, `log_data/` and the warehouse file.
pub struct TestDataTree {
    pub dir: TempDir,
}

impl TestDataTree {
    pub fn new() -> Self {
        let tree = TestDataTree {
            dir: TempDir::new().unwrap(),
        };
        fs::create_dir_all(tree.song_data()).unwrap();
        fs::create_dir_all(tree.log_data()).unwrap();
        tree
    }

    /// One song, one artist and a single play of that song.
    pub fn with_scenario() -> Self {
        let tree = Self::new();
        tree.write_song(
            "A/A/A/TRAAAAA.json",
            &song_line(SONG_1_ID, SONG_1_TITLE, ARTIST_1_ID, ARTIST_1_NAME, SONG_1_DURATION),
        );
        tree.write_log(
            "2000/01/2000-01-01-events.json",
            &[log_line(
                "NextSong",
                SCENARIO_TS,
                SCENARIO_USER_ID,
                "free",
                SONG_1_TITLE,
                ARTIST_1_NAME,
                SONG_1_DURATION,
            )],
        );
        tree
    }

    pub fn song_data(&self) -> PathBuf {
        self.dir.path().join("song_data")
    }

    pub fn log_data(&self) -> PathBuf {
        self.dir.path().join("log_data")
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("sparkify.db")
    }

    pub fn write_song(&self, relative: &str, content: &str) -> PathBuf {
        write_file(&self.song_data(), relative, content)
    }

    pub fn write_log(&self, relative: &str, lines: &[String]) -> PathBuf {
        write_file(&self.log_data(), relative, &lines.join("\n"))
    }

    pub fn open_warehouse(&self) -> SqliteWarehouse {
        SqliteWarehouse::open(self.db_path()).unwrap()
    }
}

fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}
