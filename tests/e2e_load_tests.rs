//! End-to-end loading tests
//!
//! Run catalog then log loading over on-disk data trees and check what lands
//! in the warehouse.

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use sparkify_etl::ingestion::{
    BatchLoader, CatalogFileProcessor, LoadError, LoadOptions, LogFileProcessor, Resolver,
};
use sparkify_etl::warehouse::{
    CatalogRef, SqliteWarehouse, SubscriptionLevel, WarehouseCounts, WarehouseSink,
};

fn load_all(tree: &TestDataTree, store: &mut SqliteWarehouse, options: LoadOptions) {
    BatchLoader::new(store, options)
        .load(&tree.song_data(), &CatalogFileProcessor)
        .unwrap();
    BatchLoader::new(store, options)
        .load(&tree.log_data(), &LogFileProcessor::default())
        .unwrap();
}

#[test]
fn test_scenario_round_trip() {
    let tree = TestDataTree::with_scenario();
    let mut store = tree.open_warehouse();
    load_all(&tree, &mut store, LoadOptions::default());

    assert_eq!(
        store.counts().unwrap(),
        WarehouseCounts {
            songs: 1,
            artists: 1,
            users: 1,
            time: 1,
            songplays: 1,
        }
    );

    let song = store.get_song(SONG_1_ID).unwrap().unwrap();
    assert_eq!(song.title, SONG_1_TITLE);
    assert_eq!(song.artist_id, ARTIST_1_ID);
    assert_eq!(song.duration, SONG_1_DURATION);

    let artist = store.get_artist(ARTIST_1_ID).unwrap().unwrap();
    assert_eq!(artist.name, ARTIST_1_NAME);
    assert_eq!(artist.location, None);

    let instant = Utc.timestamp_millis_opt(SCENARIO_TS).unwrap();
    let time = store.get_time(instant).unwrap().unwrap();
    assert_eq!(time.hour, 0);
    assert_eq!(time.day, 1);
    assert_eq!(time.month, 1);
    assert_eq!(time.year, 2000);
    assert_eq!(time.weekday, 5);

    let user = store.get_user(SCENARIO_USER_ID).unwrap().unwrap();
    assert_eq!(user.first_name.as_deref(), Some("Ada"));
    assert_eq!(user.level, SubscriptionLevel::Free);

    let plays = store.list_play_events().unwrap();
    assert_eq!(plays.len(), 1);
    assert_eq!(plays[0].start_time, instant);
    assert_eq!(plays[0].session_id, 42);
    assert_eq!(
        plays[0].catalog_ref,
        Some(CatalogRef {
            song_id: SONG_1_ID.to_string(),
            artist_id: ARTIST_1_ID.to_string(),
        })
    );
}

#[test]
fn test_navigation_events_load_nothing() {
    let tree = TestDataTree::with_scenario();
    tree.write_log(
        "2000/01/2000-01-01-events.json",
        &[log_line(
            "Home",
            SCENARIO_TS,
            SCENARIO_USER_ID,
            "free",
            SONG_1_TITLE,
            ARTIST_1_NAME,
            SONG_1_DURATION,
        )],
    );
    let mut store = tree.open_warehouse();
    load_all(&tree, &mut store, LoadOptions::default());

    let counts = store.counts().unwrap();
    assert_eq!(counts.songs, 1);
    assert_eq!(counts.users, 0);
    assert_eq!(counts.time, 0);
    assert_eq!(counts.songplays, 0);
}

#[test]
fn test_unmatched_play_is_stored_without_reference() {
    let tree = TestDataTree::with_scenario();
    tree.write_log(
        "2000/01/2000-01-02-events.json",
        &[log_line(
            "NextSong",
            SCENARIO_TS + 60_000,
            "8",
            "paid",
            "Unknown Song",
            ARTIST_1_NAME,
            SONG_1_DURATION,
        )],
    );
    let mut store = tree.open_warehouse();

    BatchLoader::new(&mut store, LoadOptions::default())
        .load(&tree.song_data(), &CatalogFileProcessor)
        .unwrap();
    let report = BatchLoader::new(&mut store, LoadOptions::default())
        .load(&tree.log_data(), &LogFileProcessor::default())
        .unwrap();

    assert_eq!(report.files_processed, 2);
    assert_eq!(report.resolved, 1);
    assert_eq!(report.unresolved, 1);
    let plays = store.list_play_events().unwrap();
    assert_eq!(plays.len(), 2);
    let unmatched = plays.iter().find(|p| p.user_id == "8").unwrap();
    assert_eq!(unmatched.catalog_ref, None);
    assert_eq!(unmatched.level, SubscriptionLevel::Paid);
}

#[test]
fn test_duration_tolerance_resolves_near_match() {
    let tree = TestDataTree::new();
    tree.write_song(
        "A/A/B/TRAAABD.json",
        &song_line(SONG_2_ID, SONG_2_TITLE, ARTIST_2_ID, ARTIST_2_NAME, SONG_2_DURATION),
    );
    tree.write_log(
        "events.json",
        &[log_line("NextSong", SCENARIO_TS, "9", "free", SONG_2_TITLE, ARTIST_2_NAME, 218.93)],
    );

    let mut exact = SqliteWarehouse::open_in_memory().unwrap();
    load_all(&tree, &mut exact, LoadOptions::default());
    assert_eq!(exact.list_play_events().unwrap()[0].catalog_ref, None);

    let mut tolerant = SqliteWarehouse::open_in_memory().unwrap();
    BatchLoader::new(&mut tolerant, LoadOptions::default())
        .load(&tree.song_data(), &CatalogFileProcessor)
        .unwrap();
    let processor = LogFileProcessor {
        resolver: Resolver::with_tolerance(0.01).unwrap(),
    };
    BatchLoader::new(&mut tolerant, LoadOptions::default())
        .load(&tree.log_data(), &processor)
        .unwrap();
    let plays = tolerant.list_play_events().unwrap();
    assert_eq!(
        plays[0].catalog_ref.as_ref().map(|r| r.song_id.as_str()),
        Some(SONG_2_ID)
    );
}

#[test]
fn test_empty_root_loads_zero_files() {
    let tree = TestDataTree::new();
    let mut store = tree.open_warehouse();

    let report = BatchLoader::new(&mut store, LoadOptions::default())
        .load(&tree.song_data(), &CatalogFileProcessor)
        .unwrap();

    assert_eq!(report.files_found, 0);
    assert_eq!(report.files_processed, 0);
    assert!(report.is_clean());
    assert_eq!(store.counts().unwrap(), WarehouseCounts::default());
}

#[test]
fn test_missing_root_is_fatal() {
    let tree = TestDataTree::new();
    let mut store = tree.open_warehouse();
    let missing = tree.dir.path().join("no_such_dir");

    let result = BatchLoader::new(&mut store, LoadOptions::default())
        .load(&missing, &CatalogFileProcessor);

    match result {
        Err(LoadError::NotFound { path }) => assert_eq!(path, missing),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_bad_file_does_not_stop_the_batch() {
    let tree = TestDataTree::with_scenario();
    tree.write_song("A/A/B/TRAAABR.json", "{\"song_id\": \"S9\", ");
    tree.write_song(
        "A/A/C/TRAAACN.json",
        &song_line(SONG_2_ID, SONG_2_TITLE, ARTIST_2_ID, ARTIST_2_NAME, SONG_2_DURATION),
    );
    let mut store = tree.open_warehouse();

    let report = BatchLoader::new(&mut store, LoadOptions::default())
        .load(&tree.song_data(), &CatalogFileProcessor)
        .unwrap();

    assert_eq!(report.files_found, 3);
    assert_eq!(report.files_processed, 2);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("TRAAABR.json"));
    assert!(matches!(
        report.failures[0].error,
        LoadError::MalformedRecord { line: 1, .. }
    ));
    let counts = store.counts().unwrap();
    assert_eq!(counts.songs, 2);
    assert_eq!(counts.artists, 2);
}

#[test]
fn test_abort_policy_keeps_earlier_files() {
    let tree = TestDataTree::with_scenario();
    // Sorted after A/A/A, so the scenario song commits first.
    tree.write_song("A/A/B/TRAAABR.json", "{\"song_id\": \"S9\"}");
    tree.write_song(
        "A/A/C/TRAAACN.json",
        &song_line(SONG_2_ID, SONG_2_TITLE, ARTIST_2_ID, ARTIST_2_NAME, SONG_2_DURATION),
    );
    let mut store = tree.open_warehouse();

    let options = LoadOptions {
        continue_on_error: false,
        ..Default::default()
    };
    let result = BatchLoader::new(&mut store, options).load(&tree.song_data(), &CatalogFileProcessor);

    assert!(matches!(result, Err(LoadError::Schema { line: 1, .. })));
    let counts = store.counts().unwrap();
    assert_eq!(counts.songs, 1);
    assert!(store.get_song(SONG_1_ID).unwrap().is_some());
    assert!(store.get_song(SONG_2_ID).unwrap().is_none());
}

#[test]
fn test_dry_run_commits_nothing() {
    let tree = TestDataTree::with_scenario();
    let mut store = tree.open_warehouse();
    let options = LoadOptions {
        dry_run: true,
        ..Default::default()
    };

    let report = BatchLoader::new(&mut store, options)
        .load(&tree.song_data(), &CatalogFileProcessor)
        .unwrap();
    assert_eq!(report.files_processed, 1);
    assert_eq!(report.rows_written.songs, 1);

    BatchLoader::new(&mut store, options)
        .load(&tree.log_data(), &LogFileProcessor::default())
        .unwrap();
    assert_eq!(store.counts().unwrap(), WarehouseCounts::default());
}

#[test]
fn test_reloading_catalog_is_idempotent() {
    let tree = TestDataTree::with_scenario();
    let mut store = tree.open_warehouse();

    for _ in 0..2 {
        BatchLoader::new(&mut store, LoadOptions::default())
            .load(&tree.song_data(), &CatalogFileProcessor)
            .unwrap();
    }

    let counts = store.counts().unwrap();
    assert_eq!(counts.songs, 1);
    assert_eq!(counts.artists, 1);
}

#[test]
fn test_user_level_follows_latest_play() {
    let tree = TestDataTree::with_scenario();
    tree.write_log(
        "2000/01/2000-01-02-events.json",
        &[log_line(
            "NextSong",
            SCENARIO_TS + 86_400_000,
            SCENARIO_USER_ID,
            "paid",
            SONG_1_TITLE,
            ARTIST_1_NAME,
            SONG_1_DURATION,
        )],
    );
    let mut store = tree.open_warehouse();
    load_all(&tree, &mut store, LoadOptions::default());

    let counts = store.counts().unwrap();
    assert_eq!(counts.users, 1);
    assert_eq!(counts.songplays, 2);
    assert_eq!(counts.time, 2);
    let user = store.get_user(SCENARIO_USER_ID).unwrap().unwrap();
    assert_eq!(user.level, SubscriptionLevel::Paid);
}

#[test]
fn test_warehouse_survives_reopen() {
    let tree = TestDataTree::with_scenario();
    {
        let mut store = tree.open_warehouse();
        load_all(&tree, &mut store, LoadOptions::default());
    }

    let store = tree.open_warehouse();
    assert_eq!(store.counts().unwrap().songplays, 1);
}

#[test]
fn test_unusual_navigation_record_keeps_plays() {
    let tree = TestDataTree::with_scenario();
    tree.write_log(
        "2000/01/2000-01-01-events.json",
        &[
            r#"{"page":"Home","level":"premium","ts":"later","sessionId":3.5,"userId":1.5}"#
                .to_string(),
            log_line(
                "NextSong",
                SCENARIO_TS,
                SCENARIO_USER_ID,
                "free",
                SONG_1_TITLE,
                ARTIST_1_NAME,
                SONG_1_DURATION,
            ),
        ],
    );
    let mut store = tree.open_warehouse();

    BatchLoader::new(&mut store, LoadOptions::default())
        .load(&tree.song_data(), &CatalogFileProcessor)
        .unwrap();
    let report = BatchLoader::new(&mut store, LoadOptions::default())
        .load(&tree.log_data(), &LogFileProcessor::default())
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.resolved, 1);
    assert_eq!(store.counts().unwrap().songplays, 1);
}
