#![allow(dead_code)]

pub const SONG_1_ID: &str = "S1";
pub const SONG_1_TITLE: &str = "Test Song";
pub const SONG_1_DURATION: f64 = 180.5;

pub const SONG_2_ID: &str = "SOMZWCG12A8C13C480";
pub const SONG_2_TITLE: &str = "I Didn't Mean To";
pub const SONG_2_DURATION: f64 = 218.93179;

pub const ARTIST_1_ID: &str = "A1";
pub const ARTIST_1_NAME: &str = "Test Artist";

pub const ARTIST_2_ID: &str = "ARD7TVE1187B99BFB1";
pub const ARTIST_2_NAME: &str = "Casual";

/// 2000-01-01T00:00:00Z, a Saturday.
pub const SCENARIO_TS: i64 = 946684800000;
pub const SCENARIO_USER_ID: &str = "7";
