//! Common test infrastructure
//!
//! Builds song_data and log_data trees on disk the way the raw exports lay
//! them out, plus a warehouse to load them into.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestDataTree, SONG_1_ID};
//!
//! #[test]
//! fn test_load_catalog() {
//!     let tree = TestDataTree::with_scenario();
//!     let mut store = tree.open_warehouse();
//!     // ...
//! }
//! ```

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::{log_line, song_line, TestDataTree};
