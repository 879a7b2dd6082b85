mod file_config;

pub use file_config::FileConfig;

use crate::ingestion::{LoadOptions, Resolver};
use anyhow::Result;
use std::path::PathBuf;

pub const DEFAULT_SONG_DATA: &str = "data/song_data";
pub const DEFAULT_LOG_DATA: &str = "data/log_data";

/// Command line values taking part in config resolution.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub song_data: PathBuf,
    pub log_data: PathBuf,
    pub duration_tolerance: f64,
    pub abort_on_error: bool,
    pub dry_run: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            db_path: None,
            song_data: PathBuf::from(DEFAULT_SONG_DATA),
            log_data: PathBuf::from(DEFAULT_LOG_DATA),
            duration_tolerance: 0.0,
            abort_on_error: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub song_data: PathBuf,
    pub log_data: PathBuf,
    pub resolver: Resolver,
    pub load_options: LoadOptions,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified on the command line or in config file")
            })?;

        let song_data = file
            .song_data
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.song_data.clone());
        let log_data = file
            .log_data
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.log_data.clone());

        let resolver =
            Resolver::with_tolerance(file.duration_tolerance.unwrap_or(cli.duration_tolerance))?;

        let load_options = LoadOptions {
            continue_on_error: file.continue_on_error.unwrap_or(!cli.abort_on_error),
            dry_run: file.dry_run.unwrap_or(cli.dry_run),
        };

        Ok(Self {
            db_path,
            song_data,
            log_data,
            resolver,
            load_options,
        })
    }
}
