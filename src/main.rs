use anyhow::{bail, Context, Result};
use clap::Parser;
use sparkify_etl::config::{AppConfig, CliConfig, FileConfig, DEFAULT_LOG_DATA, DEFAULT_SONG_DATA};
use sparkify_etl::ingestion::{
    BatchLoader, CatalogFileProcessor, FileProcessor, LoadReport, LogFileProcessor,
};
use sparkify_etl::warehouse::{SqliteWarehouse, WarehouseSink};
use std::path::{Path, PathBuf};
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Load song catalog and activity log files into the Sparkify warehouse.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite warehouse database file. Created when missing.
    #[clap(value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Root of the song catalog files.
    #[clap(long, value_parser = parse_path, default_value = DEFAULT_SONG_DATA)]
    pub song_data: PathBuf,

    /// Root of the activity log files.
    #[clap(long, value_parser = parse_path, default_value = DEFAULT_LOG_DATA)]
    pub log_data: PathBuf,

    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Seconds a logged track length may differ from the catalog duration.
    #[clap(long, default_value_t = 0.0)]
    pub duration_tolerance: f64,

    /// Stop at the first file that fails instead of skipping it.
    #[clap(long)]
    pub abort_on_error: bool,

    /// Run the whole pipeline but roll back every file.
    #[clap(long)]
    pub dry_run: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            song_data: self.song_data.clone(),
            log_data: self.log_data.clone(),
            duration_tolerance: self.duration_tolerance,
            abort_on_error: self.abort_on_error,
            dry_run: self.dry_run,
        }
    }
}

fn load_root<P: FileProcessor>(
    store: &mut SqliteWarehouse,
    config: &AppConfig,
    root: &Path,
    processor: &P,
) -> Result<LoadReport> {
    let report = BatchLoader::new(store, config.load_options)
        .load(root, processor)
        .with_context(|| format!("Failed to load {} files", processor.kind()))?;
    info!(
        "{}: {}/{} files loaded, {} songs, {} artists, {} users, {} time rows, {} songplays",
        report.root.display(),
        report.files_processed,
        report.files_found,
        report.rows_written.songs,
        report.rows_written.artists,
        report.rows_written.users,
        report.rows_written.time,
        report.rows_written.songplays,
    );
    if report.resolved + report.unresolved > 0 {
        info!(
            "{} plays matched the catalog, {} did not",
            report.resolved, report.unresolved
        );
    }
    for failure in &report.failures {
        error!("  {}: {}", failure.path.display(), failure.error);
    }
    Ok(report)
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening SQLite warehouse at {:?}...", config.db_path);
    let mut store = SqliteWarehouse::open(&config.db_path)?;
    if config.load_options.dry_run {
        info!("Dry run, no file will be committed");
    }

    // Plays resolve against the committed catalog, so songs go first.
    let catalog_report = load_root(&mut store, &config, &config.song_data, &CatalogFileProcessor)?;
    let log_processor = LogFileProcessor {
        resolver: config.resolver,
    };
    let log_report = load_root(&mut store, &config, &config.log_data, &log_processor)?;

    let counts = store.counts()?;
    info!(
        "Warehouse now holds {} songs, {} artists, {} users, {} time rows, {} songplays",
        counts.songs, counts.artists, counts.users, counts.time, counts.songplays
    );

    let failed = catalog_report.failures.len() + log_report.failures.len();
    if failed > 0 {
        bail!("{} files failed to load", failed);
    }
    Ok(())
}
