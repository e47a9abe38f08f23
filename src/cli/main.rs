use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use photo_enex::config;
use photo_enex::pipeline::{self, ExportOptions};

#[derive(Parser, Debug)]
#[command(
    name = "photo-enex",
    version,
    about = "Convert photos into a single Evernote export (.enex), dated and geotagged from EXIF"
)]
struct Cli {
    /// Image files or directories to export
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Output file (default: Photos.enex, or output.default_path from the config)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Number of files to read and encode in parallel (0 = all cores)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Print a JSON summary of the exported notes
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    // Load config
    let mut config = config::Config::load(cli.config.as_deref())?;

    // Override worker count from CLI flag
    if let Some(jobs) = cli.jobs {
        config.workers = jobs;
    }

    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output.default_path));

    // Refuse to touch an existing export before walking anything
    pipeline::ensure_output_free(&output)?;

    // Collect inputs
    let inputs = pipeline::collect_inputs(&cli.paths, &config.scan)?;
    log::info!("Found {} file(s) to export", inputs.len());

    let options = ExportOptions::from_config(&config, output);
    log::debug!("Using {} worker(s)", options.workers);

    let summary = pipeline::export(inputs, &options).await?;

    // JSON output
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        log::info!(
            "{} file(s) exported to {}",
            summary.notes.len(),
            summary.output.display()
        );
    } else {
        println!(
            "{} file(s) exported to {}",
            summary.notes.len(),
            summary.output.display()
        );
    }

    Ok(())
}
