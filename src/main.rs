use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

mod browser;
mod config;
mod db;
mod error;
mod extract;
mod harvest;
mod logging;
mod models;
mod services;

use browser::ChromiumLauncher;
use config::Config;
use db::Repository;
use error::Result;
use harvest::Harvester;
use logging::RunLogger;
use services::{ImageCache, ReqwestFetcher};

#[derive(Parser)]
#[command(name = "harvester", version, about = "Harvest rendered articles into SQLite")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the config and create the store and output directories
    Init,
    /// Harvest every article id in [start, end]
    Run {
        #[arg(long)]
        start: i64,
        #[arg(long)]
        end: i64,
        /// Concurrent tasks (overrides the config)
        #[arg(long)]
        workers: Option<usize>,
        /// Print the final counters as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one stored article as JSON
    Show {
        #[arg(long)]
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => init(&config, cli.config.as_deref()).await,
        Commands::Run {
            start,
            end,
            workers,
            json,
        } => run(config, start, end, workers, json).await,
        Commands::Show { id } => show(&config, id).await,
    }
}

async fn show(config: &Config, id: i64) -> Result<()> {
    config.ensure_dirs()?;
    let repository = Repository::new(&config.db_path).await?;
    match repository.get_article(id).await? {
        Some(article) => println!("{}", serde_json::to_string_pretty(&article)?),
        None => println!("Article {} is not in the database", id),
    }
    Ok(())
}

async fn init(config: &Config, config_path: Option<&Path>) -> Result<()> {
    config.ensure_dirs()?;
    let repository = Repository::new(&config.db_path).await?;
    let articles = repository.count_articles().await?;

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_path);
    println!("Config:   {}", config_path.display());
    println!("Database: {} ({} articles)", config.db_path, articles);
    println!("Images:   {}", config.image_dir);
    println!("Logs:     {}", config.log_dir);
    Ok(())
}

async fn run(config: Config, start: i64, end: i64, workers: Option<usize>, json: bool) -> Result<()> {
    config.ensure_dirs()?;
    let workers = workers.unwrap_or(config.workers);

    let repository = Arc::new(Repository::new(&config.db_path).await?);
    let fetcher = Arc::new(ReqwestFetcher::new()?);
    let images = ImageCache::new(
        Path::new(&config.image_dir),
        &config.image_url_prefix,
        config.images.clone(),
        fetcher,
    );
    let launcher = ChromiumLauncher::new(config.browser.clone());
    let logger = RunLogger::create(Path::new(&config.log_dir), &config.log_level)?;
    if let Some(path) = logger.path() {
        println!("Log file: {}", path.display());
    }

    let harvester = Arc::new(Harvester::new(config, repository, launcher, images));
    let report = harvester.run(start, end, workers, &logger).await?;
    let summary = report.summary;

    if json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!(
            "Done: {} ok, {} exists, {} skipped, {} errors ({} total)",
            summary.success,
            summary.exists,
            summary.skip,
            summary.error,
            summary.total()
        );
    }
    Ok(())
}
