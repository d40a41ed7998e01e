/*
upnews - main.rs
Command-line entry point: runs the daily categorization/selection/generation
pipeline over batches of fetched news, and analyzes the categorization log.
*/

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use common::{init_db_pool, Config};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use upnews::audit::{self, AuditLog, AuditReport, JsonlAuditLog, MemoryAuditLog};
use upnews::categorization::ConfigStore;
use upnews::ingestion::{self, BatchFileFetcher, NewsFetcher};
use upnews::llm::remote::RemoteGenerator;
use upnews::pipeline::{self, RunSettings};
use upnews::selection::Selector;
use upnews::storage::{self, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "upnews", about = "UpNews daily article pipeline")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Categorize fetched news and generate one article per category
    Run {
        /// JSON batch of fetched news items (one file per source)
        #[arg(long = "batch", value_name = "FILE", required = true)]
        batches: Vec<PathBuf>,

        /// Publication date (YYYY-MM-DD); defaults to today + selection.days_ahead
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Seed for selection; overrides selection.seed
        #[arg(long)]
        seed: Option<u64>,

        /// Print the per-category picks without generating or storing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Summarize the categorization log
    Analyze {
        /// Log file; defaults to <categorization.audit_dir>/categorization.log
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    match args.command {
        Command::Run { batches, date, seed, dry_run } => {
            let config = load_config(args.config).await?;
            run(config, batches, date, seed, dry_run).await
        }
        Command::Analyze { log } => {
            let path = match log {
                Some(p) => p,
                None => {
                    let config = load_config(args.config).await?;
                    PathBuf::from(config.categorization.audit_dir).join(audit::AUDIT_FILE_NAME)
                }
            };
            analyze(path).await
        }
    }
}

async fn load_config(config_arg: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = config_arg {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}

async fn run(
    config: Config,
    batches: Vec<PathBuf>,
    date: Option<NaiveDate>,
    seed: Option<u64>,
    dry_run: bool,
) -> Result<()> {
    // Mapping problems are fatal before anything is classified.
    let mapping = ConfigStore::new(&config.categorization.mapping_path)
        .load()
        .await
        .context("failed to load category mapping")?;

    let audit_log: Box<dyn AuditLog> = match JsonlAuditLog::open(&config.categorization.audit_dir).await {
        Ok(log) => {
            info!(path = %log.path().display(), "audit log ready");
            Box::new(log)
        }
        Err(e) => {
            warn!(dir = %config.categorization.audit_dir, "audit log unavailable, decisions kept in memory only: {}", e);
            Box::new(MemoryAuditLog::new())
        }
    };

    let fetchers: Vec<Arc<dyn NewsFetcher>> = batches
        .into_iter()
        .map(|p| Arc::new(BatchFileFetcher::new(p)) as Arc<dyn NewsFetcher>)
        .collect();
    let gathered = ingestion::gather(&fetchers).await;
    if gathered.items.is_empty() {
        anyhow::bail!("no news items gathered from {} source(s)", fetchers.len());
    }

    let groups = pipeline::categorize_and_group(gathered.items, &mapping, audit_log.as_ref()).await;

    let mut selector = match seed.or(config.selection.seed) {
        Some(seed) => Selector::seeded(seed),
        None => Selector::from_entropy(),
    };

    if dry_run {
        let picks: BTreeMap<String, &upnews::news::NewsItem> = selector
            .select_random_per_category(&groups)
            .into_iter()
            .map(|(category, item)| (category.to_string(), &item.item))
            .collect();
        println!("{}", serde_json::to_string_pretty(&picks)?);
        return Ok(());
    }

    let run_date = Utc::now().date_naive();
    let target_date = match date {
        Some(date) => date,
        None => Duration::try_days(config.selection.days_ahead)
            .and_then(|ahead| run_date.checked_add_signed(ahead))
            .with_context(|| format!("selection.days_ahead = {} is out of range", config.selection.days_ahead))?,
    };
    let settings = RunSettings {
        run_date,
        target_date,
        language: config.selection.language.clone(),
        exclusion_window_days: config.selection.exclusion_window_days,
    };

    let pool = init_db_pool(&config.database.path).await?;
    storage::ensure_schema(&pool).await?;
    let store = SqliteStore::new(pool);

    let generator_config = config
        .generator
        .as_ref()
        .context("missing [generator] section in configuration")?;
    let generator = RemoteGenerator::from_config(generator_config)?;

    let summary = pipeline::run_daily(&groups, &settings, &store, &generator, &mut selector).await?;

    println!("Articles generated: {}", summary.generated());
    println!("Categories skipped: {}", summary.skipped());
    println!("Categories failed:  {}", summary.failed());
    Ok(())
}

async fn analyze(path: PathBuf) -> Result<()> {
    if !path.exists() {
        println!("No categorization log found at {}", path.display());
        return Ok(());
    }

    let (records, skipped) = audit::read_records(&path).await?;
    if skipped > 0 {
        warn!(skipped, "some log lines could not be parsed");
    }
    if records.is_empty() {
        println!("No categorization entries");
        return Ok(());
    }

    print!("{}", AuditReport::from_records(&records));
    Ok(())
}
