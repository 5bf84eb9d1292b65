//! drops-curator - administration CLI
//!
//! Manages the curator database: runtime settings, collection targets, the
//! artist blacklist and the identity cache. `classify` runs the
//! classification engine over releases read from a JSON file without
//! touching any collection.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use drops_common::config::{ensure_root_folder, resolve_root_folder, TomlConfig};
use drops_curator::classifier::ClassificationEngine;
use drops_curator::config::CuratorSettings;
use drops_curator::db::{self, SqliteIdentityStore, SqliteTargetStore};
use drops_curator::models::{CollectionTarget, ExtendedCategory, Release};
use drops_curator::services::{CacheStats, IdentityCache};
use drops_curator::store::TargetStore;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for drops-curator
#[derive(Parser, Debug)]
#[command(name = "drops-curator")]
#[command(about = "Release classification and collection curation engine")]
#[command(version)]
struct Args {
    /// Root folder holding the database (overrides DROPS_ROOT_FOLDER and the config file)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Bootstrap TOML config file
    #[arg(short, long, env = "DROPS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database and write default settings
    Init,
    /// Show settings, collection targets and cache counters
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Manage destination collections
    Target {
        #[command(subcommand)]
        action: TargetCommand,
    },
    /// Manage per-artist category blacklists
    Blacklist {
        #[command(subcommand)]
        action: BlacklistCommand,
    },
    /// Classify releases from a JSON file (dry run)
    Classify { file: PathBuf },
    /// Manage the identity cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TargetCommand {
    Set {
        category: ExtendedCategory,
        collection_id: String,
    },
    Unset {
        category: ExtendedCategory,
    },
}

#[derive(Subcommand, Debug)]
enum BlacklistCommand {
    /// Replace the blacklisted categories of an artist (comma separated)
    Add {
        artist_id: String,
        #[arg(value_delimiter = ',', required = true)]
        categories: Vec<ExtendedCategory>,
    },
    Remove {
        artist_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Forget every known release and artist
    Purge,
}

#[derive(Serialize)]
struct Status {
    database: PathBuf,
    settings: CuratorSettings,
    targets: Vec<CollectionTarget>,
    blacklisted_artists: usize,
    cache: CacheStats,
}

#[derive(Serialize)]
struct ClassifyLine<'a> {
    id: &'a str,
    title: &'a str,
    category: ExtendedCategory,
    inert: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(drops_common::config::default_config_path);
    let toml_config = TomlConfig::load_or_default(config_path.as_deref())?;

    init_tracing(&toml_config)?;
    info!(
        "Starting drops-curator v{}",
        env!("CARGO_PKG_VERSION")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    ensure_root_folder(&root_folder)?;
    let db_path = toml_config.database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = drops_common::db::init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    match args.command {
        Command::Init => {
            CuratorSettings::load(&pool).await?;
            println!("Initialized {}", db_path.display());
        }
        Command::Status { json } => print_status(&pool, &db_path, json).await?,
        Command::Target { action } => {
            let store = SqliteTargetStore::new(pool.clone());
            match action {
                TargetCommand::Set {
                    category,
                    collection_id,
                } => store.set_target(category, &collection_id).await?,
                TargetCommand::Unset { category } => store.unset_target(category).await?,
            }
        }
        Command::Blacklist { action } => match action {
            BlacklistCommand::Add {
                artist_id,
                categories,
            } => {
                let categories: BTreeSet<ExtendedCategory> = categories.into_iter().collect();
                db::set_blacklist(&pool, &artist_id, &categories).await?;
            }
            BlacklistCommand::Remove { artist_id } => {
                if !db::remove_blacklist(&pool, &artist_id).await? {
                    println!("No blacklist entry for {}", artist_id);
                }
            }
        },
        Command::Classify { file } => classify_file(&pool, &file).await?,
        Command::Cache {
            action: CacheCommand::Purge,
        } => SqliteIdentityStore::new(pool.clone()).purge().await?,
    }

    pool.close().await;
    Ok(())
}

/// `RUST_LOG` wins over the TOML level; a configured file replaces stderr
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log level")?;

    let (file_layer, stderr_layer) = match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), None)
        }
        None => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

async fn print_status(pool: &SqlitePool, db_path: &Path, json: bool) -> Result<()> {
    let settings = CuratorSettings::load(pool).await?;
    let targets = SqliteTargetStore::new(pool.clone()).load_targets().await?;
    let blacklist = db::load_blacklist(pool).await?;
    let cache = IdentityCache::load(Arc::new(SqliteIdentityStore::new(pool.clone()))).await?;

    let status = Status {
        database: db_path.to_path_buf(),
        settings,
        targets: targets.into_values().collect(),
        blacklisted_artists: blacklist.len(),
        cache: cache.stats().await,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Database: {}", status.database.display());
    println!(
        "Batching: {}, eviction: {}, capacity: {}, add limit: {}",
        status.settings.batch_policy,
        if status.settings.circular_playlist_fitting { "on" } else { "off" },
        status.settings.collection_capacity,
        status.settings.collection_add_limit
    );
    println!("Targets:");
    for category in ExtendedCategory::ALL {
        let target = status.targets.iter().find(|t| t.category == category);
        let destination = target.and_then(|t| t.destination()).unwrap_or("-");
        let updated = target
            .and_then(|t| t.last_update)
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!("  {:<12} {:<32} last update: {}", category, destination, updated);
    }
    println!("Blacklisted artists: {}", status.blacklisted_artists);
    println!(
        "Cache: {} releases, {} fingerprints, {} artists",
        status.cache.release_ids, status.cache.fingerprints, status.cache.artists
    );
    Ok(())
}

async fn classify_file(pool: &SqlitePool, file: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let releases: Vec<Release> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse releases from {}", file.display()))?;
    for release in &releases {
        release.validate()?;
    }

    let settings = CuratorSettings::load(pool).await?;
    let blacklist = db::load_blacklist(pool).await?;
    let engine = ClassificationEngine::from_settings(&settings.remap, blacklist)?;

    for classified in engine.classify_all(releases) {
        let line = ClassifyLine {
            id: &classified.release.id,
            title: &classified.release.title,
            category: classified.category,
            inert: classified.inert,
        };
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}
