use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::auth::AccessGate;
use crate::cli::Cli;
use crate::config::{Config, LoggingConfig, DEFAULT_CONFIG_FILE};
use crate::error::{Error, Result};
use crate::feed::fetcher::FeedFetcher;
use crate::query::QueryService;
use crate::scheduler::RefreshScheduler;
use crate::storage::{FeedCache, RegistryStore, StatusTracker};
use crate::web::WebServer;

/// Bootstraps the registry, starts the refresh loop and serves HTTP until
/// Ctrl-C.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let registry = RegistryStore::load(&config.storage.registry_path)
        .context("Failed to load feed registry")?;
    let cache = open_cache(&config)?;
    let status = StatusTracker::new();

    let fetcher = FeedFetcher::from_settings(&config.settings)
        .context("Failed to build HTTP client")?;
    let policy = fetcher.retry_policy();
    info!(
        "Refreshing {} feeds every {:?} ({} attempts, {:?} before fallback)",
        registry.len(),
        config.refresh_interval(),
        policy.max_attempts,
        policy.initial_delay
    );
    let scheduler = RefreshScheduler::new(
        registry.clone(),
        fetcher,
        cache.clone(),
        status.clone(),
        config.refresh_interval(),
    );
    let refresh_task = scheduler.spawn();

    let gate = AccessGate::remote(
        config.server.token_check_url.clone(),
        Duration::from_secs(config.server.token_check_timeout),
    )
    .context("Failed to build token check client")?;
    let service = QueryService::new(registry, cache, status.clone(), gate);

    let result = WebServer::new(config.listen_addr(), service)
        .run(shutdown_signal())
        .await;

    refresh_task.abort();
    info!("Refresh loop stopped");
    for (name, health) in status.snapshot() {
        info!(
            "{}: {:?}, {} articles, last success {:?}",
            name, health.status, health.articles, health.last_success
        );
    }

    result.context("HTTP server failed")
}

/// Manually refresh one feed, or every feed in the registry.
pub async fn refresh(config: Config, feed_name: Option<String>) -> anyhow::Result<()> {
    info!("Refreshing feeds: {:?}", feed_name);

    let registry = RegistryStore::load(&config.storage.registry_path)
        .context("Failed to load feed registry")?;
    let cache = open_cache(&config)?;
    let fetcher = FeedFetcher::from_settings(&config.settings)
        .context("Failed to build HTTP client")?;
    let scheduler = RefreshScheduler::new(
        registry.clone(),
        fetcher,
        cache,
        StatusTracker::new(),
        config.refresh_interval(),
    );

    match feed_name {
        Some(name) => {
            let entry = registry
                .get(&name)
                .ok_or_else(|| anyhow!("Feed '{}' not found", name))?;

            println!("🔄 Refreshing feed: {}", name);
            match scheduler.refresh_entry(entry).await {
                Ok(count) => println!("✅ {} updated successfully ({} articles)", name, count),
                Err(e) => println!("❌ Failed to refresh {}: {}", name, e),
            }
        }
        None => {
            println!("🔄 Refreshing all feeds...");
            let results = scheduler.run_pass().await;

            let mut success_count = 0;
            for result in &results {
                if result.success {
                    println!("   {} ... ✅ ({} articles)", result.feed_name, result.articles);
                    success_count += 1;
                } else {
                    println!(
                        "   {} ... ❌ Error: {}",
                        result.feed_name,
                        result.error.as_deref().unwrap_or("unknown")
                    );
                }
            }

            println!("\n📊 Refresh Summary:");
            println!("   ✅ Successful: {}", success_count);
            let error_count = results.len() - success_count;
            if error_count > 0 {
                println!("   ❌ Failed: {}", error_count);
            }
        }
    }

    Ok(())
}

/// List all registered feeds
pub fn list_feeds(config: &Config) -> anyhow::Result<()> {
    let registry = RegistryStore::load(&config.storage.registry_path)
        .context("Failed to load feed registry")?;

    println!("📋 Registered Feeds ({}):", registry.len());
    println!("========================");
    for entry in registry.list() {
        println!("\n📰 {}", entry.name);
        println!("   URL: {}", entry.url);
    }

    Ok(())
}

/// Cache file size and age for every registered feed.
pub fn status(config: &Config) -> anyhow::Result<()> {
    let registry = RegistryStore::load(&config.storage.registry_path)
        .context("Failed to load feed registry")?;
    let cache = FeedCache::new(config.storage.cache_dir.clone())
        .context("Failed to open cache directory")?;

    println!("📊 Feed Relay Status");
    println!("====================");
    println!("Registry: {}", config.storage.registry_path.display());
    println!("Cache directory: {}", cache.dir().display());
    println!("Refresh interval: {}s", config.settings.refresh_interval);
    println!();

    let mut missing = 0;
    for entry in registry.list() {
        match cache.metadata(&entry.name) {
            Ok(file) => {
                let modified: DateTime<Utc> = file.modified.into();
                println!(
                    "✅ {:<24} {:>10} bytes  {}",
                    file.name,
                    file.size,
                    modified.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            Err(Error::NotFound(_)) => {
                println!("❌ {:<24} not cached yet", entry.name);
                missing += 1;
            }
            Err(e) => {
                println!("⚠️  {:<24} {}", entry.name, e);
                missing += 1;
            }
        }
    }

    if missing > 0 {
        println!("\n💡 {} feed(s) have no cache file; run 'feed-relay refresh'", missing);
    }

    Ok(())
}

pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

/// An explicit `-c` wins, then `feed-relay.toml` in the working directory,
/// then the per-user config directory.
pub fn config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() || Path::new(DEFAULT_CONFIG_FILE).exists() {
        return explicit;
    }

    Config::config_dir()
        .ok()
        .map(|dir| dir.join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.exists())
}

/// Installs the global subscriber. The returned guard must be held for as
/// long as file logging should keep flushing.
pub fn init_logging(
    logging: &LoggingConfig,
    debug: bool,
    verbose: bool,
) -> Result<Option<WorkerGuard>> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let (writer, guard) = if logging.log_to_file {
        let path = Path::new(&logging.log_file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::Config(format!("Invalid log file path: {}", logging.log_file)))?;
        fs::create_dir_all(dir)?;

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        (BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (BoxMakeWriter::new(io::stderr), None)
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .with_file(debug)
        .with_line_number(debug);

    let installed = if logging.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| Error::Config(format!("Failed to install subscriber: {}", e)))?;

    debug!("Logging initialized");
    Ok(guard)
}

fn open_cache(config: &Config) -> anyhow::Result<FeedCache> {
    let cache = FeedCache::new(config.storage.cache_dir.clone())
        .context("Failed to open cache directory")?;

    let removed = cache.cleanup_temp_files();
    if removed > 0 {
        info!("Removed {} leftover temporary cache files", removed);
    }
    Ok(cache)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
