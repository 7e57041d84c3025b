pub mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "feed-relay")]
#[command(about = "Fetches a fixed set of feeds on a schedule and serves the cached copies over HTTP")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Refresh feeds on a schedule and serve them over HTTP (default)
    Serve,

    /// Run a single refresh pass and print the outcome
    Refresh {
        /// Specific feed name (if not provided, refresh all)
        feed: Option<String>,
    },

    /// List all registered feeds
    ListFeeds,

    /// Show cache files for every registered feed
    Status,

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let command = self.command.clone().unwrap_or(Commands::Serve);

        if let Commands::Completions { shell } = command {
            commands::generate_completions(shell);
            return Ok(());
        }

        let config_path = commands::config_path(self.config.clone());
        let config = Config::resolve(config_path.as_deref()).with_context(|| match &config_path {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Invalid configuration".to_string(),
        })?;

        // Dropping the guard flushes the file writer, so it lives until exit.
        let _guard = commands::init_logging(&config.logging, self.debug, self.verbose)
            .context("Failed to initialize logging")?;

        match command {
            Commands::Serve => commands::serve(config).await,
            Commands::Refresh { feed } => commands::refresh(config, feed).await,
            Commands::ListFeeds => commands::list_feeds(&config),
            Commands::Status => commands::status(&config),
            Commands::Completions { .. } => Ok(()),
        }
    }
}
