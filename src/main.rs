//! # Idea Board CLI (`board`)
//!
//! ## Usage
//!
//! ```bash
//! board --config ./config/board.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `board init` | Create the SQLite database and run schema migrations |
//! | `board serve` | Start the HTTP API |
//! | `board ideas` | List ideas with cluster labels (`--json` for machine output) |
//! | `board add "<text>"` | Store an idea |
//! | `board connections` | List stored connections |
//!
//! If the config file does not exist, built-in defaults are used (still
//! subject to `BOARD_*` environment overrides).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use idea_board::{board, config, migrate, server};
use idea_board_core::models::CreateIdeaRequest;

/// Idea Board: a spatial board that groups related notes into semantic
/// clusters.
#[derive(Parser)]
#[command(
    name = "board",
    about = "Idea Board: a spatial note board with semantic clustering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/board.toml`. See `config/board.example.toml`.
    #[arg(long, global = true, default_value = "./config/board.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run more than once.
    Init,

    /// Start the HTTP API.
    ///
    /// Loads the embedding model before binding; exits with an error if
    /// the model cannot be loaded.
    Serve,

    /// List ideas in insertion order with their cluster labels.
    Ideas {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Add an idea to the board.
    Add {
        /// The note text.
        text: String,

        #[arg(long)]
        x: Option<i64>,

        #[arg(long)]
        y: Option<i64>,

        #[arg(long)]
        width: Option<i64>,

        #[arg(long)]
        height: Option<i64>,
    },

    /// List stored connections.
    Connections,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::debug!(path = %cli.config.display(), "config file not found, using defaults");
        config::Config::minimal()?
    };

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ideas { json } => {
            board::run_list_ideas(&cfg, json).await?;
        }
        Commands::Add {
            text,
            x,
            y,
            width,
            height,
        } => {
            let request = CreateIdeaRequest {
                text: Some(text),
                x,
                y,
                width,
                height,
            };
            board::run_add_idea(&cfg, request).await?;
        }
        Commands::Connections => {
            board::run_list_connections(&cfg).await?;
        }
    }

    Ok(())
}
