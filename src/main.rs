//! # WasteSight CLI (`wst`)
//!
//! The `wst` binary is the operator interface to the similarity and
//! clustering engine. It provides commands for database initialization,
//! semantic search, report-to-report similarity, hotspot clustering, and
//! corpus statistics.
//!
//! ## Usage
//!
//! ```bash
//! wst --config ./config/wst.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `wst init` | Create the SQLite database and run schema migrations |
//! | `wst search "<query>"` | Rank reports against a free-text query |
//! | `wst similar <report-id>` | Rank reports against a stored report |
//! | `wst cluster` | Group recent reports into hotspot clusters |
//! | `wst stats` | Show corpus counts and embedding coverage |
//! | `wst completions <shell>` | Generate shell completions |
//!
//! Diagnostics go to stderr via `tracing` (`RUST_LOG` controls the
//! filter); results go to stdout.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use wastesight::cluster::{self, ClusterParams};
use wastesight::{config, migrate, search, similar, stats};

/// WasteSight — geospatial-semantic similarity search and hotspot
/// clustering for citizen waste reports.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/wst.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "wst",
    about = "WasteSight — semantic search and hotspot clustering over citizen waste reports",
    version,
    long_about = "WasteSight ranks waste reports by semantic similarity (image embeddings, \
    cosine distance) and groups related incidents into geographic hotspot clusters. It reads \
    a report corpus maintained by the reporting platform and an embedding provider for text \
    queries."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/wst.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the reports table. This
    /// command is idempotent — running it multiple times is safe.
    Init,

    /// Rank reports against a free-text query.
    ///
    /// Embeds the query with the configured provider and returns the
    /// most similar reports, ascending cosine distance.
    Search {
        /// The search query text.
        query: String,

        /// Maximum number of results (clamped to 50).
        #[arg(long)]
        limit: Option<i64>,

        /// Similarity threshold in [0, 1]; reported in stats.
        #[arg(long)]
        threshold: Option<f64>,

        /// Emit the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rank reports against a stored report.
    ///
    /// Uses the report's stored embedding as the query vector and also
    /// reports how many other reports sit within 1 km of it.
    Similar {
        /// Source report id (positive integer).
        report_id: i64,

        /// Maximum number of results (clamped to 50).
        #[arg(long)]
        limit: Option<i64>,

        /// Similarity threshold in [0, 1]; reported in stats.
        #[arg(long)]
        threshold: Option<f64>,

        /// Emit the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Group recent reports into hotspot clusters.
    ///
    /// Runs greedy similarity clustering over analyzed/resolved reports
    /// from the configured time window and prints each cluster with its
    /// pattern metadata.
    Cluster {
        /// Minimum cluster size (>= 2).
        #[arg(long)]
        min_size: Option<usize>,

        /// Maximum number of clusters (>= 1).
        #[arg(long)]
        max_clusters: Option<usize>,

        /// Similarity threshold in (0, 1].
        #[arg(long)]
        threshold: Option<f64>,

        /// Time window in days (>= 1).
        #[arg(long)]
        days: Option<i64>,

        /// Emit the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show corpus counts and embedding coverage.
    Stats,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "wst", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Search {
            query,
            limit,
            threshold,
            json,
        } => {
            search::run_search(&cfg, &query, limit, threshold, json).await?;
        }
        Commands::Similar {
            report_id,
            limit,
            threshold,
            json,
        } => {
            similar::run_similar(&cfg, report_id, limit, threshold, json).await?;
        }
        Commands::Cluster {
            min_size,
            max_clusters,
            threshold,
            days,
            json,
        } => {
            let mut params = ClusterParams::from_config(&cfg);
            if let Some(min_size) = min_size {
                params.min_cluster_size = min_size;
            }
            if let Some(max_clusters) = max_clusters {
                params.max_clusters = max_clusters;
            }
            if let Some(threshold) = threshold {
                params.similarity_threshold = threshold;
            }
            if let Some(days) = days {
                params.window_days = days;
            }
            cluster::run_cluster(&cfg, &params, json).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}
