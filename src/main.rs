//! # Dataset Explorer CLI (`dsx`)
//!
//! Serves the read-only dataset API and offers a couple of operational
//! lookups against the same store.
//!
//! ## Usage
//!
//! ```bash
//! dsx --config ./config/dsx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dsx serve` | Start the HTTP server |
//! | `dsx datasets` | Print the dataset list from the store |
//! | `dsx epochs <dsname>` | Print the resolved epoch list for a dataset |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dataset_explorer::epochs::EpochResolver;
use dataset_explorer::store::mysql::MySqlStore;
use dataset_explorer::store::DatasetStore;
use dataset_explorer::{config, db, server};

/// Dataset Explorer — read-only HTTP API over epoch-versioned curation
/// datasets in MySQL.
#[derive(Parser)]
#[command(
    name = "dsx",
    about = "Dataset Explorer — read-only HTTP API over epoch-versioned curation datasets",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/dsx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to the address in `[server].bind` and serves the dataset
    /// API until the process is terminated.
    Serve,

    /// Print the dataset list from the store's metadata schema.
    Datasets,

    /// Print the resolved epoch list for a dataset, newest first.
    ///
    /// Only datasets in `[datasets].registered` resolve; anything else
    /// prints nothing, exactly as the API would answer.
    Epochs {
        /// Dataset name.
        dsname: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Datasets => {
            let pool = db::connect(&cfg).await?;
            let store = MySqlStore::new(pool, cfg.store.metadata_schema.clone());
            for name in store.dataset_names().await? {
                println!("{}", name);
            }
        }
        Commands::Epochs { dsname } => {
            let pool = db::connect(&cfg).await?;
            let store = MySqlStore::new(pool, cfg.store.metadata_schema.clone());
            let resolver = EpochResolver::new(&cfg.datasets.registered);
            for epoch in resolver.resolve(&store, &dsname).await {
                println!("{}", epoch);
            }
        }
    }

    Ok(())
}
