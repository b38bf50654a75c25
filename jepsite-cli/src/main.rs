//! # jepsite CLI
//!
//! Command-line interface for the jepsite documentation generator.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jepsite")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "jepsite.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every configured version into the output directory
    Build,

    /// Search a built version
    Search {
        /// Search query
        query: String,

        /// Version to search (defaults to the site's default version)
        #[arg(long = "version", value_name = "ID")]
        version_id: Option<String>,

        /// Maximum results to return
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Return JSON for machine consumption
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Build => commands::build_site(&cli.config).await,
        Commands::Search {
            query,
            version_id,
            limit,
            json,
        } => {
            let opts = commands::SearchOptions {
                version: version_id,
                limit,
                json,
            };
            commands::search_site(&cli.config, &query, opts)
        }
    }
}
