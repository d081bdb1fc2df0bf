//! Main entry point for the Translation Service CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use translation_service::cli::commands::{self, Commands};
use translation_service::ServiceConfig;

/// Translation Service - free, batch and premium translations from a catalog
#[derive(Parser, Debug)]
#[command(name = "translation-service", version, about, long_about = None)]
struct Args {
    /// JSON catalog file (optional, defaults to CATALOG_PATH env var)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Base delay between request attempts in milliseconds
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("translation_service={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Override config with CLI args if provided
    let mut config = ServiceConfig::from_env()?;
    if let Some(catalog) = args.catalog {
        config.catalog_path = Some(catalog);
    }
    if let Some(retry_delay_ms) = args.retry_delay_ms {
        config.retry_delay_ms = retry_delay_ms;
    }
    config.validate()?;

    // Execute command
    match args.command {
        Some(Commands::Free { text }) => {
            commands::handle_free(&config, text).await?;
        }
        Some(Commands::Batch { texts }) => {
            commands::handle_batch(&config, texts).await?;
        }
        Some(Commands::Request { text, save }) => {
            commands::handle_request(&config, text, save).await?;
        }
        Some(Commands::Premium {
            text,
            min_quality,
            save,
        }) => {
            commands::handle_premium(&config, text, min_quality, save).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
