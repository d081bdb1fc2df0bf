//! CLI command definitions and handlers

use clap::Subcommand;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

use crate::core::catalog::{Catalog, InMemoryApi};
use crate::core::config::ServiceConfig;
use crate::core::models::Quality;
use crate::core::service::TranslationService;

/// Commands for the translation service
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch whichever translation exists, regardless of quality
    Free {
        /// Text to translate
        text: String,
    },

    /// Translate several texts with the free service
    Batch {
        /// Texts to translate, in order
        texts: Vec<String>,
    },

    /// Ask the service to produce a translation
    Request {
        /// Text to request a translation for
        text: String,

        /// Write the updated catalog back to disk
        #[arg(long)]
        save: bool,
    },

    /// Fetch a translation of at least the given quality, requesting one if needed
    Premium {
        /// Text to translate
        text: String,

        /// Minimum acceptable quality
        #[arg(short = 'q', long)]
        min_quality: Quality,

        /// Write the updated catalog back to disk
        #[arg(long)]
        save: bool,
    },
}

/// Build the in-memory API and the service from configuration
fn build_service(config: &ServiceConfig) -> anyhow::Result<(InMemoryApi, TranslationService)> {
    let Some(path) = &config.catalog_path else {
        anyhow::bail!("No catalog configured. Pass --catalog or set CATALOG_PATH");
    };

    let catalog = Catalog::load(path)?;
    info!("Loaded {} catalog entries from {}", catalog.entries.len(), path.display());

    let api = InMemoryApi::new(catalog);
    let service = TranslationService::with_config(Arc::new(api.clone()), config.clone());
    Ok((api, service))
}

/// Run an operation, then persist the catalog if asked to, whatever the outcome
async fn with_save<T, F>(
    config: &ServiceConfig,
    api: &InMemoryApi,
    save: bool,
    op: F,
) -> anyhow::Result<T>
where
    F: Future<Output = crate::core::errors::Result<T>>,
{
    let outcome = op.await;

    if save {
        if let Some(path) = &config.catalog_path {
            api.snapshot().await.save(path)?;
            info!("Saved catalog to {}", path.display());
        }
    }

    Ok(outcome?)
}

/// Handle free translation command
pub async fn handle_free(config: &ServiceConfig, text: String) -> anyhow::Result<()> {
    let (_, service) = build_service(config)?;

    let translation = service.free(&text).await?;
    println!("{}", translation);

    Ok(())
}

/// Handle batch translation command
pub async fn handle_batch(config: &ServiceConfig, texts: Vec<String>) -> anyhow::Result<()> {
    let (_, service) = build_service(config)?;

    let translations = service.batch(Some(texts.as_slice())).await?;
    for (text, translation) in texts.iter().zip(&translations) {
        println!("{}\t{}", text, translation);
    }

    Ok(())
}

/// Handle request command
pub async fn handle_request(
    config: &ServiceConfig,
    text: String,
    save: bool,
) -> anyhow::Result<()> {
    let (api, service) = build_service(config)?;

    with_save(config, &api, save, service.request(&text)).await?;
    println!("✅ Translation of {} requested ({} attempts)", text, api.request_calls());

    Ok(())
}

/// Handle premium translation command
pub async fn handle_premium(
    config: &ServiceConfig,
    text: String,
    min_quality: Quality,
    save: bool,
) -> anyhow::Result<()> {
    let (api, service) = build_service(config)?;

    let translation = with_save(config, &api, save, service.premium(&text, min_quality)).await?;
    println!("{}", translation);

    Ok(())
}
