//! Translation Service - orchestration over an unreliable translation API
//!
//! This library combines a free best-effort fetch and a flaky paid request
//! into free, batch and premium translation operations with well defined
//! failure semantics.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod core;

// Re-export key types for convenience
pub use crate::core::{
    api::{ExternalApi, RequestCallback},
    catalog::{Catalog, CatalogEntry, InMemoryApi},
    config::ServiceConfig,
    errors::{ApiError, ErrorKind, TranslationError},
    models::{Quality, TranslationResult},
    service::{TranslationService, MAX_REQUEST_ATTEMPTS},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
