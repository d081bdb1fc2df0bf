//! In-memory external API backed by a JSON translation catalog

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::core::api::{ExternalApi, RequestCallback};
use crate::core::errors::ApiError;
use crate::core::models::{Quality, TranslationResult};

/// Everything the service knows about one source text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Successive translations, later ones replacing earlier ones
    pub versions: Vec<TranslationResult>,
    /// How many versions `fetch` can see
    #[serde(default)]
    pub published: usize,
    /// Upcoming requests that fail before one goes through
    #[serde(default)]
    pub request_failures: u32,
    /// Simulated fetch latency
    #[serde(default)]
    pub delay_ms: u64,
}

impl CatalogEntry {
    /// Entry with one published translation
    pub fn translated(translation: impl Into<String>, quality: Quality) -> Self {
        Self {
            versions: vec![TranslationResult::new(translation, quality)],
            published: 1,
            ..Default::default()
        }
    }

    /// Entry whose first translation only appears after a request
    pub fn pending(translation: impl Into<String>, quality: Quality) -> Self {
        Self {
            versions: vec![TranslationResult::new(translation, quality)],
            published: 0,
            ..Default::default()
        }
    }

    /// Append a version that a later request will publish
    pub fn then(mut self, translation: impl Into<String>, quality: Quality) -> Self {
        self.versions.push(TranslationResult::new(translation, quality));
        self
    }

    /// Make the next `failures` requests fail with a connection error
    pub fn with_request_failures(mut self, failures: u32) -> Self {
        self.request_failures = failures;
        self
    }

    /// Delay every fetch of this text
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Latest translation visible to `fetch`
    pub fn current(&self) -> Option<&TranslationResult> {
        let visible = self.published.min(self.versions.len());
        visible.checked_sub(1).and_then(|i| self.versions.get(i))
    }
}

/// Source text to entry mapping, stored as a JSON object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    /// Entries keyed by source text
    pub entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry
    pub fn with_entry(mut self, text: impl Into<String>, entry: CatalogEntry) -> Self {
        self.entries.insert(text.into(), entry);
        self
    }

    /// Load from JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog: Self = serde_json::from_str(&content)?;
        Ok(catalog)
    }

    /// Save catalog to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// [`ExternalApi`] implementation that serves a [`Catalog`] from memory
///
/// `request` completes on a spawned task, so it must be called from within a
/// tokio runtime. Clones share state and call counters.
#[derive(Debug, Clone)]
pub struct InMemoryApi {
    entries: Arc<RwLock<BTreeMap<String, CatalogEntry>>>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    fetch_calls: Arc<AtomicUsize>,
    request_calls: Arc<AtomicUsize>,
}

impl InMemoryApi {
    /// Create an API serving the given catalog
    pub fn new(catalog: Catalog) -> Self {
        Self {
            entries: Arc::new(RwLock::new(catalog.entries)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            request_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `fetch` calls so far
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `request` calls so far
    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }

    /// Current catalog state, including published versions
    pub async fn snapshot(&self) -> Catalog {
        Catalog {
            entries: self.entries.read().await.clone(),
        }
    }

    async fn complete_request(&self, text: &str) -> Result<(), ApiError> {
        if !self.in_flight.lock().await.insert(text.to_string()) {
            return Err(ApiError::AbusiveClient {
                message: format!("a request for {} is already in progress", text),
            });
        }

        // Let overlapping requests for the same text observe the in-flight marker
        tokio::task::yield_now().await;
        let outcome = self.publish_next(text).await;

        self.in_flight.lock().await.remove(text);
        outcome
    }

    async fn publish_next(&self, text: &str) -> Result<(), ApiError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(text).ok_or_else(|| ApiError::Untranslatable {
            text: text.to_string(),
        })?;

        if entry.request_failures > 0 {
            entry.request_failures -= 1;
            return Err(ApiError::Connection {
                message: format!("request for {} was interrupted", text),
            });
        }

        if entry.published < entry.versions.len() {
            entry.published += 1;
            debug!("Published version {} of {}", entry.published, text);
        }

        Ok(())
    }
}

#[async_trait]
impl ExternalApi for InMemoryApi {
    async fn fetch(&self, text: &str) -> Result<TranslationResult, ApiError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let (delay_ms, current) = {
            let entries = self.entries.read().await;
            let entry = entries.get(text).ok_or_else(|| ApiError::NotAvailable {
                text: text.to_string(),
            })?;
            (entry.delay_ms, entry.current().cloned())
        };

        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        current.ok_or_else(|| ApiError::Untranslatable {
            text: text.to_string(),
        })
    }

    fn request(&self, text: &str, on_complete: RequestCallback) {
        self.request_calls.fetch_add(1, Ordering::SeqCst);

        let api = self.clone();
        let text = text.to_string();
        tokio::spawn(async move {
            let outcome = api.complete_request(&text).await;
            on_complete(outcome);
        });
    }
}
