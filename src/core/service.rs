//! Translation service with batch, retry and quality fallback logic

use futures::future::join_all;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::api::{request_completion, ExternalApi};
use crate::core::config::ServiceConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{Quality, TranslationResult};

/// Total number of attempts made by [`TranslationService::request`]
pub const MAX_REQUEST_ATTEMPTS: u32 = 3;

/// Orchestrates free, batch and premium translations over an [`ExternalApi`]
#[derive(Debug, Clone)]
pub struct TranslationService {
    api: Arc<dyn ExternalApi>,
    config: Arc<ServiceConfig>,
}

impl TranslationService {
    /// Create a service with the default configuration
    pub fn new(api: Arc<dyn ExternalApi>) -> Self {
        Self::with_config(api, ServiceConfig::default())
    }

    /// Create a service with an explicit configuration
    pub fn with_config(api: Arc<dyn ExternalApi>, config: ServiceConfig) -> Self {
        Self {
            api,
            config: Arc::new(config),
        }
    }

    /// Retrieve whichever translation exists, regardless of quality
    pub async fn free(&self, text: &str) -> Result<String> {
        self.api
            .fetch(text)
            .await
            .map(|result| result.translation)
            .map_err(TranslationError::from_fetch)
    }

    /// Translate every text with the free service
    ///
    /// All lookups run concurrently. On failure the error of the first
    /// failing text in input order is returned, however fast the others were.
    pub async fn batch<S: AsRef<str>>(&self, texts: Option<&[S]>) -> Result<Vec<String>> {
        let texts = match texts {
            Some(texts) if !texts.is_empty() => texts,
            _ => return Err(TranslationError::BatchIsEmpty),
        };

        debug!("Batch translating {} texts", texts.len());
        let outcomes = join_all(texts.iter().map(|text| self.free(text.as_ref()))).await;

        outcomes.into_iter().collect()
    }

    /// Make sure a translation gets produced server-side for `text`
    ///
    /// The underlying request is flaky and is attempted up to
    /// [`MAX_REQUEST_ATTEMPTS`] times, one after another.
    pub async fn request(&self, text: &str) -> Result<()> {
        if let Err(TranslationError::NotAvailable(cause)) = self.free(text).await {
            warn!("{} is not available, refusing to request it", text);
            return Err(TranslationError::Untranslatable {
                source: Some(cause),
            });
        }

        let mut attempt = 1;
        loop {
            if let Some(delay) = self.config.backoff_before(attempt) {
                sleep(delay).await;
            }

            debug!("Request attempt {} for {}", attempt, text);
            match request_completion(self.api.as_ref(), text).await {
                Ok(()) => {
                    if attempt > 1 {
                        info!("Request for {} accepted after {} attempts", text, attempt);
                    }
                    return Ok(());
                }
                Err(e) if attempt < MAX_REQUEST_ATTEMPTS => {
                    debug!("Request attempt {} for {} failed: {}", attempt, text, e);
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Giving up on {} after {} attempts: {}", text, attempt, e);
                    return Err(e.into());
                }
            }
        }
    }

    /// Retrieve a translation of at least `minimum_quality`
    ///
    /// Falls back to requesting the translation when none can be fetched.
    pub async fn premium(&self, text: &str, minimum_quality: Quality) -> Result<String> {
        match self.api.fetch(text).await {
            Ok(result) => Self::checked(text, result, minimum_quality),
            Err(e) => {
                warn!("No free translation for {}: {}, requesting one", text, e);
                self.request(text).await?;

                let result = self.api.fetch(text).await?;
                Self::checked(text, result, minimum_quality)
            }
        }
    }

    fn checked(text: &str, result: TranslationResult, minimum_quality: Quality) -> Result<String> {
        if result.meets(minimum_quality) {
            Ok(result.translation)
        } else {
            debug!(
                "Quality {} of {} is below {}",
                result.quality, text, minimum_quality
            );
            Err(TranslationError::QualityThresholdNotMet {
                text: text.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{Catalog, CatalogEntry, InMemoryApi};
    use crate::core::errors::{ApiError, ErrorKind};
    use std::time::Duration;

    fn service(catalog: Catalog) -> (InMemoryApi, TranslationService) {
        let api = InMemoryApi::new(catalog);
        let service = TranslationService::new(Arc::new(api.clone()));
        (api, service)
    }

    fn single(text: &str, entry: CatalogEntry) -> (InMemoryApi, TranslationService) {
        service(Catalog::new().with_entry(text, entry))
    }

    #[tokio::test]
    async fn test_free_returns_translation() {
        let (api, service) = single("jIyaj", CatalogEntry::translated("I understand", 10));

        assert_eq!(service.free("jIyaj").await.unwrap(), "I understand");
        assert_eq!(api.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_free_reclassifies_failures() {
        let (api, service) = single("ghobe'", CatalogEntry::pending("no", 90));

        let err = service.free("Qapla'").await.unwrap_err();
        assert_eq!(
            err,
            TranslationError::NotAvailable(ApiError::NotAvailable { text: "Qapla'".to_string() })
        );

        let err = service.free("ghobe'").await.unwrap_err();
        assert_eq!(
            err,
            TranslationError::Untranslatable {
                source: Some(ApiError::Untranslatable { text: "ghobe'".to_string() })
            }
        );
        assert_eq!(api.request_calls(), 0);
    }

    #[tokio::test]
    async fn test_free_is_idempotent() {
        let (api, service) = single("jIyaj", CatalogEntry::translated("I understand", 10));

        for _ in 0..3 {
            assert!(service.free("jIyaj").await.is_ok());
            assert_eq!(service.free("Qapla'").await.unwrap_err().kind(), ErrorKind::NotAvailable);
        }
        assert_eq!(api.fetch_calls(), 6);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let (_, service) = service(
            Catalog::new()
                .with_entry(
                    "jIyaj",
                    CatalogEntry::translated("I understand", 100).with_delay_ms(30),
                )
                .with_entry("nuqneH", CatalogEntry::translated("hello", 80))
                .with_entry("ghobe'", CatalogEntry::translated("no", 60).with_delay_ms(10)),
        );

        let texts = ["jIyaj", "nuqneH", "ghobe'", "nuqneH"];
        assert_eq!(
            service.batch(Some(&texts[..])).await.unwrap(),
            vec!["I understand", "hello", "no", "hello"]
        );
    }

    #[tokio::test]
    async fn test_batch_runs_concurrently() {
        let (_, service) = service(
            Catalog::new()
                .with_entry("a", CatalogEntry::translated("A", 1).with_delay_ms(200))
                .with_entry("b", CatalogEntry::translated("B", 1).with_delay_ms(200))
                .with_entry("c", CatalogEntry::translated("C", 1).with_delay_ms(200)),
        );

        let started = tokio::time::Instant::now();
        service.batch(Some(&["a", "b", "c"][..])).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(550));
    }

    #[tokio::test]
    async fn test_batch_reports_first_failure_by_position() {
        // The earliest failing input completes last
        let (_, service) = service(
            Catalog::new()
                .with_entry("nuqneH", CatalogEntry::translated("hello", 80))
                .with_entry("ghobe'", CatalogEntry::pending("no", 90).with_delay_ms(50)),
        );

        let texts = vec!["nuqneH".to_string(), "ghobe'".to_string(), "Qapla'".to_string()];
        let err = service.batch(Some(&texts[..])).await.unwrap_err();
        assert_eq!(
            err,
            TranslationError::Untranslatable {
                source: Some(ApiError::Untranslatable { text: "ghobe'".to_string() })
            }
        );
    }

    #[tokio::test]
    async fn test_batch_rejects_empty_input() {
        let (api, service) = service(Catalog::new());

        let empty: [&str; 0] = [];
        assert_eq!(service.batch(Some(&empty[..])).await, Err(TranslationError::BatchIsEmpty));
        assert_eq!(service.batch::<&str>(None).await, Err(TranslationError::BatchIsEmpty));
        assert_eq!(api.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_request_succeeds_first_time() {
        let (api, service) = single("ghobe'", CatalogEntry::pending("no", 90));

        assert_eq!(service.request("ghobe'").await, Ok(()));
        assert_eq!(api.request_calls(), 1);
    }

    #[tokio::test]
    async fn test_request_retries_until_third_attempt() {
        let (api, service) = single(
            "ghobe'",
            CatalogEntry::pending("no", 90).with_request_failures(2),
        );

        assert_eq!(service.request("ghobe'").await, Ok(()));
        assert_eq!(api.request_calls(), 3);
        assert_eq!(service.free("ghobe'").await.unwrap(), "no");
    }

    #[tokio::test]
    async fn test_request_gives_up_after_three_attempts() {
        let (api, service) = single(
            "ghobe'",
            CatalogEntry::pending("no", 90).with_request_failures(4),
        );

        let err = service.request("ghobe'").await.unwrap_err();
        assert_eq!(
            err,
            TranslationError::Upstream(ApiError::Connection {
                message: "request for ghobe' was interrupted".to_string()
            })
        );
        assert_eq!(api.request_calls(), 3);

        // The fourth failure was never consumed
        let snapshot = api.snapshot().await;
        assert_eq!(snapshot.entries["ghobe'"].request_failures, 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_retry_sequentially() {
        // Overlapping attempts for one text would be rejected as abusive
        let (api, service) = service(
            Catalog::new()
                .with_entry("ghobe'", CatalogEntry::pending("no", 90).with_request_failures(2))
                .with_entry("nuqneH", CatalogEntry::pending("hello", 80).with_request_failures(2)),
        );

        let (first, second) = tokio::join!(service.request("ghobe'"), service.request("nuqneH"));
        assert_eq!(first, Ok(()));
        assert_eq!(second, Ok(()));
        assert_eq!(api.request_calls(), 6);
    }

    #[tokio::test]
    async fn test_request_unavailable_text_is_untranslatable() {
        let (api, service) = service(Catalog::new());

        let err = service.request("Qapla'").await.unwrap_err();
        assert_eq!(
            err,
            TranslationError::Untranslatable {
                source: Some(ApiError::NotAvailable { text: "Qapla'".to_string() })
            }
        );
        assert_eq!(api.request_calls(), 0);
    }

    #[tokio::test]
    async fn test_request_waits_between_attempts() {
        let entry = CatalogEntry::pending("no", 90).with_request_failures(2);
        let api = InMemoryApi::new(Catalog::new().with_entry("ghobe'", entry));
        let config = ServiceConfig {
            retry_delay_ms: 20,
            ..Default::default()
        };
        let service = TranslationService::with_config(Arc::new(api.clone()), config);

        let started = tokio::time::Instant::now();
        assert_eq!(service.request("ghobe'").await, Ok(()));
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert_eq!(api.request_calls(), 3);
    }

    #[tokio::test]
    async fn test_premium_quality_met() {
        let (api, service) = single("jIyaj", CatalogEntry::translated("I understand", 90));

        assert_eq!(service.premium("jIyaj", 80).await.unwrap(), "I understand");
        assert_eq!(api.request_calls(), 0);
        assert_eq!(api.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_premium_quality_not_met() {
        let (api, service) = single("jIyaj", CatalogEntry::translated("I understand", 50));

        assert_eq!(
            service.premium("jIyaj", 80).await,
            Err(TranslationError::QualityThresholdNotMet { text: "jIyaj".to_string() })
        );
        assert_eq!(api.request_calls(), 0);
    }

    #[tokio::test]
    async fn test_premium_requests_missing_translation() {
        let (api, service) = single(
            "ghobe'",
            CatalogEntry::pending("no", 90).with_request_failures(1),
        );

        assert_eq!(service.premium("ghobe'", 80).await.unwrap(), "no");
        assert_eq!(api.request_calls(), 2);
    }

    #[tokio::test]
    async fn test_premium_refetch_below_threshold() {
        let (_, service) = single("ghobe'", CatalogEntry::pending("no", 40));

        assert_eq!(
            service.premium("ghobe'", 80).await,
            Err(TranslationError::QualityThresholdNotMet { text: "ghobe'".to_string() })
        );
    }

    #[tokio::test]
    async fn test_premium_propagates_request_failure() {
        let (api, service) = single(
            "ghobe'",
            CatalogEntry::pending("no", 90).with_request_failures(3),
        );

        let err = service.premium("ghobe'", 80).await.unwrap_err();
        assert_eq!(
            err,
            TranslationError::Upstream(ApiError::Connection {
                message: "request for ghobe' was interrupted".to_string()
            })
        );
        // Initial fetch and availability check, no re-fetch
        assert_eq!(api.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn test_premium_propagates_refetch_failure() {
        // The request goes through but has nothing to publish
        let entry = CatalogEntry {
            versions: vec![],
            published: 0,
            ..Default::default()
        };
        let (api, service) = single("ghobe'", entry);

        assert_eq!(
            service.premium("ghobe'", 10).await,
            Err(TranslationError::Upstream(ApiError::Untranslatable {
                text: "ghobe'".to_string()
            }))
        );
        assert_eq!(api.fetch_calls(), 3);
        assert_eq!(api.request_calls(), 1);
    }

    #[tokio::test]
    async fn test_premium_unknown_text_is_untranslatable() {
        let (api, service) = service(Catalog::new());

        let err = service.premium("Qapla'", 80).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Untranslatable);
        assert_eq!(api.request_calls(), 0);
    }
}
