//! The external translation API consumed by the service

use async_trait::async_trait;
use std::fmt::Debug;
use tokio::sync::oneshot;

use crate::core::errors::ApiError;
use crate::core::models::TranslationResult;

/// Completion signal for [`ExternalApi::request`], fired exactly once
pub type RequestCallback = Box<dyn FnOnce(Result<(), ApiError>) + Send + 'static>;

/// Capability exposed by the external translation service
///
/// Implementations are shared between every in-flight operation, so they
/// must tolerate concurrent calls.
#[async_trait]
pub trait ExternalApi: Send + Sync + Debug {
    /// Look up the current translation for `text`
    async fn fetch(&self, text: &str) -> Result<TranslationResult, ApiError>;

    /// Ask the service to produce or improve the translation for `text`
    ///
    /// The outcome is reported through `on_complete`, not a return value.
    fn request(&self, text: &str, on_complete: RequestCallback);
}

/// Await the completion signal of a single [`ExternalApi::request`] call
pub async fn request_completion(api: &dyn ExternalApi, text: &str) -> Result<(), ApiError> {
    let (tx, rx) = oneshot::channel();

    api.request(
        text,
        Box::new(move |outcome| {
            // Receiver only goes away if the caller stopped waiting
            let _ = tx.send(outcome);
        }),
    );

    rx.await.unwrap_or_else(|_| {
        Err(ApiError::Connection {
            message: format!("request for {} was dropped without completing", text),
        })
    })
}
