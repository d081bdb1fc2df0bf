//! Core data models for translation

use serde::{Deserialize, Serialize};

/// Opaque quality score assigned by the external API
pub type Quality = u32;

/// Translation returned by the external `fetch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Translated text
    pub translation: String,
    /// Quality score of the translation
    pub quality: Quality,
}

impl TranslationResult {
    /// Create a result from a translation and its quality
    pub fn new(translation: impl Into<String>, quality: Quality) -> Self {
        Self {
            translation: translation.into(),
            quality,
        }
    }

    /// Check if the result is good enough for the caller
    pub fn meets(&self, minimum_quality: Quality) -> bool {
        self.quality >= minimum_quality
    }
}
