//! Error types for the external API and the translation service

use std::fmt;
use thiserror::Error;

/// Failures reported by the external translation API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The text is unknown to the service, or the service cannot be reached
    #[error("{text} is not available in the translation service")]
    NotAvailable {
        /// Text that was looked up
        text: String,
    },

    /// The service knows the text but has no translation for it
    #[error("{text} can not be translated")]
    Untranslatable {
        /// Text that was looked up
        text: String,
    },

    /// Transport-level failure
    #[error("Connection error: {message}")]
    Connection {
        /// What went wrong on the wire
        message: String,
    },

    /// The client misused the API, e.g. overlapping requests for one text
    #[error("Abusive client: {message}")]
    AbusiveClient {
        /// How the API was misused
        message: String,
    },
}

impl ApiError {
    /// Whether the API reported the text as not available
    pub fn is_not_available(&self) -> bool {
        matches!(self, ApiError::NotAvailable { .. })
    }
}

/// Discriminant of a [`TranslationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`TranslationError::NotAvailable`]
    NotAvailable,
    /// See [`TranslationError::Untranslatable`]
    Untranslatable,
    /// See [`TranslationError::BatchIsEmpty`]
    BatchIsEmpty,
    /// See [`TranslationError::QualityThresholdNotMet`]
    QualityThresholdNotMet,
    /// See [`TranslationError::Upstream`]
    Upstream,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotAvailable => write!(f, "not-available"),
            ErrorKind::Untranslatable => write!(f, "untranslatable"),
            ErrorKind::BatchIsEmpty => write!(f, "batch-is-empty"),
            ErrorKind::QualityThresholdNotMet => write!(f, "quality-threshold-not-met"),
            ErrorKind::Upstream => write!(f, "upstream"),
        }
    }
}

/// Translation service errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// The free service reported the text as not available
    #[error("Translation not available: {0}")]
    NotAvailable(#[source] ApiError),

    /// No translation can be produced for the text
    #[error("Untranslatable")]
    Untranslatable {
        /// Underlying API failure, if any
        #[source]
        source: Option<ApiError>,
    },

    /// `batch` was called without any texts
    #[error("Requested a batch translation, but there are no texts in the batch.")]
    BatchIsEmpty,

    /// A translation exists but its quality is too low
    #[error("The translation of {text} does not meet the requested quality threshold.")]
    QualityThresholdNotMet {
        /// Text whose translation was rejected
        text: String,
    },

    /// Failure passed through from the external API unchanged
    #[error(transparent)]
    Upstream(#[from] ApiError),
}

impl TranslationError {
    /// Get the error discriminant
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslationError::NotAvailable(_) => ErrorKind::NotAvailable,
            TranslationError::Untranslatable { .. } => ErrorKind::Untranslatable,
            TranslationError::BatchIsEmpty => ErrorKind::BatchIsEmpty,
            TranslationError::QualityThresholdNotMet { .. } => ErrorKind::QualityThresholdNotMet,
            TranslationError::Upstream(_) => ErrorKind::Upstream,
        }
    }

    /// Reclassify a failed free fetch
    pub(crate) fn from_fetch(cause: ApiError) -> Self {
        if cause.is_not_available() {
            TranslationError::NotAvailable(cause)
        } else {
            TranslationError::Untranslatable {
                source: Some(cause),
            }
        }
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
