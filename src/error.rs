//! Error taxonomy for the localization engine.

use thiserror::Error;

/// Errors produced by languages, translators, the cache and localizations.
#[derive(Debug, Error)]
pub enum L10nError {
    /// A locale tag could not be parsed
    #[error("Invalid locale: '{0}'")]
    InvalidLocale(String),

    /// A translator was asked to serve a language outside its supported set
    #[error("Language '{language}' is not supported by {translator}")]
    UnsupportedLanguage { language: String, translator: String },

    /// No resource bundle in the fallback chain defines the message id
    #[error("Message '{id}' not found for locale '{locale}' in resources {resources:?}")]
    MessageNotFound {
        id: String,
        locale: String,
        resources: Vec<String>,
    },

    /// The cache holds no translation of the text for the language
    #[error("Translation of '{text}' not found in cache for language '{language}'")]
    CacheMiss { language: String, text: String },

    /// The cache table was accessed before `load()`
    #[error("Translation cache is not loaded")]
    CacheNotLoaded,

    /// The backend refused the request because of quota exhaustion
    #[error("{backend} is rate limited")]
    RateLimited { backend: String },

    /// The backend answered with a non-success status
    #[error("{backend} API error ({status}): {body}")]
    Api {
        backend: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response
    #[error("Failed to send request to {backend}: {source}")]
    Http {
        backend: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a body we could not use
    #[error("Unexpected response from {backend}: {message}")]
    InvalidResponse { backend: String, message: String },

    /// A background task was cancelled or panicked
    #[error("Background task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for localization operations
pub type Result<T, E = L10nError> = std::result::Result<T, E>;

impl L10nError {
    /// Whether this error is the rate-limit signal of a translation backend.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, L10nError::RateLimited { .. })
    }

    /// Determine if an error is transient (5xx, network errors).
    /// Rate limits are excluded: they are answered by the fallback backend, not by waiting.
    pub fn is_retryable(&self) -> bool {
        match self {
            L10nError::Http { .. } => true,
            L10nError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether this error only means "no static message for this id".
    pub fn is_message_not_found(&self) -> bool {
        matches!(self, L10nError::MessageNotFound { .. })
    }
}
