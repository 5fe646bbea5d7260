//! Custom error types for translation operations

use thiserror::Error;

/// Errors reported to the caller of a translation request
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Language code is not in the provider catalog
    #[error("Invalid language code: {0}")]
    InvalidLanguageCode(String),

    /// Characters-per-hour window exhausted
    #[error("Processed symbols limit of {limit} per hour exceeded")]
    SymbolsLimitExceeded {
        /// Configured ceiling for the window
        limit: usize,
    },

    /// Catalog not loaded, dispatcher shut down, or a word could not be translated
    #[error("Translation provider is unavailable")]
    ProviderUnavailable,

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong with the configuration
        message: String,
    },

    /// History store failed to persist or read records
    #[error("History error: {message}")]
    HistoryError {
        /// Underlying failure
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl TranslationError {
    /// Whether the same request may succeed later without changes
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranslationError::SymbolsLimitExceeded { .. } | TranslationError::ProviderUnavailable
        )
    }

    /// Stable identifier for mapping to user-facing responses
    pub fn kind(&self) -> &'static str {
        match self {
            TranslationError::InvalidLanguageCode(_) => "invalid_language_code",
            TranslationError::SymbolsLimitExceeded { .. } => "symbols_limit_exceeded",
            TranslationError::ProviderUnavailable => "provider_unavailable",
            TranslationError::ConfigError { .. } => "config_error",
            TranslationError::HistoryError { .. } => "history_error",
            TranslationError::IoError(_) => "io_error",
            TranslationError::JsonError(_) => "json_error",
        }
    }
}

impl From<anyhow::Error> for TranslationError {
    fn from(err: anyhow::Error) -> Self {
        TranslationError::ConfigError {
            message: err.to_string(),
        }
    }
}

/// Failures of a single call to the translation provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// API request failed
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        /// Transport failure description
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        /// What was wrong with the payload
        message: String,
    },

    /// Provider answered without any translation
    #[error("Provider returned no translation")]
    EmptyTranslation,

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatcher_kinds_stay_distinct() {
        let invalid = TranslationError::InvalidLanguageCode("jk".to_string());
        let limit = TranslationError::SymbolsLimitExceeded { limit: 1000 };
        let unavailable = TranslationError::ProviderUnavailable;

        assert_eq!(invalid.kind(), "invalid_language_code");
        assert_eq!(limit.kind(), "symbols_limit_exceeded");
        assert_eq!(unavailable.kind(), "provider_unavailable");

        assert_eq!(invalid.to_string(), "Invalid language code: jk");
        assert!(limit.to_string().contains("1000"));
    }

    #[test]
    fn test_retryable() {
        assert!(!TranslationError::InvalidLanguageCode("xx".into()).is_retryable());
        assert!(TranslationError::SymbolsLimitExceeded { limit: 1 }.is_retryable());
        assert!(TranslationError::ProviderUnavailable.is_retryable());
    }
}
