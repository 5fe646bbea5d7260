//! Dispatch Translator - rate-limited word-level translation
//!
//! This library validates language codes against a refreshed provider
//! catalog, enforces a requests-per-second limit and a characters-per-hour
//! quota, and translates text by fanning words out to the provider in
//! parallel.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod core;

// Re-export key types for convenience
pub use core::{
    catalog::LanguageCatalog,
    config::TranslatorConfig,
    dispatcher::{DispatcherBuilder, ShutdownReport, TranslationDispatcher},
    errors::{ProviderError, TranslationError},
    history::{HistoryStore, InMemoryHistoryStore, JsonLinesHistoryStore, TranslationRecord},
    models::{LanguageCode, TranslationRequest, TranslationResult},
    provider::{ProviderClient, YandexCloudClient},
    quota::QuotaTracker,
    rate_limiter::RateLimiter,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
