//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Default provider endpoint
const DEFAULT_API_ENDPOINT: &str = "https://translate.api.cloud.yandex.net/translate/v2";

/// Configuration for the translation dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Provider API key
    pub api_key: String,
    /// Provider base URL
    pub api_endpoint: String,
    /// Cloud folder sent with each call, if any
    pub folder_id: Option<String>,
    /// Provider calls allowed per wall-clock second
    pub requests_limit: usize,
    /// Characters allowed per wall-clock hour
    pub symbols_limit: usize,
    /// Maximum per-word calls in flight locally
    pub pool_threads: usize,
    /// HTTP request timeout in milliseconds
    pub timeout_ms: u64,
    /// Periodic catalog refresh; `None` refreshes only at startup
    pub catalog_refresh_secs: Option<u64>,
    /// How long shutdown waits for in-flight words
    pub shutdown_grace_ms: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            folder_id: None,
            requests_limit: 20,
            symbols_limit: 1_000_000,
            pool_threads: 8,
            timeout_ms: 30000,
            catalog_refresh_secs: None,
            shutdown_grace_ms: 60000,
        }
    }
}

/// Read and parse an optional environment variable
fn env_parse<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} is not valid: {}", name, e)),
        _ => Ok(None),
    }
}

impl TranslatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let api_key = std::env::var("YC_API_KEY")
            .map_err(|_| anyhow::anyhow!("YC_API_KEY environment variable is required"))?;

        let api_endpoint =
            std::env::var("YC_API_ENDPOINT").unwrap_or_else(|_| defaults.api_endpoint.clone());

        let folder_id = std::env::var("YC_FOLDER_ID").ok().filter(|s| !s.is_empty());

        Ok(Self {
            api_key,
            api_endpoint,
            folder_id,
            requests_limit: env_parse("REQUESTS_LIMIT")?.unwrap_or(defaults.requests_limit),
            symbols_limit: env_parse("SYMBOLS_LIMIT")?.unwrap_or(defaults.symbols_limit),
            pool_threads: env_parse("TRANSLATION_THREADS")?.unwrap_or(defaults.pool_threads),
            timeout_ms: env_parse("REQUEST_TIMEOUT_MS")?.unwrap_or(defaults.timeout_ms),
            catalog_refresh_secs: env_parse("CATALOG_REFRESH_SECS")?,
            shutdown_grace_ms: env_parse("SHUTDOWN_GRACE_MS")?
                .unwrap_or(defaults.shutdown_grace_ms),
        })
    }

    /// Load `.env` if present, then read the environment
    ///
    /// Not validated; callers apply their overrides first.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }
        Self::from_env()
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            return Err(anyhow::anyhow!("API key is required"));
        }

        if self.api_endpoint.is_empty() {
            return Err(anyhow::anyhow!("API endpoint is required"));
        }

        if self.requests_limit == 0 {
            return Err(anyhow::anyhow!("requests_limit must be greater than 0"));
        }

        if self.symbols_limit == 0 {
            return Err(anyhow::anyhow!("symbols_limit must be greater than 0"));
        }

        if self.pool_threads == 0 {
            return Err(anyhow::anyhow!("pool_threads must be greater than 0"));
        }

        if self.requests_limit > Semaphore::MAX_PERMITS {
            return Err(anyhow::anyhow!(
                "requests_limit must be at most {}",
                Semaphore::MAX_PERMITS
            ));
        }

        if self.pool_threads > Semaphore::MAX_PERMITS {
            return Err(anyhow::anyhow!(
                "pool_threads must be at most {}",
                Semaphore::MAX_PERMITS
            ));
        }

        if self.pool_threads > self.requests_limit.saturating_mul(10) {
            warn!(
                pool_threads = self.pool_threads,
                requests_limit = self.requests_limit,
                "Worker pool is much larger than the rate limit; most workers will wait on permits"
            );
        }

        Ok(())
    }

    /// HTTP request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Default shutdown grace period
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Period of the catalog refresh timer, if enabled
    pub fn catalog_refresh_interval(&self) -> Option<Duration> {
        self.catalog_refresh_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
