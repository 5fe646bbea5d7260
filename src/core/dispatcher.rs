//! Word-level translation dispatcher
//!
//! A request is validated against the language catalog, charged against the
//! hourly symbols quota, then split into words that are translated
//! concurrently. Each word waits for a local worker slot and one rate limiter
//! permit before calling the provider. Results are joined back in input order;
//! a single missing word fails the whole request.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

use crate::core::catalog::LanguageCatalog;
use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::history::{HistoryStore, TranslationRecord};
use crate::core::models::{
    count_symbols, split_words, LanguageCode, TranslationRequest, TranslationResult, WordUnit,
};
use crate::core::provider::ProviderClient;
use crate::core::quota::QuotaTracker;
use crate::core::rate_limiter::RateLimiter;
use crate::core::schedule::spawn_aligned;

/// Length of the symbols quota window
pub const QUOTA_WINDOW: Duration = Duration::from_secs(3600);

/// Time timers get to exit after an undrained deadline
const ABORT_SETTLE: Duration = Duration::from_millis(500);

/// How shutdown went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Every in-flight word finished before the grace period ran out
    pub workers_drained: bool,
    /// Every background timer exited before the grace period ran out
    pub timers_stopped: bool,
}

impl ShutdownReport {
    /// Both workers and timers finished in time
    pub fn is_clean(&self) -> bool {
        self.workers_drained && self.timers_stopped
    }
}

/// Builder wiring a dispatcher to its collaborators
pub struct DispatcherBuilder {
    config: TranslatorConfig,
    provider: Arc<dyn ProviderClient>,
    history: Option<Arc<dyn HistoryStore>>,
}

impl DispatcherBuilder {
    /// Persist successful translations to `store`
    pub fn history(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    /// Validate config, start the catalog refresh and the window timers
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(self) -> Result<Arc<TranslationDispatcher>> {
        self.config.validate()?;

        let shutdown = CancellationToken::new();
        let catalog = Arc::new(LanguageCatalog::new(Arc::clone(&self.provider)));
        let rate_limiter = Arc::new(RateLimiter::new(self.config.requests_limit));
        let quota = Arc::new(QuotaTracker::new(self.config.symbols_limit));

        let mut timers = vec![rate_limiter.spawn_refill(shutdown.clone())];

        let window = Arc::clone(&quota);
        timers.push(spawn_aligned(
            "symbols_quota",
            QUOTA_WINDOW,
            shutdown.clone(),
            move || window.reset_window(),
        ));

        catalog.refresh();
        if let Some(period) = self.config.catalog_refresh_interval() {
            timers.push(catalog.spawn_periodic(period, shutdown.clone()));
        }

        info!(
            requests_limit = self.config.requests_limit,
            symbols_limit = self.config.symbols_limit,
            pool_threads = self.config.pool_threads,
            "Translation dispatcher started"
        );

        Ok(Arc::new(TranslationDispatcher {
            workers: Arc::new(Semaphore::new(self.config.pool_threads)),
            provider: self.provider,
            history: self.history,
            catalog,
            rate_limiter,
            quota,
            tasks: TaskTracker::new(),
            closing: CancellationToken::new(),
            shutdown,
            abort: CancellationToken::new(),
            timers: Mutex::new(timers),
            grace: self.config.shutdown_grace(),
        }))
    }
}

/// Everything one word task needs, cloned out of the dispatcher
#[derive(Clone)]
struct WordContext {
    provider: Arc<dyn ProviderClient>,
    rate_limiter: Arc<RateLimiter>,
    workers: Arc<Semaphore>,
    abort: CancellationToken,
    source: LanguageCode,
    target: LanguageCode,
}

impl WordContext {
    /// Translate one word; any failure becomes `None`
    async fn translate(self, word: WordUnit) -> (usize, Option<String>) {
        let index = word.index;

        let _worker = match self.workers.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                debug!(word_index = index, "Worker pool closed");
                return (index, None);
            }
        };

        if self.rate_limiter.acquire().await.is_err() {
            debug!(word_index = index, "Rate limiter closed before dispatch");
            return (index, None);
        }

        let call = self
            .provider
            .translate(self.source.as_str(), self.target.as_str(), &word.text);

        let outcome = tokio::select! {
            _ = self.abort.cancelled() => {
                warn!(word_index = index, "Provider call cancelled by shutdown");
                None
            }
            result = call => match result {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(word_index = index, "Provider failed to translate word: {}", e);
                    None
                }
            },
        };

        (index, outcome)
    }
}

/// Rate-limited, quota-aware translation dispatcher
pub struct TranslationDispatcher {
    provider: Arc<dyn ProviderClient>,
    history: Option<Arc<dyn HistoryStore>>,
    catalog: Arc<LanguageCatalog>,
    rate_limiter: Arc<RateLimiter>,
    quota: Arc<QuotaTracker>,
    workers: Arc<Semaphore>,
    tasks: TaskTracker,
    // Set first on shutdown: no new requests
    closing: CancellationToken,
    // Stops the timers once in-flight work is done
    shutdown: CancellationToken,
    // Interrupts provider calls still running at the deadline
    abort: CancellationToken,
    timers: Mutex<Vec<JoinHandle<()>>>,
    grace: Duration,
}

impl TranslationDispatcher {
    /// Start building a dispatcher
    pub fn builder(config: TranslatorConfig, provider: Arc<dyn ProviderClient>) -> DispatcherBuilder {
        DispatcherBuilder {
            config,
            provider,
            history: None,
        }
    }

    /// Translate a request word by word
    #[instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        if self.closing.is_cancelled() {
            return Err(TranslationError::ProviderUnavailable);
        }

        let (source, target) = self.validate_languages(request)?;

        let words = split_words(&request.source_text);
        let symbols = count_symbols(&words);
        if !self.quota.try_consume(symbols) {
            warn!(
                requested = symbols,
                remaining = self.quota.remaining(),
                "Symbols limit exceeded"
            );
            return Err(TranslationError::SymbolsLimitExceeded {
                limit: self.quota.ceiling(),
            });
        }
        debug!(
            words = words.len(),
            symbols,
            remaining = self.quota.remaining(),
            "Quota reserved"
        );
        if self.quota.is_low() {
            warn!(
                remaining = self.quota.remaining(),
                limit = self.quota.ceiling(),
                "Symbols quota is running low"
            );
        }

        let translated_text = self.dispatch(source, target, words).await?;

        let result = TranslationResult {
            translated_text,
            response_timestamp: Utc::now(),
        };
        self.record(request, &result).await;

        Ok(result)
    }

    fn validate_languages(&self, request: &TranslationRequest) -> Result<(LanguageCode, LanguageCode)> {
        if !self.catalog.is_ready() {
            warn!(
                last_error = ?self.catalog.last_error(),
                "Language catalog is not loaded"
            );
            return Err(TranslationError::ProviderUnavailable);
        }

        let source = LanguageCode::new(&request.source_language_code);
        let target = LanguageCode::new(&request.target_language_code);

        for code in [&source, &target] {
            if !self.catalog.contains(code) {
                return Err(TranslationError::InvalidLanguageCode(code.to_string()));
            }
        }

        Ok((source, target))
    }

    async fn dispatch(
        &self,
        source: LanguageCode,
        target: LanguageCode,
        words: Vec<WordUnit>,
    ) -> Result<String> {
        if words.is_empty() {
            return Ok(String::new());
        }

        let context = WordContext {
            provider: Arc::clone(&self.provider),
            rate_limiter: Arc::clone(&self.rate_limiter),
            workers: Arc::clone(&self.workers),
            abort: self.abort.clone(),
            source,
            target,
        };

        let total = words.len();
        let mut slots: Vec<Option<String>> = vec![None; total];

        let handles: Vec<_> = words
            .into_iter()
            .map(|word| self.tasks.spawn(context.clone().translate(word)))
            .collect();

        for joined in join_all(handles).await {
            match joined {
                Ok((index, text)) => slots[index] = text,
                Err(e) => warn!("Word task did not complete: {}", e),
            }
        }

        let missing = slots.iter().filter(|slot| slot.is_none()).count();
        if missing > 0 {
            warn!(missing, total, "Discarding partial translation");
            return Err(TranslationError::ProviderUnavailable);
        }

        Ok(slots.into_iter().flatten().collect::<Vec<_>>().join(" "))
    }

    async fn record(&self, request: &TranslationRequest, result: &TranslationResult) {
        let Some(history) = &self.history else {
            return;
        };

        if let Err(e) = history.save(TranslationRecord::new(request, result)).await {
            warn!("Failed to save translation history: {}", e);
        }
    }

    /// Stop timers and workers, waiting up to the configured grace period
    pub async fn shutdown(&self) -> ShutdownReport {
        self.shutdown_within(self.grace).await
    }

    /// Stop accepting requests, drain in-flight words within `grace`, then
    /// stop the timers
    ///
    /// The refill timer keeps running while draining, so words still waiting
    /// for a rate permit complete. Calls left at the deadline are cancelled.
    pub async fn shutdown_within(&self, grace: Duration) -> ShutdownReport {
        let deadline = Instant::now() + grace;

        self.closing.cancel();
        self.tasks.close();
        info!(in_flight = self.in_flight(), "Draining worker pool");

        let workers_drained = tokio::time::timeout_at(deadline, self.tasks.wait())
            .await
            .is_ok();
        if !workers_drained {
            warn!(
                in_flight = self.in_flight(),
                "Cancelling provider calls still running at the deadline"
            );
            self.abort.cancel();
        }
        info!(success = workers_drained, "Worker pool shutdown completed");

        self.shutdown.cancel();
        self.rate_limiter.close();
        self.workers.close();

        let timers_deadline = deadline.max(Instant::now() + ABORT_SETTLE);
        let mut timers = self.timers.lock().await;
        let mut timers_stopped = true;
        for mut handle in timers.drain(..) {
            if tokio::time::timeout_at(timers_deadline, &mut handle).await.is_err() {
                handle.abort();
                timers_stopped = false;
            }
        }
        info!(success = timers_stopped, "Window timers shutdown completed");

        let report = ShutdownReport {
            workers_drained,
            timers_stopped,
        };
        if !report.is_clean() {
            warn!(?report, "Shutdown did not finish within {:?}", grace);
        }
        report
    }

    /// Language catalog used for validation
    pub fn catalog(&self) -> &Arc<LanguageCatalog> {
        &self.catalog
    }

    /// Symbols quota of the current window
    pub fn quota(&self) -> &Arc<QuotaTracker> {
        &self.quota
    }

    /// Per-second provider call limiter
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// History store, if one was wired in
    pub fn history(&self) -> Option<&Arc<dyn HistoryStore>> {
        self.history.as_ref()
    }

    /// Per-word tasks currently running or waiting for permits
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }
}
