//! Cached set of provider-supported language codes

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::models::LanguageCode;
use crate::core::provider::ProviderClient;

/// Outcome of the most recent refresh attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogStatus {
    /// No refresh has finished yet
    Pending,
    /// Last refresh replaced the set with this many codes
    Loaded(usize),
    /// Last refresh failed; the previous set (possibly empty) is kept
    Failed(String),
}

/// Language catalog shared between the dispatcher and its refresh task
pub struct LanguageCatalog {
    codes: RwLock<Arc<HashSet<String>>>,
    provider: Arc<dyn ProviderClient>,
    status: watch::Sender<CatalogStatus>,
}

impl LanguageCatalog {
    /// Create an empty, not-yet-ready catalog
    pub fn new(provider: Arc<dyn ProviderClient>) -> Self {
        let (status, _) = watch::channel(CatalogStatus::Pending);
        Self {
            codes: RwLock::new(Arc::new(HashSet::new())),
            provider,
            status,
        }
    }

    /// Fetch the language list and swap it in; failures keep the old set
    pub async fn refresh_now(&self) -> CatalogStatus {
        let status = match self.provider.list_languages().await {
            Ok(codes) if codes.is_empty() => {
                warn!("Provider returned an empty language list, keeping current catalog");
                CatalogStatus::Failed("provider returned no languages".to_string())
            }
            Ok(codes) => {
                let count = codes.len();
                self.swap(codes);
                info!(languages = count, "Language catalog refreshed");
                CatalogStatus::Loaded(count)
            }
            Err(e) => {
                warn!("Failed to refresh language catalog: {}", e);
                CatalogStatus::Failed(e.to_string())
            }
        };

        self.status.send_replace(status.clone());
        status
    }

    /// Refresh in the background without blocking the caller
    pub fn refresh(self: &Arc<Self>) -> JoinHandle<CatalogStatus> {
        let catalog = Arc::clone(self);
        tokio::spawn(async move { catalog.refresh_now().await })
    }

    /// Refresh every `period` until shutdown
    pub fn spawn_periodic(
        self: &Arc<Self>,
        period: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let catalog = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick is immediate and startup already refreshed
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        catalog.refresh_now().await;
                    }
                }
            }
        })
    }

    fn swap(&self, codes: HashSet<String>) {
        let codes = Arc::new(codes);
        match self.codes.write() {
            Ok(mut guard) => *guard = codes,
            Err(poisoned) => *poisoned.into_inner() = codes,
        }
    }

    fn snapshot(&self) -> Arc<HashSet<String>> {
        match self.codes.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Membership check against the current set
    pub fn contains(&self, code: &LanguageCode) -> bool {
        self.snapshot().contains(code.as_str())
    }

    /// True once a refresh has loaded at least one code
    pub fn is_ready(&self) -> bool {
        !self.snapshot().is_empty()
    }

    /// Wait until the catalog is ready or `timeout` elapses
    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        let mut status = self.status.subscribe();
        let ready = tokio::time::timeout(timeout, async {
            loop {
                if self.is_ready() {
                    return true;
                }
                if !matches!(*status.borrow_and_update(), CatalogStatus::Pending) {
                    return self.is_ready();
                }
                if status.changed().await.is_err() {
                    return self.is_ready();
                }
            }
        })
        .await;

        ready.unwrap_or(false)
    }

    /// Status of the last refresh attempt
    pub fn status(&self) -> CatalogStatus {
        self.status.borrow().clone()
    }

    /// Message of the last failed refresh, if the last one failed
    pub fn last_error(&self) -> Option<String> {
        match self.status() {
            CatalogStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Sorted copy of the supported codes
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.snapshot().iter().cloned().collect();
        codes.sort();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ProviderError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider whose language list is scripted per call
    struct ScriptedLanguages {
        responses: Mutex<Vec<Result<Vec<&'static str>, ()>>>,
    }

    impl ScriptedLanguages {
        fn new(responses: Vec<Result<Vec<&'static str>, ()>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
            })
        }
    }

    #[async_trait]
    impl ProviderClient for ScriptedLanguages {
        async fn translate(&self, _source: &str, _target: &str, text: &str) -> Result<String, ProviderError> {
            Ok(text.to_string())
        }

        async fn list_languages(&self) -> Result<HashSet<String>, ProviderError> {
            let next = self.responses.lock().unwrap().remove(0);
            match next {
                Ok(codes) => Ok(codes.into_iter().map(String::from).collect()),
                Err(()) => Err(ProviderError::NetworkError {
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_refresh_populates_catalog() {
        let catalog = LanguageCatalog::new(ScriptedLanguages::new(vec![Ok(vec!["en", "ru"])]));
        assert!(!catalog.is_ready());
        assert_eq!(catalog.status(), CatalogStatus::Pending);

        assert_eq!(catalog.refresh_now().await, CatalogStatus::Loaded(2));
        assert!(catalog.is_ready());
        assert!(catalog.contains(&LanguageCode::new("EN")));
        assert!(!catalog.contains(&LanguageCode::new("jk")));
        assert_eq!(catalog.codes(), vec!["en", "ru"]);
    }

    #[tokio::test]
    async fn test_failed_first_refresh_leaves_catalog_empty() {
        let catalog = LanguageCatalog::new(ScriptedLanguages::new(vec![Err(())]));

        let status = catalog.refresh_now().await;
        assert!(matches!(status, CatalogStatus::Failed(_)));
        assert!(!catalog.is_ready());
        assert!(catalog.last_error().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_set() {
        let catalog = LanguageCatalog::new(ScriptedLanguages::new(vec![
            Ok(vec!["en", "ru"]),
            Err(()),
            Ok(vec![]),
        ]));

        catalog.refresh_now().await;
        catalog.refresh_now().await;
        assert!(catalog.contains(&LanguageCode::new("ru")));

        catalog.refresh_now().await;
        assert_eq!(catalog.codes(), vec!["en", "ru"]);
    }

    #[tokio::test]
    async fn test_background_refresh_and_wait_ready() {
        let catalog = Arc::new(LanguageCatalog::new(ScriptedLanguages::new(vec![Ok(vec![
            "de",
        ])])));

        let handle = catalog.refresh();
        assert!(catalog.wait_ready(Duration::from_secs(5)).await);
        assert_eq!(handle.await.unwrap(), CatalogStatus::Loaded(1));
    }

    #[tokio::test]
    async fn test_wait_ready_returns_on_failure() {
        let catalog = Arc::new(LanguageCatalog::new(ScriptedLanguages::new(vec![Err(())])));

        catalog.refresh();
        assert!(!catalog.wait_ready(Duration::from_secs(5)).await);
    }
}
