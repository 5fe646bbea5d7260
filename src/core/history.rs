//! Persistence of completed translations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{LanguageCode, TranslationRequest, TranslationResult};

/// One stored request/response pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    /// Record identifier
    pub id: Uuid,
    /// Caller that sent the request
    pub client_id: String,
    /// Normalized source language code
    pub source_language_code: String,
    /// Normalized target language code
    pub target_language_code: String,
    /// Text as submitted
    pub source_text: String,
    /// Joined translation
    pub translated_text: String,
    /// When the request was received
    pub request_timestamp: DateTime<Utc>,
    /// When the translation finished
    pub response_timestamp: DateTime<Utc>,
}

impl TranslationRecord {
    /// Record a successful request, normalizing its language codes
    pub fn new(request: &TranslationRequest, result: &TranslationResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id: request.client_id.clone(),
            source_language_code: LanguageCode::new(&request.source_language_code).to_string(),
            target_language_code: LanguageCode::new(&request.target_language_code).to_string(),
            source_text: request.source_text.clone(),
            translated_text: result.translated_text.clone(),
            request_timestamp: request.request_timestamp,
            response_timestamp: result.response_timestamp,
        }
    }
}

/// A page of records, zero-based
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Records on this page
    pub items: Vec<T>,
    /// Page index
    pub page: usize,
    /// Requested page size
    pub size: usize,
    /// Records in the whole store
    pub total: usize,
}

impl<T> Page<T> {
    /// Number of pages at this size
    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            0
        } else {
            self.total.div_ceil(self.size)
        }
    }
}

fn paginate<T: Clone>(records: &[T], page: usize, size: usize) -> Page<T> {
    let start = page.saturating_mul(size).min(records.len());
    let end = start.saturating_add(size).min(records.len());
    Page {
        items: records[start..end].to_vec(),
        page,
        size,
        total: records.len(),
    }
}

/// Storage for translation history
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a record
    async fn save(&self, record: TranslationRecord) -> Result<()>;

    /// Records in insertion order, `size` per page
    async fn find_page(&self, page: usize, size: usize) -> Result<Page<TranslationRecord>>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;
}

/// History kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<Vec<TranslationRecord>>,
}

impl InMemoryHistoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn save(&self, record: TranslationRecord) -> Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn find_page(&self, page: usize, size: usize) -> Result<Page<TranslationRecord>> {
        let records = self.records.read().await;
        Ok(paginate(&records[..], page, size))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}

/// History appended to a JSON-lines file
#[derive(Debug)]
pub struct JsonLinesHistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesHistoryStore {
    /// Store backed by `path`; the file is created on first save
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<TranslationRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| TranslationError::HistoryError {
                    message: format!("{} line {}: {}", self.path.display(), i + 1, e),
                })
            })
            .collect()
    }
}

#[async_trait]
impl HistoryStore for JsonLinesHistoryStore {
    async fn save(&self, record: TranslationRecord) -> Result<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn find_page(&self, page: usize, size: usize) -> Result<Page<TranslationRecord>> {
        let records = self.load().await?;
        Ok(paginate(&records, page, size))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.load().await?.len())
    }
}
