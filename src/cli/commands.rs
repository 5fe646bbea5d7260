//! CLI command definitions and handlers

use clap::Subcommand;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::config::TranslatorConfig;
use crate::core::dispatcher::TranslationDispatcher;
use crate::core::history::{HistoryStore, JsonLinesHistoryStore};
use crate::core::models::TranslationRequest;
use crate::core::provider::YandexCloudClient;

/// How long commands wait for the first catalog refresh
const CATALOG_WAIT: Duration = Duration::from_secs(15);

/// Commands for Dispatch Translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate text word by word
    Translate {
        /// Source language code
        #[arg(long = "from")]
        source_lang: String,

        /// Target language code
        #[arg(long = "to")]
        target_lang: String,

        /// Client identifier stored with the history record
        #[arg(long, default_value = "cli")]
        client_id: String,

        /// Append the translation to this JSON-lines history file
        #[arg(long)]
        history: Option<PathBuf>,

        /// Text to translate
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List languages supported by the provider
    Languages,

    /// Show saved translations from a history file
    History {
        /// JSON-lines history file
        #[arg(long)]
        file: PathBuf,

        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: usize,

        /// Records per page
        #[arg(long, default_value_t = 20)]
        size: usize,
    },
}

/// Start a dispatcher and wait for its catalog
async fn start_dispatcher(
    config: TranslatorConfig,
    history: Option<Arc<dyn HistoryStore>>,
) -> anyhow::Result<Arc<TranslationDispatcher>> {
    let client = YandexCloudClient::new(&config)?;
    let mut builder = TranslationDispatcher::builder(config, Arc::new(client));
    if let Some(store) = history {
        builder = builder.history(store);
    }
    let dispatcher = builder.start()?;

    if !dispatcher.catalog().wait_ready(CATALOG_WAIT).await {
        warn!(
            "Language catalog not loaded: {}",
            dispatcher
                .catalog()
                .last_error()
                .unwrap_or_else(|| "timed out".to_string())
        );
    }

    Ok(dispatcher)
}

/// Stop the dispatcher and log the report
async fn stop_dispatcher(dispatcher: &TranslationDispatcher) {
    let report = dispatcher.shutdown().await;
    if !report.is_clean() {
        warn!(?report, "Dispatcher did not shut down cleanly");
    }
}

/// Handle translate command
pub async fn handle_translate(
    config: TranslatorConfig,
    source_lang: String,
    target_lang: String,
    client_id: String,
    history: Option<PathBuf>,
    text: Vec<String>,
) -> anyhow::Result<()> {
    let store = history.map(|path| {
        info!("Saving history to {}", path.display());
        Arc::new(JsonLinesHistoryStore::new(path)) as Arc<dyn HistoryStore>
    });
    let dispatcher = start_dispatcher(config, store).await?;

    let request = TranslationRequest::new(source_lang, target_lang, text.join(" "))
        .with_client_id(client_id);
    let result = dispatcher.translate(&request).await;

    stop_dispatcher(&dispatcher).await;

    match result {
        Ok(result) => {
            println!("{}", result.translated_text);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("{} ({})", e, e.kind())),
    }
}

/// Handle languages command
pub async fn handle_languages(config: TranslatorConfig) -> anyhow::Result<()> {
    let dispatcher = start_dispatcher(config, None).await?;
    let codes = dispatcher.catalog().codes();
    stop_dispatcher(&dispatcher).await;

    if codes.is_empty() {
        anyhow::bail!("No languages available from provider");
    }

    for code in codes {
        println!("{}", code);
    }

    Ok(())
}

/// Handle history command
pub async fn handle_history(file: PathBuf, page: usize, size: usize) -> anyhow::Result<()> {
    let store = JsonLinesHistoryStore::new(&file);
    let records = store.find_page(page, size).await?;

    for record in &records.items {
        println!(
            "{} [{} -> {}] {} => {}",
            record.request_timestamp.to_rfc3339(),
            record.source_language_code,
            record.target_language_code,
            record.source_text,
            record.translated_text
        );
    }

    println!(
        "Page {}/{} ({} records)",
        records.page + 1,
        records.total_pages().max(1),
        records.total
    );

    Ok(())
}
