//! Main entry point for Dispatch Translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dispatch_translator::cli::commands::{self, Commands};
use dispatch_translator::TranslatorConfig;

/// Dispatch Translator - rate-limited word-level translation
#[derive(Parser, Debug)]
#[command(name = "dispatch-translator", version, about, long_about = None)]
struct Args {
    /// Provider API key (optional, defaults to YC_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Provider calls allowed per second
    #[arg(long)]
    requests_limit: Option<usize>,

    /// Characters allowed per hour
    #[arg(long)]
    symbols_limit: Option<usize>,

    /// Maximum concurrent per-word calls
    #[arg(long)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Args {
    /// Environment configuration with CLI overrides applied
    fn config(&self) -> anyhow::Result<TranslatorConfig> {
        if let Some(api_key) = &self.api_key {
            std::env::set_var("YC_API_KEY", api_key);
        }

        let mut config = TranslatorConfig::load()?;
        if let Some(limit) = self.requests_limit {
            config.requests_limit = limit;
        }
        if let Some(limit) = self.symbols_limit {
            config.symbols_limit = limit;
        }
        if let Some(threads) = self.threads {
            config.pool_threads = threads;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}={}", env!("CARGO_CRATE_NAME"), log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Some(Commands::Translate {
            ref source_lang,
            ref target_lang,
            ref client_id,
            ref history,
            ref text,
        }) => {
            commands::handle_translate(
                args.config()?,
                source_lang.clone(),
                target_lang.clone(),
                client_id.clone(),
                history.clone(),
                text.clone(),
            )
            .await?;
        }
        Some(Commands::Languages) => {
            commands::handle_languages(args.config()?).await?;
        }
        Some(Commands::History { ref file, page, size }) => {
            commands::handle_history(file.clone(), page, size).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
