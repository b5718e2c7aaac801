//! lexner CLI - Command-line interface
//!
//! Usage:
//!   lexner process [--input <dir>] [--output <dir>] [--offline]
//!   lexner extract <file> [--offline]
//!   lexner tokenize [--input <dir>] [--output <dir>]
//!   lexner normalize <text>

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lexner_core::{AppConfig, LexError, LoggingConfig};
use lexner_extractor::output::spans_json;
use lexner_extractor::{
    normalize, tokenize_directory, BatchRunner, Gazetteer, LlmExtractor, LlmExtractorConfig,
    Orchestrator,
};
use lexner_llm::create_llm_client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lexner")]
#[command(about = "Named-entity extraction for Spanish court rulings")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables still override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract entities from every document of the input directory
    Process {
        /// Directory with the plain-text documents
        #[arg(long)]
        input: Option<PathBuf>,
        /// Directory receiving the artifacts
        #[arg(long)]
        output: Option<PathBuf>,
        /// Skip the external extractor and use the local miner only
        #[arg(long)]
        offline: bool,
        /// Documents processed at a time
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Extract entities from one document and print them as JSON
    Extract {
        /// Plain-text document
        file: PathBuf,
        /// Skip the external extractor and use the local miner only
        #[arg(long)]
        offline: bool,
    },
    /// Tokenize every document of the input directory
    Tokenize {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the normalized form of a text
    Normalize {
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config)?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Process {
            input,
            output,
            offline,
            concurrency,
        } => {
            if let Some(dir) = input {
                config.extraction.input_dir = dir;
            }
            if let Some(dir) = output {
                config.extraction.output_dir = dir;
            }
            if let Some(n) = concurrency {
                config.extraction.concurrency = n;
            }
            config.validate()?;

            let orchestrator = build_orchestrator(&config, offline)?;
            let report = BatchRunner::new(orchestrator, config.extraction.clone())
                .run()
                .await?;
            println!(
                "✅ {report}. Output in '{}'",
                config.extraction.output_dir.display()
            );
        }
        Commands::Extract { file, offline } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let orchestrator = build_orchestrator(&config, offline)?;
            let extraction = orchestrator.extract(&text).await;
            info!(source = ?extraction.source, spans = extraction.spans.len(), "Extraction finished");
            println!("{}", spans_json(&extraction.spans)?);
        }
        Commands::Tokenize { input, output } => {
            if let Some(dir) = input {
                config.extraction.input_dir = dir;
            }
            if let Some(dir) = output {
                config.extraction.output_dir = dir;
            }

            let report = tokenize_directory(&config.extraction)?;
            println!(
                "✅ {} documents tokenized ({} failed, {} tokens)",
                report.documents, report.failed, report.tokens
            );
        }
        Commands::Normalize { text } => {
            println!("{}", normalize(&text));
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

/// Logs go to stderr so `extract` output stays pipeable. `RUST_LOG` wins
/// over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Orchestrator with the configured external extractor, or offline when
/// asked to, when the provider is `none`, or when credentials are missing.
fn build_orchestrator(config: &AppConfig, offline: bool) -> anyhow::Result<Orchestrator> {
    let orchestrator = Orchestrator::new(Arc::new(Gazetteer::new()), &config.extraction);
    if offline {
        return Ok(orchestrator);
    }

    match create_llm_client(&config.llm) {
        Ok(Some(client)) => {
            info!(client = client.name(), model = %config.llm.model, "Using external extractor");
            let extractor = LlmExtractor::with_config(
                Arc::from(client),
                LlmExtractorConfig::from_llm_config(&config.llm),
            );
            Ok(orchestrator.with_extractor(Arc::new(extractor)))
        }
        Ok(None) => Ok(orchestrator),
        Err(LexError::ConfigError(reason)) => {
            warn!(%reason, "External extractor not configured, running offline");
            Ok(orchestrator)
        }
        Err(err) => Err(err.into()),
    }
}
