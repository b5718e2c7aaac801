//! Batch runner
//!
//! Walks the input directory in sorted order and writes the span artifacts
//! of every document. A missing input directory aborts the run before any
//! work; anything that goes wrong with a single document is logged and
//! counted, never fatal.

use std::fmt;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use lexner_core::{ExtractionConfig, LexError, Result};

use crate::orchestrator::{Orchestrator, SpanSource};
use crate::output::{write_spans, write_tokens};
use crate::tokenize::tokenize;

/// Totals of a span extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Documents whose artifacts were written
    pub documents: usize,
    /// Documents served by the external extractor
    pub external: usize,
    /// Documents served by the local miner
    pub fallback: usize,
    /// Documents that could not be read or written
    pub failed: usize,
    /// Spans written across all documents
    pub spans: usize,
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents ({} external, {} fallback), {} failed, {} spans",
            self.documents, self.external, self.fallback, self.failed, self.spans
        )
    }
}

/// Totals of a tokenization run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenReport {
    pub documents: usize,
    pub failed: usize,
    pub tokens: usize,
}

enum Outcome {
    Written { source: SpanSource, spans: usize },
    Failed,
}

/// Runs the orchestrator over a directory of documents
pub struct BatchRunner {
    orchestrator: Orchestrator,
    config: ExtractionConfig,
}

impl BatchRunner {
    pub fn new(orchestrator: Orchestrator, config: ExtractionConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// Process every document, `concurrency` at a time, in sorted order
    pub async fn run(&self) -> Result<BatchReport> {
        let documents = list_documents(&self.config.input_dir, &self.config.file_extension)?;
        ensure_dir(&self.config.output_dir)?;

        info!(
            input = %self.config.input_dir.display(),
            documents = documents.len(),
            offline = self.orchestrator.is_offline(),
            "Starting batch"
        );

        let outcomes: Vec<Outcome> = stream::iter(documents)
            .map(|path| self.process_document(path))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let report = outcomes
            .into_iter()
            .fold(BatchReport::default(), |mut report, outcome| {
                match outcome {
                    Outcome::Written { source, spans } => {
                        report.documents += 1;
                        report.spans += spans;
                        match source {
                            SpanSource::External => report.external += 1,
                            SpanSource::Fallback => report.fallback += 1,
                        }
                    }
                    Outcome::Failed => report.failed += 1,
                }
                report
            });

        info!(%report, "Batch complete");
        Ok(report)
    }

    async fn process_document(&self, path: PathBuf) -> Outcome {
        let stem = document_stem(&path);

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(source) => {
                let err = LexError::Io { path, source };
                warn!(document = %stem, error = %err, "Skipping unreadable document");
                return Outcome::Failed;
            }
        };

        let extraction = self.orchestrator.extract(&text).await;

        match write_spans(
            &self.config.output_dir,
            &stem,
            &extraction.spans,
            self.config.summary_examples,
        ) {
            Ok((json, _)) => {
                info!(
                    document = %stem,
                    source = ?extraction.source,
                    spans = extraction.spans.len(),
                    output = %json.display(),
                    "Processed document"
                );
                Outcome::Written {
                    source: extraction.source,
                    spans: extraction.spans.len(),
                }
            }
            Err(err) => {
                warn!(document = %stem, error = %err, "Failed to write document artifacts");
                Outcome::Failed
            }
        }
    }
}

/// Tokenize every document of the input directory
pub fn tokenize_directory(config: &ExtractionConfig) -> Result<TokenReport> {
    let documents = list_documents(&config.input_dir, &config.file_extension)?;
    ensure_dir(&config.output_dir)?;

    let mut report = TokenReport::default();
    for path in documents {
        let stem = document_stem(&path);
        let written = std::fs::read_to_string(&path)
            .map_err(|source| LexError::Io {
                path: path.clone(),
                source,
            })
            .and_then(|text| {
                let tokens = tokenize(&text);
                write_tokens(&config.output_dir, &stem, &tokens).map(|_| tokens.len())
            });

        match written {
            Ok(count) => {
                info!(document = %stem, tokens = count, "Tokenized document");
                report.documents += 1;
                report.tokens += count;
            }
            Err(err) => {
                warn!(document = %stem, error = %err, "Failed to tokenize document");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Regular files with the given extension (any case), sorted by name
pub fn list_documents(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(LexError::NoInputDirectory(dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(dir).map_err(|source| LexError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut documents: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        })
        .collect();
    documents.sort();

    Ok(documents)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| LexError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

fn document_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
