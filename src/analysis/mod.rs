//! Analyzer providers and the process-wide analyzer handle.
//!
//! Implements [`Analyzer`] for the configured backend:
//! - **[`DisabledAnalyzer`]**: always fails; notes are written without concepts.
//! - **[`LocalAnalyzer`]**: built-in heuristic tokenizer, no network.
//! - **[`HttpAnalyzer`]**: delegates to a linguistic-analysis service over HTTP.
//!
//! # Lifecycle
//!
//! [`AnalyzerHandle`] is created once per run and handed to the concept
//! ranker as `&dyn Analyzer`. The backend itself is only constructed on the
//! first analysis call (loading a model can be slow) and lives until the
//! handle is dropped at the end of the run. A backend that fails to
//! construct is reported once and every later call fails fast with
//! [`PipelineError::AnalysisUnavailable`].
//!
//! # Retry Strategy
//!
//! The HTTP provider retries transient failures with exponential backoff:
//! - HTTP 429 and 5xx → retry
//! - other 4xx → fail immediately
//! - network errors → retry
//! - backoff 1s, 2s, 4s, … capped at 32s

mod local;

pub use local::LocalAnalyzer;

use anyhow::{bail, Result};
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Duration;

use skim_notes_core::analysis::{Analysis, Analyzer};

use crate::config::AnalysisConfig;
use crate::error::PipelineError;

/// Instantiate the analyzer selected by `config.provider`.
pub fn create_analyzer(config: &AnalysisConfig) -> Result<Box<dyn Analyzer>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledAnalyzer)),
        "local" => Ok(Box::new(LocalAnalyzer::new())),
        "http" => Ok(Box::new(HttpAnalyzer::new(config)?)),
        other => bail!("Unknown analysis provider: {}", other),
    }
}

// ============ Handle ============

/// Lazily-initialized analyzer shared by every document of a run.
pub struct AnalyzerHandle {
    config: AnalysisConfig,
    backend: OnceLock<Option<Box<dyn Analyzer>>>,
}

impl AnalyzerHandle {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            config: config.clone(),
            backend: OnceLock::new(),
        }
    }

    /// Wrap an already-built analyzer (used by tests and embedders).
    pub fn with_backend(config: &AnalysisConfig, backend: Box<dyn Analyzer>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Some(backend));
        Self {
            config: config.clone(),
            backend: cell,
        }
    }

    fn backend(&self) -> Option<&dyn Analyzer> {
        self.backend
            .get_or_init(|| {
                tracing::info!(provider = %self.config.provider, "loading analyzer");
                match create_analyzer(&self.config) {
                    Ok(backend) => Some(backend),
                    Err(e) => {
                        tracing::warn!(error = %e, "analyzer unavailable; notes will have no concepts");
                        None
                    }
                }
            })
            .as_deref()
    }
}

impl Analyzer for AnalyzerHandle {
    fn name(&self) -> &str {
        &self.config.provider
    }

    fn analyze(&self, text: &str) -> Result<Analysis> {
        match self.backend() {
            Some(backend) => backend.analyze(text),
            None => Err(PipelineError::AnalysisUnavailable(format!(
                "provider '{}' failed to initialize",
                self.config.provider
            ))
            .into()),
        }
    }
}

// ============ Disabled Provider ============

/// An analyzer that always fails.
///
/// Used when `analysis.provider = "disabled"`.
pub struct DisabledAnalyzer;

impl Analyzer for DisabledAnalyzer {
    fn name(&self) -> &str {
        "disabled"
    }

    fn analyze(&self, _text: &str) -> Result<Analysis> {
        Err(PipelineError::AnalysisUnavailable("analysis provider is disabled".to_string()).into())
    }
}

// ============ HTTP Provider ============

/// Analyzer backed by an HTTP linguistic-analysis service.
///
/// Sends `POST <url>` with `{"text": …, "model": …}` and expects an
/// [`Analysis`] JSON object (`entities` plus `noun_chunks` or
/// `noun_phrases`).
pub struct HttpAnalyzer {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    model: &'a str,
}

impl HttpAnalyzer {
    /// # Errors
    ///
    /// Returns an error if `analysis.url` is missing or the HTTP client
    /// cannot be built.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("analysis.url required for http provider"))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url,
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }
}

impl Analyzer for HttpAnalyzer {
    fn name(&self) -> &str {
        "http"
    }

    fn analyze(&self, text: &str) -> Result<Analysis> {
        let body = AnalyzeRequest {
            text,
            model: &self.model,
        };
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                std::thread::sleep(delay);
            }

            match self.client.post(&self.url).json(&body).send() {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response.json::<Analysis>()?);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "analysis service error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().unwrap_or_default();
                    bail!("analysis service error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("analysis failed after retries")))
    }
}
