//! Per-document failure taxonomy.
//!
//! None of these abort a run: the pipeline logs them, skips or degrades
//! the affected document, and moves on. Only setup failures (unreadable
//! configuration, uncreatable destination) propagate out of `main`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A watched folder or conversion target does not exist.
    #[error("source unavailable: {}", .path.display())]
    SourceUnavailable { path: PathBuf },

    /// An annotation file or rendering is malformed, empty, or unreadable.
    #[error("cannot decode {}: {reason}", .path.display())]
    DecodeFailure { path: PathBuf, reason: String },

    /// The linguistic analyzer could not be created or failed on a document.
    #[error("analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    /// A note, the index, or the sidecar record could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::DecodeFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::WriteFailure {
            path: path.into(),
            source,
        }
    }
}
