//! # skim-notes core
//!
//! Pure logic for skim-notes: data models, the annotation block parser,
//! concept normalization and ranking, snapshot-name handling, the staleness
//! decision, and markdown note synthesis.
//!
//! This crate performs no filesystem, network, or process I/O. The
//! application crate discovers documents, reads files, and supplies the
//! linguistic [`analysis::Analyzer`] implementation.

pub mod analysis;
pub mod blocks;
pub mod concepts;
pub mod models;
pub mod note;
pub mod snapshot;
pub mod staleness;
pub mod stopwords;
