//! Linguistic analysis capability.
//!
//! Defines the [`Analyzer`] trait that the concept ranker depends on.
//! Tokenization, named-entity recognition, and lemma reduction all happen
//! behind this trait; the core only consumes the resulting candidates.
//!
//! Concrete analyzers (built-in heuristic, HTTP service) live in the
//! `skim-notes` app crate. Tests substitute fakes.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Named-entity categories kept as concept candidates.
///
/// Descriptive and numeric categories (dates, quantities, …) are excluded.
pub const ALLOWED_ENTITY_LABELS: &[&str] = &["PER", "LOC", "ORG", "MISC"];

/// A named entity found in the analyzed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Surface text as it appears in the document.
    pub text: String,
    /// Category label (`PER`, `LOC`, `ORG`, `MISC`, …).
    pub label: String,
    /// Lemma-reduced form.
    pub lemma: String,
}

/// A noun phrase found in the analyzed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NounPhrase {
    pub text: String,
    pub lemma: String,
}

/// Output of one analysis call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default, alias = "noun_chunks")]
    pub noun_phrases: Vec<NounPhrase>,
}

/// A linguistic-analysis backend.
///
/// Implementations are created once per process by the application and
/// passed to [`crate::concepts::rank_concepts`] as `&dyn Analyzer`.
pub trait Analyzer {
    /// Short identifier used in logs (e.g. `"local"`, `"http"`).
    fn name(&self) -> &str;

    /// Analyze `text`, returning entities and noun phrases.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unavailable or fails on this
    /// input. Callers degrade to an empty concept list.
    fn analyze(&self, text: &str) -> Result<Analysis>;
}
