//! Concept normalization and ranking.
//!
//! Turns the entities and noun phrases reported by an [`Analyzer`] into a
//! bounded, frequency-ranked list of [`Concept`]s used for the note's
//! concept section and tags.
//!
//! # Algorithm
//!
//! 1. Keep entities whose label is in [`ALLOWED_ENTITY_LABELS`] and whose
//!    text is longer than 2 characters, and noun phrases whose text is
//!    longer than 3 characters.
//! 2. Normalize each candidate's lemma with [`normalize_term`].
//! 3. Drop noise (see [`ConceptFilter::is_noise`]).
//! 4. Count the survivors across both sources and sort by descending count.
//!    The sort is stable, so ties keep first-occurrence order.
//! 5. Truncate to `max_concepts`.

use anyhow::Result;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::analysis::{Analysis, Analyzer, ALLOWED_ENTITY_LABELS};
use crate::models::Concept;
use crate::stopwords;

/// Default number of ranked concepts kept per document.
pub const DEFAULT_MAX_CONCEPTS: usize = 15;

/// Default character budget for the analyzed text.
pub const DEFAULT_MAX_CHARS: usize = 100_000;

/// Domain noise that shows up in annotation text but never makes a good tag.
pub const CUSTOM_STOP_TERMS: &[&str] = &[
    "page", "note", "vol", "chapitre", "partie", "chose", "cas", "fait", "fois", "façon", "manière",
];

static LEADING_DETERMINER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(le |la |les |l'|l’|un |une |des |du |de |d'|d’|ce |cet |cette |ces |son |sa |ses |mon |ma |mes |notre |votre |leur )",
    )
    .unwrap()
});

static PAGE_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^page\s*\d+$").unwrap());

/// Lower-case, trim, and strip one leading determiner or possessive.
///
/// Only the start of the string is considered, and only once:
/// `"le chat noir"` becomes `"chat noir"`, `"la la land"` becomes `"la land"`.
pub fn normalize_term(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    LEADING_DETERMINER_RE
        .replace(&lowered, "")
        .trim()
        .to_string()
}

/// Rejects normalized candidates that would make poor concepts.
#[derive(Debug, Clone, Default)]
pub struct ConceptFilter {
    extra_stop_terms: HashSet<String>,
}

impl ConceptFilter {
    /// Build a filter with additional stop terms on top of the built-in sets.
    pub fn new<I, S>(extra_stop_terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extra_stop_terms: extra_stop_terms
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    /// Whether a normalized term is noise.
    ///
    /// Noise is anything shorter than 3 characters, a stop word, a custom
    /// stop term, a purely numeric string, or a bare page reference such as
    /// `page 12`.
    pub fn is_noise(&self, term: &str) -> bool {
        term.chars().count() < 3
            || stopwords::is_stop_word(term)
            || CUSTOM_STOP_TERMS.contains(&term)
            || self.extra_stop_terms.contains(term)
            || term.chars().all(|c| c.is_ascii_digit())
            || PAGE_REF_RE.is_match(term)
    }
}

/// Tuning knobs for [`rank_concepts`].
#[derive(Debug, Clone)]
pub struct RankParams {
    /// Maximum number of concepts returned.
    pub max_concepts: usize,
    pub filter: ConceptFilter,
}

impl Default for RankParams {
    fn default() -> Self {
        Self {
            max_concepts: DEFAULT_MAX_CONCEPTS,
            filter: ConceptFilter::default(),
        }
    }
}

/// Lemmas of the analysis candidates that pass the source-specific gates,
/// entities first, then noun phrases.
pub fn candidate_lemmas(analysis: &Analysis) -> Vec<&str> {
    let entities = analysis
        .entities
        .iter()
        .filter(|e| ALLOWED_ENTITY_LABELS.contains(&e.label.as_str()))
        .filter(|e| e.text.chars().count() > 2)
        .map(|e| e.lemma.as_str());
    let phrases = analysis
        .noun_phrases
        .iter()
        .filter(|p| p.text.chars().count() > 3)
        .map(|p| p.lemma.as_str());
    entities.chain(phrases).collect()
}

/// Normalize, filter, count, and rank the candidates of one analysis.
pub fn rank_analysis(analysis: &Analysis, params: &RankParams) -> Vec<Concept> {
    let mut order: Vec<Concept> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for lemma in candidate_lemmas(analysis) {
        let term = normalize_term(lemma);
        if params.filter.is_noise(&term) {
            continue;
        }
        match index.get(&term) {
            Some(&i) => order[i].count += 1,
            None => {
                index.insert(term.clone(), order.len());
                order.push(Concept { term, count: 1 });
            }
        }
    }

    order.sort_by(|a, b| b.count.cmp(&a.count));
    order.truncate(params.max_concepts);
    order
}

/// Run `analyzer` over `text` and rank the resulting concepts.
///
/// `text` should already be capped (see
/// [`crate::blocks::analysis_text`]).
///
/// # Errors
///
/// Propagates analyzer failures unchanged; callers treat them as
/// "no concepts".
pub fn rank_concepts(
    analyzer: &dyn Analyzer,
    text: &str,
    params: &RankParams,
) -> Result<Vec<Concept>> {
    let analysis = analyzer.analyze(text)?;
    Ok(rank_analysis(&analysis, params))
}
