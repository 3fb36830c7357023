//! Core data models used throughout skim-notes.
//!
//! These types describe the blocks, concepts, notes, and snapshot
//! identifiers that flow through the extraction-and-synthesis pipeline.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Stable identity of a source document, derived from its filename stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceKey(String);

impl SourceKey {
    pub fn new(stem: impl Into<String>) -> Self {
        Self(stem.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page's worth of annotation text.
///
/// `body` is never empty: the block parser drops headers whose trimmed body
/// is empty instead of materializing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationBlock {
    /// Page number as written in the header (`Page 3:` → `3`).
    pub page: u32,
    /// Trimmed body text.
    pub body: String,
}

/// A normalized keyword or phrase with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Concept {
    pub term: String,
    pub count: usize,
}

/// The note generated for one stale document in one run.
#[derive(Debug, Clone, Serialize)]
pub struct NoteRecord {
    /// Back-reference to the source document.
    pub key: SourceKey,
    /// File name of the annotation rendering (e.g. `Kant.rtf`).
    pub source_name: String,
    pub blocks: Vec<AnnotationBlock>,
    /// Ranked concepts, most frequent first.
    pub concepts: Vec<Concept>,
    /// Calendar date of the last annotation edit; `None` when unknown.
    pub last_read: Option<NaiveDate>,
    /// Date the note was synthesized.
    pub generated: NaiveDate,
}

/// Identity of a dated snapshot directory: `"<label> - YYYY-MM-DD"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotId {
    pub label: String,
    pub date: NaiveDate,
}

impl SnapshotId {
    pub fn new(label: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            label: label.into(),
            date,
        }
    }

    /// Directory name for this snapshot.
    pub fn dir_name(&self) -> String {
        format!("{} - {}", self.label, self.date.format("%Y-%m-%d"))
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dir_name())
    }
}
