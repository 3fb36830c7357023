//! Dated snapshot names.
//!
//! A snapshot directory is named `"<label> - YYYY-MM-DD"`. This module parses
//! such names and picks the latest prior snapshot from an explicit candidate
//! list; callers never depend on directory iteration order.

use chrono::NaiveDate;
use regex::Regex;

use crate::models::SnapshotId;

/// Parses snapshot directory names for one label.
#[derive(Debug, Clone)]
pub struct SnapshotNamer {
    label: String,
    pattern: Regex,
}

impl SnapshotNamer {
    pub fn new(label: &str) -> Self {
        let pattern = Regex::new(&format!(
            r"^{} - (\d{{4}}-\d{{2}}-\d{{2}})",
            regex::escape(label)
        ))
        .expect("escaped label always forms a valid pattern");
        Self {
            label: label.to_string(),
            pattern,
        }
    }

    /// The snapshot identity for a given run date.
    pub fn id_for(&self, date: NaiveDate) -> SnapshotId {
        SnapshotId::new(self.label.clone(), date)
    }

    /// Parse a directory name. The match is anchored at the start only;
    /// names whose embedded date is not a real calendar date are rejected.
    pub fn parse(&self, dir_name: &str) -> Option<SnapshotId> {
        let caps = self.pattern.captures(dir_name)?;
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
        Some(self.id_for(date))
    }
}

/// Choose the prior snapshot among `(dir_name, value)` candidates.
///
/// Only names matching the namer whose embedded date is strictly before
/// `current.date` qualify, so the current run's own directory and any
/// later snapshot are ignored. The latest qualifying date wins. When several
/// share that date the lexicographically greatest directory name is taken.
/// That choice is arbitrary: equal-date snapshots are a degenerate case with
/// no defined winner.
pub fn latest_prior<T>(
    namer: &SnapshotNamer,
    current: &SnapshotId,
    candidates: impl IntoIterator<Item = (String, T)>,
) -> Option<(SnapshotId, T)> {
    let mut parsed: Vec<(NaiveDate, String, SnapshotId, T)> = candidates
        .into_iter()
        .filter_map(|(name, value)| {
            let id = namer.parse(&name)?;
            (id.date < current.date).then(|| (id.date, name, id, value))
        })
        .collect();

    parsed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    parsed.pop().map(|(_, _, id, value)| (id, value))
}
