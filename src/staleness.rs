//! Staleness oracle.
//!
//! Gathers the inputs of [`skim_notes_core::staleness::decide`] from disk:
//! the document's modification date and whatever the prior snapshot
//! remembers about its note.
//!
//! The prior last-read date comes from the snapshot's sidecar record when
//! available and otherwise from the `**Dernière lecture**:` line in the
//! first 20 lines of the prior note. Both are only consulted once the prior
//! note itself is known to exist.

use chrono::NaiveDate;
use std::io::{BufRead, BufReader};
use std::path::Path;

use skim_notes_core::note::{extract_last_read, note_file_name, HEADER_SCAN_LINES};
use skim_notes_core::staleness::{decide, PriorState, Verdict};

use crate::scan::SourceDocument;
use crate::snapshot::{Sidecar, Snapshot};

/// Answers "should this document be processed?" against one prior snapshot.
pub struct StalenessOracle {
    prior: Option<Snapshot>,
    sidecar: Option<Sidecar>,
}

impl StalenessOracle {
    /// Build an oracle for `prior`. With `use_sidecar`, the snapshot's
    /// sidecar record is loaded once up front.
    pub fn new(prior: Option<Snapshot>, use_sidecar: bool) -> Self {
        let sidecar = match (&prior, use_sidecar) {
            (Some(snapshot), true) => Sidecar::load(&snapshot.path),
            _ => None,
        };
        Self { prior, sidecar }
    }

    /// What the prior snapshot records for the note named `file_name`.
    pub fn prior_state(&self, file_name: &str) -> PriorState {
        let Some(snapshot) = &self.prior else {
            return PriorState::NoSnapshot;
        };
        let note_path = snapshot.note_path(file_name);
        if !note_path.is_file() {
            return PriorState::NoNote;
        }
        let recorded = self
            .sidecar
            .as_ref()
            .and_then(|s| s.get(file_name))
            .or_else(|| read_last_read(&note_path));
        match recorded {
            Some(date) => PriorState::LastRead(date),
            None => PriorState::Unresolved,
        }
    }

    /// Staleness verdict for `doc`.
    pub fn check(&self, doc: &SourceDocument) -> Verdict {
        let file_name = note_file_name(&doc.key);
        let current = doc.modified_date();
        let prior = if current.is_some() {
            self.prior_state(&file_name)
        } else {
            // Skip the prior lookup: an unknown modification date is
            // processed regardless.
            PriorState::Unresolved
        };
        let verdict = decide(current, prior);
        tracing::debug!(key = %doc.key, ?verdict, "staleness");
        verdict
    }
}

/// Last-read date recorded in the header of a generated note.
///
/// Reads at most the first [`HEADER_SCAN_LINES`] lines. Unreadable files and
/// missing markers both yield `None`.
pub fn read_last_read(note_path: &Path) -> Option<NaiveDate> {
    let file = std::fs::File::open(note_path).ok()?;
    let mut reader = BufReader::new(file);
    let mut header = String::new();
    let mut line = Vec::new();
    for _ in 0..HEADER_SCAN_LINES {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => header.push_str(&String::from_utf8_lossy(&line)),
            Err(_) => return None,
        }
    }
    extract_last_read(&header)
}
