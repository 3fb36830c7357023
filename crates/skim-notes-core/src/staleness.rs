//! Staleness decision.
//!
//! A document must be regenerated unless the most recent prior snapshot
//! holds a note for it whose recorded last-read date is on or after the
//! document's current modification date. Every indeterminate input resolves
//! to "process", favoring freshness over saved work.

use chrono::NaiveDate;

/// What the prior snapshot knows about a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorState {
    /// No prior snapshot exists.
    NoSnapshot,
    /// The prior snapshot has no note for this document.
    NoNote,
    /// A note exists but its last-read date could not be recovered.
    Unresolved,
    /// A note exists and records this last-read date.
    LastRead(NaiveDate),
}

/// Why a document will or will not be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Modification date unknown.
    UnknownModDate,
    NoSnapshot,
    NoNote,
    Unresolved,
    /// Annotations changed after the recorded date.
    Changed,
    /// Recorded date is on or after the modification date.
    UpToDate,
}

impl Verdict {
    pub fn should_process(self) -> bool {
        !matches!(self, Verdict::UpToDate)
    }
}

/// Decide whether a document needs regeneration.
///
/// Dates are compared at day granularity, so rerunning on the same day
/// without new edits processes nothing.
pub fn decide(current_mod_date: Option<NaiveDate>, prior: PriorState) -> Verdict {
    let Some(current) = current_mod_date else {
        return Verdict::UnknownModDate;
    };
    match prior {
        PriorState::NoSnapshot => Verdict::NoSnapshot,
        PriorState::NoNote => Verdict::NoNote,
        PriorState::Unresolved => Verdict::Unresolved,
        PriorState::LastRead(prior_date) if current > prior_date => Verdict::Changed,
        PriorState::LastRead(_) => Verdict::UpToDate,
    }
}
