//! # Skim Notes
//!
//! Turns PDF annotations exported by Skim into dated snapshots of markdown
//! reading notes, regenerating only what changed since the last snapshot.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ .skim files │──▶│   convert   │──▶│ scan + stale │──▶│ blocks, concepts │
//! │  (plist)    │   │  (→ .rtf)   │   │   oracle     │   │   note, index    │
//! └─────────────┘   └─────────────┘   └──────────────┘   └────────┬─────────┘
//!                                                                 ▼
//!                                        <dest>/<label> - YYYY-MM-DD/*.md
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! skim-notes init                  # create watched and destination folders
//! skim-notes sources               # check the watched folders
//! skim-notes run                   # flush, convert, and write today's snapshot
//! skim-notes run --dry-run         # count what would be regenerated
//! skim-notes inspect Kant.rtf      # blocks and concepts of one rendering
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Per-document failure taxonomy |
//! | [`automation`] | Ask the editor to save unsaved annotations |
//! | [`convert`] | `.skim` → RTF rendering |
//! | [`extract`] | RTF → plain text |
//! | [`scan`] | Source document discovery |
//! | [`snapshot`] | Snapshot lookup and sidecar record |
//! | [`staleness`] | Decide which documents need a new note |
//! | [`analysis`] | Linguistic analyzer providers |
//! | [`pipeline`] | Run orchestration |
//! | [`progress`] | Progress reporting on stderr |
//! | [`sources`] | Watched-folder health |
//!
//! The pure parsing, ranking, and rendering logic lives in the
//! `skim-notes-core` crate.

pub mod analysis;
pub mod automation;
pub mod config;
pub mod convert;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod progress;
pub mod scan;
pub mod snapshot;
pub mod sources;
pub mod staleness;
