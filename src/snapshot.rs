//! Snapshot directories on disk.
//!
//! Locates the most recent prior snapshot under the destination directory
//! and reads/writes the per-snapshot sidecar record (`.skim-notes.json`)
//! that maps note file names to their last-read dates.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use skim_notes_core::models::SnapshotId;
use skim_notes_core::snapshot::{latest_prior, SnapshotNamer};

/// File name of the sidecar record inside a snapshot directory.
pub const SIDECAR_FILE_NAME: &str = ".skim-notes.json";

const SIDECAR_VERSION: u32 = 1;

/// A snapshot directory.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub path: PathBuf,
}

impl Snapshot {
    /// The directory of `id` under `dest`, if it already exists.
    pub fn existing(dest: &Path, id: &SnapshotId) -> Option<Self> {
        let path = dest.join(id.dir_name());
        path.is_dir().then(|| Self {
            id: id.clone(),
            path,
        })
    }

    /// Path of a note inside this snapshot.
    pub fn note_path(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }
}

/// Find the latest snapshot in `dest` dated strictly before `current`.
///
/// A missing or unreadable destination directory means there is no prior
/// snapshot.
pub fn find_prior_snapshot(
    dest: &Path,
    namer: &SnapshotNamer,
    current: &SnapshotId,
) -> Option<Snapshot> {
    let entries = match std::fs::read_dir(dest) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dest = %dest.display(), error = %e, "no snapshots to compare against");
            return None;
        }
    };

    let candidates = entries.filter_map(|entry| {
        let entry = entry.ok()?;
        if !entry.file_type().ok()?.is_dir() {
            return None;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        Some((name, entry.path()))
    });

    latest_prior(namer, current, candidates).map(|(id, path)| Snapshot { id, path })
}

/// Last-read dates recorded for the notes of one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sidecar {
    pub version: u32,
    /// Note file name → last-read date.
    pub last_read: BTreeMap<String, NaiveDate>,
}

impl Sidecar {
    pub fn new() -> Self {
        Self {
            version: SIDECAR_VERSION,
            last_read: BTreeMap::new(),
        }
    }

    /// Load the sidecar of `snapshot_dir`.
    ///
    /// Returns `None` when it is absent, unreadable, or from an unknown
    /// version; callers then fall back to the note headers.
    pub fn load(snapshot_dir: &Path) -> Option<Self> {
        let path = snapshot_dir.join(SIDECAR_FILE_NAME);
        let text = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Sidecar>(&text) {
            Ok(sidecar) if sidecar.version == SIDECAR_VERSION => Some(sidecar),
            Ok(sidecar) => {
                tracing::warn!(path = %path.display(), version = sidecar.version, "ignoring sidecar of unknown version");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable sidecar");
                None
            }
        }
    }

    pub fn record(&mut self, note_file_name: &str, date: NaiveDate) {
        self.last_read.insert(note_file_name.to_string(), date);
    }

    pub fn get(&self, note_file_name: &str) -> Option<NaiveDate> {
        self.last_read.get(note_file_name).copied()
    }

    /// Write the sidecar into `snapshot_dir`.
    pub fn save(&self, snapshot_dir: &Path) -> Result<()> {
        let path = snapshot_dir.join(SIDECAR_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write sidecar: {}", path.display()))?;
        Ok(())
    }
}
