//! Source document discovery.
//!
//! Walks every watched folder recursively and keeps the annotation
//! renderings worth turning into notes: files with the rendering extension
//! that either sit next to a companion annotation file or already contain
//! `Page N:` headers in their first couple of kilobytes.
//!
//! The destination tree is never descended into, even when it lives inside
//! a watched folder, so generated notes cannot feed back into the scan.

use anyhow::Result;
use chrono::{DateTime, Local};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use skim_notes_core::blocks::looks_textualized;
use skim_notes_core::models::SourceKey;

use crate::config::{Config, ScanConfig};
use crate::error::PipelineError;

/// A rendering discovered in a watched folder.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Filename stem of the rendering.
    pub key: SourceKey,
    pub path: PathBuf,
    /// Companion annotation file, if one exists.
    pub companion: Option<PathBuf>,
    /// Modification time of the companion if present, else of the rendering.
    /// `None` when the file could not be stat'ed.
    pub modified: Option<DateTime<Local>>,
}

impl SourceDocument {
    /// File name of the rendering (e.g. `Kant.rtf`).
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Calendar date of [`Self::modified`].
    pub fn modified_date(&self) -> Option<chrono::NaiveDate> {
        self.modified.map(|m| m.date_naive())
    }
}

/// Every regular file under the watched folders, destination tree and
/// excluded paths removed, sorted by path.
///
/// Missing watched folders are logged and contribute nothing.
pub fn walk_watched(config: &Config) -> Result<Vec<PathBuf>> {
    let dest = config.paths.dest();
    let exclude_set = build_globset(&config.scan.exclude_globs)?;
    let mut files = Vec::new();

    for root in config.paths.watched_dirs() {
        if !root.is_dir() {
            tracing::warn!("{}", PipelineError::SourceUnavailable { path: root.clone() });
            continue;
        }
        tracing::debug!(folder = %root.display(), "scanning");

        let walker = WalkDir::new(&root)
            .follow_links(config.scan.follow_symlinks)
            .into_iter()
            .filter_entry(|e| !e.path().starts_with(&dest));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(&root).unwrap_or(path);
            if exclude_set.is_match(relative) {
                continue;
            }
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Discover the source documents for this run.
pub fn scan_sources(config: &Config) -> Result<Vec<SourceDocument>> {
    let mut docs: Vec<SourceDocument> = walk_watched(config)?
        .into_iter()
        .filter(|path| has_extension(path, &config.scan.rendering_extension))
        .filter_map(|path| {
            let companion = companion_path(&path, &config.scan);
            if companion.is_none() && !sniff_textualized(&path, config.scan.sniff_bytes) {
                return None;
            }
            Some(to_source_document(path, companion))
        })
        .collect();

    docs.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.path.cmp(&b.path)));
    warn_on_duplicate_keys(&docs);
    Ok(docs)
}

fn to_source_document(path: PathBuf, companion: Option<PathBuf>) -> SourceDocument {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let dated = companion.as_deref().unwrap_or(&path);
    let modified = std::fs::metadata(dated)
        .and_then(|m| m.modified())
        .map(DateTime::<Local>::from)
        .ok();

    SourceDocument {
        key: SourceKey::new(stem),
        path,
        companion,
        modified,
    }
}

/// The annotation file belonging to a rendering, if any.
///
/// `X.rtf` pairs with `X.skim`; `X_annotations.rtf` also pairs with `X.skim`.
pub fn companion_path(rendering: &Path, scan: &ScanConfig) -> Option<PathBuf> {
    let parent = rendering.parent()?;
    let stem = rendering.file_stem()?.to_string_lossy();

    let exact = parent.join(format!("{}.{}", stem, scan.annotation_extension));
    if exact.is_file() {
        return Some(exact);
    }

    if scan.companion_suffix.is_empty() {
        return None;
    }
    let original = stem.strip_suffix(scan.companion_suffix.as_str())?;
    let paired = parent.join(format!("{}.{}", original, scan.annotation_extension));
    paired.is_file().then_some(paired)
}

/// Whether the first `limit` bytes of `path` contain a `Page N:` header.
fn sniff_textualized(path: &Path, limit: usize) -> bool {
    let mut buf = Vec::with_capacity(limit);
    let read = std::fs::File::open(path)
        .and_then(|f| f.take(limit as u64).read_to_end(&mut buf));
    match read {
        Ok(_) => looks_textualized(&String::from_utf8_lossy(&buf)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read rendering");
            false
        }
    }
}

pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

fn warn_on_duplicate_keys(docs: &[SourceDocument]) {
    for pair in docs.windows(2) {
        if pair[0].key == pair[1].key {
            tracing::warn!(
                key = %pair[0].key,
                first = %pair[0].path.display(),
                second = %pair[1].path.display(),
                "two renderings share a stem; the later one overwrites the earlier note"
            );
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(base: &Path) -> Config {
        let mut config = Config::default();
        config.paths.base_dir = base.to_path_buf();
        config.paths.watched = vec!["Philo".to_string(), "Missing".to_string()];
        config.paths.dest_dir = PathBuf::from("Philo/Notes");
        config
    }

    fn keys(docs: &[SourceDocument]) -> Vec<&str> {
        docs.iter().map(|d| d.key.as_str()).collect()
    }

    #[test]
    fn keeps_companioned_and_textualized_renderings() {
        let tmp = TempDir::new().unwrap();
        let philo = tmp.path().join("Philo");
        let nested = philo.join("Kant");
        fs::create_dir_all(&nested).unwrap();

        fs::write(nested.join("Critique.rtf"), "{\\rtf1 nothing yet}").unwrap();
        fs::write(nested.join("Critique.skim"), "plist").unwrap();
        fs::write(philo.join("Hegel_annotations.rtf"), "{\\rtf1}").unwrap();
        fs::write(philo.join("Hegel.skim"), "plist").unwrap();
        fs::write(philo.join("Export.RTF"), "{\\rtf1 {\\b Page 2:}\\par text}").unwrap();
        fs::write(philo.join("Letter.rtf"), "{\\rtf1 Dear reader}").unwrap();
        fs::write(philo.join("Notes.txt"), "Page 1: not a rendering").unwrap();

        let docs = scan_sources(&config_for(tmp.path())).unwrap();
        assert_eq!(keys(&docs), vec!["Critique", "Export", "Hegel_annotations"]);

        let critique = &docs[0];
        assert_eq!(critique.companion.as_deref(), Some(nested.join("Critique.skim").as_path()));
        assert!(critique.modified.is_some());
        assert_eq!(critique.file_name(), "Critique.rtf");
        assert_eq!(
            docs[2].companion.as_deref(),
            Some(philo.join("Hegel.skim").as_path())
        );
        assert!(docs[1].companion.is_none());
    }

    #[test]
    fn destination_tree_is_not_scanned() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("Philo/Notes/Notes en markdown - 2024-01-01");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("Echo.rtf"), "Page 1: generated").unwrap();

        let docs = scan_sources(&config_for(tmp.path())).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn sniff_only_reads_the_prefix() {
        let tmp = TempDir::new().unwrap();
        let philo = tmp.path().join("Philo");
        fs::create_dir_all(&philo).unwrap();
        let mut late = "x".repeat(4096);
        late.push_str("Page 1: too far");
        fs::write(philo.join("Late.rtf"), late).unwrap();

        let mut config = config_for(tmp.path());
        assert!(scan_sources(&config).unwrap().is_empty());
        config.scan.sniff_bytes = 8192;
        assert_eq!(keys(&scan_sources(&config).unwrap()), vec!["Late"]);
    }

    #[test]
    fn exclude_globs_apply_relative_to_folder() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("Philo/archive");
        fs::create_dir_all(&archive).unwrap();
        fs::write(archive.join("Old.rtf"), "Page 1: old").unwrap();

        let mut config = config_for(tmp.path());
        assert_eq!(scan_sources(&config).unwrap().len(), 1);
        config.scan.exclude_globs = vec!["archive/**".to_string()];
        assert!(scan_sources(&config).unwrap().is_empty());
    }

    #[test]
    fn companion_suffix_is_stripped_once() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("A_annotations.skim"), "plist").unwrap();
        let scan = ScanConfig::default();
        let found = companion_path(&tmp.path().join("A_annotations_annotations.rtf"), &scan);
        assert_eq!(found, Some(tmp.path().join("A_annotations.skim")));
    }
}
