//! TOML configuration.
//!
//! Every section is optional; a missing file at the default path yields
//! [`Config::default`], which mirrors the classic layout: three watched
//! folders under `~/Downloads` and dated snapshots in
//! `~/Downloads/Notes prises sur PDFs`.
//!
//! ```toml
//! [paths]
//! base_dir = "~/Downloads"
//! watched = ["Philosophie", "SES", "Recherche"]
//! dest_dir = "Notes prises sur PDFs"
//!
//! [snapshot]
//! label = "Notes en markdown"
//! sidecar = true
//!
//! [analysis]
//! provider = "local"   # disabled | local | http
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use skim_notes_core::concepts::{DEFAULT_MAX_CHARS, DEFAULT_MAX_CONCEPTS};
use skim_notes_core::note::DEFAULT_MAX_TAGS;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Root of the watched folders. A leading `~` expands to the home directory.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Folder names under `base_dir` scanned recursively for renderings.
    #[serde(default = "default_watched")]
    pub watched: Vec<String>,
    /// Destination for dated snapshots; relative paths resolve against `base_dir`.
    #[serde(default = "default_dest_dir")]
    pub dest_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            watched: default_watched(),
            dest_dir: default_dest_dir(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("~/Downloads")
}
fn default_watched() -> Vec<String> {
    vec![
        "Philosophie".to_string(),
        "SES".to_string(),
        "Recherche".to_string(),
    ]
}
fn default_dest_dir() -> PathBuf {
    PathBuf::from("Notes prises sur PDFs")
}

impl PathsConfig {
    /// `base_dir` with `~` expanded.
    pub fn base(&self) -> PathBuf {
        expand_home(&self.base_dir)
    }

    /// Absolute-or-base-relative destination directory.
    pub fn dest(&self) -> PathBuf {
        let dest = expand_home(&self.dest_dir);
        if dest.is_absolute() {
            dest
        } else {
            self.base().join(dest)
        }
    }

    /// Full paths of the watched folders.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        let base = self.base();
        self.watched.iter().map(|w| base.join(w)).collect()
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotConfig {
    /// Directory label; snapshots are named `"<label> - YYYY-MM-DD"`.
    #[serde(default = "default_label")]
    pub label: String,
    /// Write and consult the `.skim-notes.json` last-read record.
    #[serde(default = "default_true")]
    pub sidecar: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            sidecar: true,
        }
    }
}

fn default_label() -> String {
    "Notes en markdown".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    /// Extension of annotation renderings (compared case-insensitively).
    #[serde(default = "default_rendering_extension")]
    pub rendering_extension: String,
    /// Extension of the proprietary annotation files.
    #[serde(default = "default_annotation_extension")]
    pub annotation_extension: String,
    /// Suffix a rendering stem may carry beyond its annotation file's stem.
    #[serde(default = "default_companion_suffix")]
    pub companion_suffix: String,
    /// Bytes read when sniffing a rendering without a companion.
    #[serde(default = "default_sniff_bytes")]
    pub sniff_bytes: usize,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rendering_extension: default_rendering_extension(),
            annotation_extension: default_annotation_extension(),
            companion_suffix: default_companion_suffix(),
            sniff_bytes: default_sniff_bytes(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_rendering_extension() -> String {
    "rtf".to_string()
}
fn default_annotation_extension() -> String {
    "skim".to_string()
}
fn default_companion_suffix() -> String {
    "_annotations".to_string()
}
fn default_sniff_bytes() -> usize {
    2048
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// `disabled`, `local`, or `http`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Endpoint of the analysis service (required for `http`).
    #[serde(default)]
    pub url: Option<String>,
    /// Model name forwarded to the analysis service.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Character budget for the text sent to the analyzer.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_max_concepts")]
    pub max_concepts: usize,
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
    /// Additional terms never kept as concepts.
    #[serde(default)]
    pub extra_stop_terms: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            max_chars: DEFAULT_MAX_CHARS,
            max_concepts: DEFAULT_MAX_CONCEPTS,
            max_tags: DEFAULT_MAX_TAGS,
            extra_stop_terms: Vec::new(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_model() -> String {
    "fr_core_news_sm".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}
fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}
fn default_max_concepts() -> usize {
    DEFAULT_MAX_CONCEPTS
}
fn default_max_tags() -> usize {
    DEFAULT_MAX_TAGS
}

#[derive(Debug, Deserialize, Clone)]
pub struct AutomationConfig {
    /// Ask the annotation editor to save modified documents before a run.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Application whose open documents are saved.
    #[serde(default = "default_application")]
    pub application: String,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            application: default_application(),
        }
    }
}

fn default_application() -> String {
    "Skim".to_string()
}

/// Load and validate the configuration at `path`.
///
/// When `allow_missing` is set and the file does not exist, the built-in
/// defaults are returned instead.
pub fn load_config(path: &Path, allow_missing: bool) -> Result<Config> {
    if allow_missing && !path.exists() {
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.paths.watched.is_empty() {
        bail!("paths.watched must list at least one folder");
    }
    if config.paths.watched.iter().any(|w| w.trim().is_empty()) {
        bail!("paths.watched entries must not be empty");
    }

    if config.snapshot.label.trim().is_empty() {
        bail!("snapshot.label must not be empty");
    }

    if config.scan.rendering_extension.is_empty() || config.scan.annotation_extension.is_empty() {
        bail!("scan extensions must not be empty");
    }
    if config.scan.sniff_bytes == 0 {
        bail!("scan.sniff_bytes must be > 0");
    }

    if config.analysis.max_chars == 0 {
        bail!("analysis.max_chars must be > 0");
    }
    if config.analysis.max_concepts == 0 {
        bail!("analysis.max_concepts must be > 0");
    }
    if config.analysis.max_tags > config.analysis.max_concepts {
        bail!(
            "analysis.max_tags ({}) must not exceed analysis.max_concepts ({})",
            config.analysis.max_tags,
            config.analysis.max_concepts
        );
    }

    match config.analysis.provider.as_str() {
        "disabled" | "local" => {}
        "http" => {
            if config.analysis.url.is_none() {
                bail!("analysis.url must be specified when provider is 'http'");
            }
        }
        other => bail!(
            "Unknown analysis provider: '{}'. Must be disabled, local, or http.",
            other
        ),
    }

    Ok(())
}
