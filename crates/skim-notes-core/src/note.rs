//! Markdown note and index synthesis.
//!
//! The note header doubles as persisted state: the `**Dernière lecture**:`
//! line is read back by the next run (see [`extract_last_read`]) to decide
//! whether the document changed. Changing [`LAST_READ_MARKER`] or the header
//! layout makes every prior note look indeterminate, which forces a full
//! regeneration.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use crate::models::{NoteRecord, SourceKey};

/// Label of the last-read header line.
pub const LAST_READ_MARKER: &str = "**Dernière lecture**";

/// Written in place of the last-read date when it is unknown.
pub const UNKNOWN_DATE: &str = "Inconnue";

/// Name of the per-snapshot index file.
pub const INDEX_FILE_NAME: &str = "Index.md";

/// Only this many leading lines of a prior note are searched for the marker.
pub const HEADER_SCAN_LINES: usize = 20;

/// Number of top concepts turned into tags by default.
pub const DEFAULT_MAX_TAGS: usize = 5;

const ILLEGAL_FILENAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

static LAST_READ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{}:\s*(\d{{4}}-\d{{2}}-\d{{2}})",
        regex::escape(LAST_READ_MARKER)
    ))
    .unwrap()
});

/// Markdown file name for a document key, with filesystem-illegal
/// characters removed.
pub fn note_file_name(key: &SourceKey) -> String {
    format!("{}.md", key.as_str())
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c))
        .collect()
}

/// Recover the last-read date from the text of a previously generated note.
///
/// Only the first [`HEADER_SCAN_LINES`] lines are examined. Returns `None`
/// when the marker is absent or its date does not parse.
pub fn extract_last_read(note_text: &str) -> Option<NaiveDate> {
    note_text
        .lines()
        .take(HEADER_SCAN_LINES)
        .find_map(|line| LAST_READ_RE.captures(line))
        .and_then(|caps| NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok())
}

/// Tag form of a concept: spaces become underscores, apostrophes vanish.
pub fn tag_for(term: &str) -> String {
    term.replace(' ', "_").replace(['\'', '’'], "")
}

/// Render the markdown body of a note.
///
/// `max_tags` bounds how many of the ranked concepts become `#tags`.
pub fn render_note(note: &NoteRecord, max_tags: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("# {}", note.key));
    lines.push(format!("**Source**: `{}`", note.source_name));
    match note.last_read {
        Some(date) => lines.push(format!("{}: {}", LAST_READ_MARKER, date.format("%Y-%m-%d"))),
        None => lines.push(format!("{}: {}", LAST_READ_MARKER, UNKNOWN_DATE)),
    }
    lines.push(format!("**Généré le**: {}", note.generated.format("%Y-%m-%d")));
    lines.push(String::new());

    if !note.concepts.is_empty() {
        lines.push("## 🧠 Concepts clés".to_string());
        lines.push(
            note.concepts
                .iter()
                .map(|c| format!("`{}`", c.term))
                .collect::<Vec<_>>()
                .join(", "),
        );
        lines.push(String::new());
        let tags = note
            .concepts
            .iter()
            .take(max_tags)
            .map(|c| format!("#{}", tag_for(&c.term)))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("tags: {}", tags));
        lines.push(String::new());
    }

    lines.push("## Notes".to_string());
    for block in &note.blocks {
        lines.push(format!("### Page {}:", block.page));
        lines.push(block.body.clone());
        lines.push(String::new());
    }

    lines.join("\n")
}

/// One line of the run index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: SourceKey,
    pub file_name: String,
}

impl IndexEntry {
    pub fn new(key: SourceKey) -> Self {
        let file_name = note_file_name(&key);
        Self { key, file_name }
    }

    /// Markdown link line, with spaces in the target percent-encoded.
    pub fn link_line(&self) -> String {
        format!("- [{}]({})", self.key, self.file_name.replace(' ', "%20"))
    }
}

/// Render `Index.md` for a run: title, count, then links sorted by key.
pub fn render_index(run_date: NaiveDate, entries: &[IndexEntry]) -> String {
    let mut sorted: Vec<&IndexEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.file_name.cmp(&b.file_name)));

    let mut lines = vec![
        format!("# Index des Lectures - {}", run_date.format("%Y-%m-%d")),
        String::new(),
        format!("Nombre de documents traités : {}", entries.len()),
        String::new(),
    ];
    lines.extend(sorted.into_iter().map(IndexEntry::link_line));
    lines.join("\n")
}
