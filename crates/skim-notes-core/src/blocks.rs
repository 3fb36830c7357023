//! Page-indexed block parser.
//!
//! Converts the plain text recovered from an annotation rendering into an
//! ordered sequence of [`AnnotationBlock`]s.
//!
//! # Format
//!
//! ```text
//! Page 3:
//! First highlighted passage.
//! Page 7: A note written on the header line.
//! ```
//!
//! A header is the word `Page` (any case), one or more whitespace
//! characters, a run of digits and a colon. Everything after a header up to
//! the next header or the end of the text is that block's body. Bodies may
//! start on the header line or on the following line.
//!
//! # Example
//!
//! ```rust
//! use skim_notes_core::blocks::parse_blocks;
//!
//! let blocks = parse_blocks("Page 1: Hello\nPage 2: World");
//! assert_eq!(blocks.len(), 2);
//! assert_eq!(blocks[1].page, 2);
//! assert_eq!(blocks[1].body, "World");
//! ```

use regex::Regex;
use std::sync::LazyLock;

use crate::models::AnnotationBlock;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)page\s+(\d+):").unwrap());

/// Split `text` into blocks, preserving header order.
///
/// Headers whose trimmed body is empty are dropped, which covers the common
/// trailing `Page N:` with nothing after it. A `Page N:` whose number does
/// not fit a `u32` is not a header; its text stays in the preceding body.
pub fn parse_blocks(text: &str) -> Vec<AnnotationBlock> {
    let headers: Vec<(usize, usize, u32)> = HEADER_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let page = caps.get(1)?.as_str().parse::<u32>().ok()?;
            Some((whole.start(), whole.end(), page))
        })
        .collect();

    let mut blocks = Vec::with_capacity(headers.len());
    for (i, (_, body_start, page)) in headers.iter().enumerate() {
        let body_end = headers
            .get(i + 1)
            .map(|(next_start, _, _)| *next_start)
            .unwrap_or(text.len());
        let body = text[*body_start..body_end].trim();
        if body.is_empty() {
            continue;
        }
        blocks.push(AnnotationBlock {
            page: *page,
            body: body.to_string(),
        });
    }
    blocks
}

/// Whether `prefix` already looks like textualized annotations.
///
/// Used to sniff the first couple of kilobytes of a rendering that has no
/// companion annotation file.
pub fn looks_textualized(prefix: &str) -> bool {
    HEADER_RE.is_match(prefix)
}

/// Concatenate block bodies for analysis, capped at `max_chars` characters.
///
/// Bodies are joined with a single space. Text beyond the cap is discarded.
pub fn analysis_text(blocks: &[AnnotationBlock], max_chars: usize) -> String {
    let joined = blocks
        .iter()
        .map(|b| b.body.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    match joined.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => joined[..byte_idx].to_string(),
        None => joined,
    }
}
