//! Plain-text extraction from annotation renderings.
//!
//! Renderings are RTF documents (see [`crate::convert`]); this module turns
//! them back into UTF-8 text so the block parser can find `Page N:` headers.
//! Files that are not RTF are returned unchanged, which covers renderings
//! that were exported as plain text.
//!
//! # Decoder
//!
//! A single pass over the input with a stack of group states:
//!
//! - `{` / `}` push and pop the group state.
//! - Ignorable destinations (`\*` groups, font and color tables, style
//!   sheets, document info, pictures, field instructions, …) are skipped
//!   together with everything nested in them.
//! - `\par`, `\line` and friends become `\n`, `\tab` becomes `\t`.
//! - `\uN` produces the UTF-16 unit `N` (negative values wrap) and then skips
//!   the next `\ucN` fallback characters. Surrogate pairs are joined.
//! - `\'hh` decodes one Windows-1252 byte.
//! - Raw CR/LF in the source are formatting only and are dropped.

use std::path::Path;

/// Destinations whose content is never visible text.
const IGNORED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "info",
    "pict",
    "object",
    "header",
    "footer",
    "headerl",
    "headerr",
    "footerl",
    "footerr",
    "fldinst",
    "generator",
    "xmlnstbl",
    "themedata",
    "colorschememapping",
    "datastore",
    "latentstyles",
    "filetbl",
    "revtbl",
    "expandedcolortbl",
];

/// Windows-1252 code points for bytes 0x80–0x9F; `None` marks unassigned bytes.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('€'), None, Some('‚'), Some('ƒ'), Some('„'), Some('…'), Some('†'), Some('‡'),
    Some('ˆ'), Some('‰'), Some('Š'), Some('‹'), Some('Œ'), None, Some('Ž'), None,
    None, Some('‘'), Some('’'), Some('“'), Some('”'), Some('•'), Some('–'), Some('—'),
    Some('˜'), Some('™'), Some('š'), Some('›'), Some('œ'), None, Some('ž'), Some('Ÿ'),
];

/// Extraction error. The pipeline logs it and skips the file.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("cannot read rendering: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed RTF: {0}")]
    Rtf(String),
}

/// Read a rendering from disk and return its plain text.
///
/// Invalid UTF-8 is replaced rather than rejected; RTF is 7-bit in practice.
pub fn read_rendering(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    extract_text(&content)
}

/// Plain text of `content`, decoding it as RTF when it starts with `{\rtf`.
pub fn extract_text(content: &str) -> Result<String, ExtractError> {
    if content.trim_start().starts_with("{\\rtf") {
        rtf_to_text(content)
    } else {
        Ok(content.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
struct GroupState {
    skip: bool,
    /// Fallback characters following each `\uN`.
    uc: usize,
}

struct Decoder {
    out: String,
    state: GroupState,
    stack: Vec<GroupState>,
    /// Fallback characters still to swallow after a `\uN`.
    pending_fallback: usize,
    /// High surrogate waiting for its low half.
    pending_high: Option<u16>,
}

impl Decoder {
    fn new() -> Self {
        Self {
            out: String::new(),
            state: GroupState { skip: false, uc: 1 },
            stack: Vec::new(),
            pending_fallback: 0,
            pending_high: None,
        }
    }

    fn emit(&mut self, c: char) {
        if self.pending_fallback > 0 {
            self.pending_fallback -= 1;
            return;
        }
        if !self.state.skip {
            self.out.push(c);
        }
    }

    fn emit_control(&mut self, c: char) {
        self.pending_fallback = 0;
        if !self.state.skip {
            self.out.push(c);
        }
    }

    fn emit_utf16(&mut self, unit: u16) {
        let skip = self.state.skip;
        match unit {
            0xD800..=0xDBFF => self.pending_high = Some(unit),
            0xDC00..=0xDFFF => {
                if let Some(high) = self.pending_high.take() {
                    if let Some(Ok(c)) = char::decode_utf16([high, unit]).next() {
                        if !skip {
                            self.out.push(c);
                        }
                    }
                }
            }
            _ => {
                self.pending_high = None;
                if let Some(c) = char::from_u32(u32::from(unit)) {
                    if !skip {
                        self.out.push(c);
                    }
                }
            }
        }
        self.pending_fallback = self.state.uc;
    }

    fn control_word(&mut self, word: &str, param: Option<i32>) {
        if IGNORED_DESTINATIONS.contains(&word) {
            self.state.skip = true;
            return;
        }
        match word {
            "par" | "line" | "sect" | "page" | "row" => self.emit_control('\n'),
            "tab" => self.emit_control('\t'),
            "cell" => self.emit_control(' '),
            "emdash" => self.emit_control('—'),
            "endash" => self.emit_control('–'),
            "bullet" => self.emit_control('•'),
            "lquote" => self.emit_control('‘'),
            "rquote" => self.emit_control('’'),
            "ldblquote" => self.emit_control('“'),
            "rdblquote" => self.emit_control('”'),
            "uc" => self.state.uc = param.unwrap_or(1).max(0) as usize,
            "u" => {
                if let Some(n) = param {
                    // Values above 32767 are written as negative 16-bit numbers.
                    let unit = if n < 0 { (n + 65_536) as u16 } else { n as u16 };
                    self.emit_utf16(unit);
                }
            }
            _ => {}
        }
    }
}

/// Convert an RTF document to plain text.
///
/// # Errors
///
/// Returns [`ExtractError::Rtf`] for a truncated `\'hh` escape. Unbalanced
/// braces are tolerated.
pub fn rtf_to_text(rtf: &str) -> Result<String, ExtractError> {
    let mut dec = Decoder::new();
    let mut chars = rtf.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                dec.stack.push(dec.state);
                dec.pending_fallback = 0;
            }
            '}' => {
                if let Some(prev) = dec.stack.pop() {
                    dec.state = prev;
                }
                dec.pending_fallback = 0;
            }
            '\r' | '\n' => {}
            '\\' => {
                let Some(&next) = chars.peek() else {
                    break;
                };
                if next.is_ascii_alphabetic() {
                    let mut word = String::new();
                    while let Some(&ch) = chars.peek() {
                        if ch.is_ascii_alphabetic() {
                            word.push(ch);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let mut digits = String::new();
                    if chars.peek() == Some(&'-') {
                        digits.push('-');
                        chars.next();
                    }
                    while let Some(&ch) = chars.peek() {
                        if ch.is_ascii_digit() {
                            digits.push(ch);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if chars.peek() == Some(&' ') {
                        chars.next();
                    }
                    let param = digits.parse::<i32>().ok();
                    dec.control_word(&word, param);
                    continue;
                }

                chars.next();
                match next {
                    '\\' | '{' | '}' => dec.emit(next),
                    '\'' => {
                        let hex: String = chars.by_ref().take(2).collect();
                        let byte = u8::from_str_radix(&hex, 16).map_err(|_| {
                            ExtractError::Rtf(format!("invalid hex escape \\'{}", hex))
                        })?;
                        if let Some(ch) = decode_cp1252(byte) {
                            dec.emit(ch);
                        } else if dec.pending_fallback > 0 {
                            dec.pending_fallback -= 1;
                        }
                    }
                    '*' => dec.state.skip = true,
                    '\r' | '\n' => dec.emit_control('\n'),
                    '~' => dec.emit_control('\u{a0}'),
                    '_' => dec.emit_control('-'),
                    _ => {}
                }
            }
            _ => dec.emit(c),
        }
    }

    Ok(dec.out)
}

fn decode_cp1252(byte: u8) -> Option<char> {
    match byte {
        0x80..=0x9F => CP1252_HIGH[usize::from(byte - 0x80)],
        _ => Some(char::from(byte)),
    }
}
