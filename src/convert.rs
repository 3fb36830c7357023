//! `.skim` annotation files → RTF renderings.
//!
//! A `.skim` file is a property list whose root is an array of annotation
//! dictionaries. Each dictionary with an integer `pageIndex` and non-empty
//! `contents` becomes one annotation; the rest (highlights without text,
//! links, …) is ignored.
//!
//! The rendering lists annotations by ascending page, one bold
//! `Page <n>:` header (1-based) per annotation followed by its indented
//! text. [`crate::extract`] reads it back.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::Config;
use crate::error::PipelineError;
use crate::scan::{has_extension, walk_watched};

const RTF_HEADER: &str = concat!(
    "{\\rtf1\\ansi\\ansicpg1252\\uc1\n",
    "{\\fonttbl",
    "{\\f0\\froman\\fcharset0\\fprq2 Times New Roman;}",
    "{\\f1\\fnil\\fcharset2\\fprq2 Symbol;}",
    "{\\f2\\fnil\\fcharset0\\fprq2 Arial Unicode MS;}",
    "}\n",
    "{\\colortbl;\\red255\\green255\\blue255;}\n",
    "\\f0\\fs28\n",
    "\\margl1440\\margr1440\\paperw11900\\paperh16840\n",
);

/// One text-bearing annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkimAnnotation {
    /// Zero-based page index.
    pub page_index: u32,
    pub contents: String,
}

/// Extract text annotations from a decoded property list, sorted by page.
///
/// The sort is stable, so annotations on the same page keep file order.
pub fn annotations_from_plist(value: &plist::Value) -> Vec<SkimAnnotation> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    let mut annotations: Vec<SkimAnnotation> = items
        .iter()
        .filter_map(|item| {
            let dict = item.as_dictionary()?;
            let page = dict.get("pageIndex").and_then(page_index)?;
            let contents = dict.get("contents")?.as_string()?.trim();
            if contents.is_empty() {
                return None;
            }
            Some(SkimAnnotation {
                page_index: page,
                contents: contents.to_string(),
            })
        })
        .collect();

    annotations.sort_by_key(|a| a.page_index);
    annotations
}

fn page_index(value: &plist::Value) -> Option<u32> {
    if let Some(n) = value.as_unsigned_integer() {
        return u32::try_from(n).ok();
    }
    if let Some(n) = value.as_signed_integer() {
        return u32::try_from(n).ok();
    }
    value
        .as_real()
        .filter(|r| r.is_finite() && *r >= 0.0 && *r <= f64::from(u32::MAX))
        .map(|r| r as u32)
}

/// Decode a `.skim` file.
///
/// # Errors
///
/// [`PipelineError::DecodeFailure`] when the file cannot be parsed as a
/// property list or holds no text annotations.
pub fn read_skim(path: &Path) -> Result<Vec<SkimAnnotation>, PipelineError> {
    let value = plist::Value::from_file(path).map_err(|e| PipelineError::decode(path, e))?;
    let annotations = annotations_from_plist(&value);
    if annotations.is_empty() {
        return Err(PipelineError::decode(path, "no text annotations"));
    }
    Ok(annotations)
}

/// Escape text for an RTF body: control characters are escaped, non-ASCII
/// becomes `\uN?` per UTF-16 unit, line breaks become `\line`.
pub fn escape_rtf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\n' => out.push_str("\\line "),
            '\t' => out.push_str("\\tab "),
            '\r' => {}
            c if c.is_ascii() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{}?", *unit as i16));
                }
            }
        }
    }
    out
}

/// Render annotations as an RTF document.
pub fn render_rtf(annotations: &[SkimAnnotation]) -> String {
    let mut out = String::from(RTF_HEADER);
    for a in annotations {
        out.push_str("\\par\\par\n");
        out.push_str(&format!("{{\\b Page {}:}}\\par\n", u64::from(a.page_index) + 1));
        out.push_str("\\li720 ");
        out.push_str(&escape_rtf(&a.contents));
        out.push_str("\\li0\\par\n");
    }
    out.push('}');
    out
}

/// Rendering path for an annotation file (`X.skim` → `X.rtf`).
pub fn rendering_path(skim: &Path, rendering_extension: &str) -> PathBuf {
    skim.with_extension(rendering_extension)
}

/// Whether `skim` must be (re)converted into `target`.
///
/// Conversion is skipped only when the rendering exists and is strictly
/// newer than the annotation file. Unreadable timestamps force conversion.
pub fn needs_conversion(skim: &Path, target: &Path) -> bool {
    match (mtime(target), mtime(skim)) {
        (Some(rendered), Some(annotated)) => rendered <= annotated,
        _ => true,
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Convert one annotation file, returning the number of annotations written.
pub fn convert_file(skim: &Path, target: &Path) -> Result<usize, PipelineError> {
    if !skim.is_file() {
        return Err(PipelineError::SourceUnavailable {
            path: skim.to_path_buf(),
        });
    }
    let annotations = read_skim(skim)?;
    std::fs::write(target, render_rtf(&annotations))
        .map_err(|e| PipelineError::write(target, e))?;
    Ok(annotations.len())
}

/// Outcome of a batch conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    pub converted: usize,
    pub up_to_date: usize,
    pub failed: usize,
}

/// Convert every out-of-date annotation file under the watched folders.
///
/// Individual failures are logged and counted; they never abort the batch.
pub fn convert_all(config: &Config) -> Result<ConvertSummary> {
    let mut summary = ConvertSummary::default();

    for skim in walk_watched(config)?
        .into_iter()
        .filter(|p| has_extension(p, &config.scan.annotation_extension))
    {
        let target = rendering_path(&skim, &config.scan.rendering_extension);
        if !needs_conversion(&skim, &target) {
            summary.up_to_date += 1;
            continue;
        }
        match convert_file(&skim, &target) {
            Ok(count) => {
                tracing::info!(file = %skim.display(), annotations = count, "converted");
                summary.converted += 1;
            }
            Err(e) => {
                tracing::warn!("{}", e);
                summary.failed += 1;
            }
        }
    }

    if summary.converted > 0 {
        tracing::info!(converted = summary.converted, "batch conversion finished");
    } else {
        tracing::info!("batch conversion: all renderings up to date");
    }
    Ok(summary)
}
