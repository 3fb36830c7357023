//! Built-in heuristic analyzer for French text.
//!
//! No model, no network. Text is cut into segments at punctuation, elided
//! articles (`l'`, `d'`, `qu'`, …) are split off, and then:
//!
//! - runs of capitalized words become `MISC` entities, minus leading
//!   capitalized stop words;
//! - runs of lower-case content words (no stop words) become noun phrases
//!   of at most three words.
//!
//! Lemmas are lower-cased with a naive plural reduction (`-s`/`-x` dropped
//! from words longer than four characters). Good enough to rank recurring
//! themes; an HTTP backend gives proper lemmatization.

use anyhow::Result;

use skim_notes_core::analysis::{Analysis, Analyzer, Entity, NounPhrase};
use skim_notes_core::stopwords::is_stop_word;

const MAX_PHRASE_WORDS: usize = 3;

const ELISIONS: &[&str] = &[
    "jusqu", "lorsqu", "puisqu", "quoiqu", "qu", "l", "d", "j", "m", "n", "s", "t", "c",
];

const SEGMENT_BREAKS: &[char] = &[
    '.', ',', ';', ':', '!', '?', '(', ')', '[', ']', '«', '»', '"', '“', '”', '…', '—', '–', '\n',
];

/// Heuristic analyzer. Stateless; construction is free.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAnalyzer;

impl LocalAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for LocalAnalyzer {
    fn name(&self) -> &str {
        "local"
    }

    fn analyze(&self, text: &str) -> Result<Analysis> {
        let mut analysis = Analysis::default();
        for segment in text.split(SEGMENT_BREAKS) {
            let words = segment_words(segment);
            collect_segment(&words, &mut analysis);
        }
        Ok(analysis)
    }
}

fn collect_segment(words: &[String], out: &mut Analysis) {
    let mut capitalized: Vec<&str> = Vec::new();
    let mut content: Vec<&str> = Vec::new();

    for word in words {
        if starts_uppercase(word) {
            flush_phrase(&mut content, out);
            capitalized.push(word);
        } else {
            flush_entity(&mut capitalized, out);
            if is_content_word(word) {
                content.push(word);
                if content.len() == MAX_PHRASE_WORDS {
                    flush_phrase(&mut content, out);
                }
            } else {
                flush_phrase(&mut content, out);
            }
        }
    }
    flush_entity(&mut capitalized, out);
    flush_phrase(&mut content, out);
}

fn flush_entity(run: &mut Vec<&str>, out: &mut Analysis) {
    // Capitalized function words ("Le", "Selon") open sentences; they are
    // never part of a name.
    let skip = run
        .iter()
        .take_while(|w| is_stop_word(&w.to_lowercase()))
        .count();
    let words = &run[skip..];
    if !words.is_empty() {
        out.entities.push(Entity {
            text: words.join(" "),
            label: "MISC".to_string(),
            lemma: words.iter().map(|w| lemmatize(w)).collect::<Vec<_>>().join(" "),
        });
    }
    run.clear();
}

fn flush_phrase(run: &mut Vec<&str>, out: &mut Analysis) {
    if run.is_empty() {
        return;
    }
    out.noun_phrases.push(NounPhrase {
        text: run.join(" "),
        lemma: run.iter().map(|w| lemmatize(w)).collect::<Vec<_>>().join(" "),
    });
    run.clear();
}

/// Words of one segment, trimmed of surrounding punctuation, with elided
/// prefixes split into their own word.
fn segment_words(segment: &str) -> Vec<String> {
    let mut words = Vec::new();
    for raw in segment.split_whitespace() {
        let word = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '’');
        let word = word.trim_end_matches(['\'', '’']);
        if word.is_empty() {
            continue;
        }
        match split_elision(word) {
            Some((prefix, rest)) => {
                words.push(prefix.to_lowercase());
                words.push(rest.to_string());
            }
            None => words.push(word.to_string()),
        }
    }
    words
}

fn split_elision(word: &str) -> Option<(&str, &str)> {
    let idx = word.find(['\'', '’'])?;
    let (head, tail) = word.split_at(idx);
    let apostrophe_len = tail.chars().next()?.len_utf8();
    let rest = &tail[apostrophe_len..];
    if rest.is_empty() || !ELISIONS.contains(&head.to_lowercase().as_str()) {
        return None;
    }
    Some((&word[..idx + apostrophe_len], rest))
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn is_content_word(word: &str) -> bool {
    word.chars().all(|c| c.is_alphabetic() || c == '-')
        && word.chars().any(char::is_alphabetic)
        && !is_stop_word(word)
}

fn lemmatize(word: &str) -> String {
    let lowered = word.to_lowercase();
    if lowered.chars().count() > 4 && (lowered.ends_with('s') || lowered.ends_with('x')) {
        let mut chars = lowered.chars();
        chars.next_back();
        return chars.as_str().to_string();
    }
    lowered
}
