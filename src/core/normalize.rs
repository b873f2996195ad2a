//! Text normalization for duplicate comparison.
//!
//! Canonicalizes raw question text into a comparable form: Unicode NFC,
//! case-folding, whitespace collapsing, optional punctuation stripping.
//! NFC runs before case-folding so combining marks in Devanagari/Gurmukhi
//! text canonicalize before any comparison. All functions here are pure;
//! the original record text is never mutated.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Flags controlling [`normalize`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Convert to lowercase
    pub lowercase: bool,
    /// Collapse runs of whitespace to a single space and trim
    pub collapse_whitespace: bool,
    /// Strip punctuation (anything outside `\w` and whitespace)
    pub strip_punctuation: bool,
    /// Apply Unicode canonical composition (NFC) first
    pub unicode_nfc: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            lowercase: true,
            collapse_whitespace: true,
            strip_punctuation: false,
            unicode_nfc: true,
        }
    }
}

// Regexes are process-wide; `\w` is Unicode-aware so Hindi/Punjabi word
// characters survive punctuation stripping.
static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();
static PUNCTUATION_RE: OnceLock<Regex> = OnceLock::new();
static WORD_RE: OnceLock<Regex> = OnceLock::new();

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

fn punctuation_re() -> &'static Regex {
    PUNCTUATION_RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("punctuation regex"))
}

fn word_re() -> &'static Regex {
    WORD_RE.get_or_init(|| Regex::new(r"\w").expect("word regex"))
}

/// Label prefixes stripped by [`clean_question`] (comparison only)
const QUESTION_PREFIXES: &[&str] = &["question:", "query:", "q:", "प्रश्न:"];

/// Normalize `text` for comparison. Never fails; an empty input yields an
/// empty string.
pub fn normalize(text: &str, opts: &NormalizeOptions) -> String {
    let mut out: String = if opts.unicode_nfc {
        text.nfc().collect()
    } else {
        text.to_string()
    };

    if opts.lowercase {
        out = out.to_lowercase();
    }

    if opts.collapse_whitespace {
        out = whitespace_re().replace_all(&out, " ").trim().to_string();
    }

    if opts.strip_punctuation {
        out = punctuation_re().replace_all(&out, "").into_owned();
    }

    out
}

/// Question-specific cleaning used by the fuzzy and semantic stages:
/// default normalization, then strip common label prefixes and trailing
/// question marks. The stored record text is left untouched.
pub fn clean_question(text: &str) -> String {
    let mut out = normalize(text, &NormalizeOptions::default());

    for prefix in QUESTION_PREFIXES {
        if let Some(rest) = out.strip_prefix(prefix) {
            out = rest.trim_start().to_string();
        }
    }

    out.trim_end_matches('?').trim_end().to_string()
}

/// Validity check applied before Stage 1. Records failing this are
/// filtered out and counted separately; this is expected behavior,
/// not a fault.
pub fn is_valid_question(text: &str, min_length: usize, max_length: usize) -> bool {
    let trimmed = text.trim();
    let len = trimmed.chars().count();

    if len < min_length || len > max_length {
        return false;
    }

    // Reject strings that are only whitespace/symbols
    word_re().is_match(trimmed)
}

/// Extract keywords: normalized, punctuation-free tokens of at least
/// `min_length` characters.
pub fn extract_keywords(text: &str, min_length: usize) -> Vec<String> {
    let opts = NormalizeOptions {
        strip_punctuation: true,
        ..NormalizeOptions::default()
    };

    normalize(text, &opts)
        .split_whitespace()
        .filter(|w| w.chars().count() >= min_length)
        .map(str::to_string)
        .collect()
}
