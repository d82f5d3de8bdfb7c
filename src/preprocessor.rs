//! Preprocessor: literal substitutions plus the fixed normalizations spec
//! section 4.4 requires before tokenization.
//!
//! Substitution pairs are plain string replacement, not regex (spec 4.4
//! says "simple string substitutions") — `regex` is reserved for the one
//! remaining structural job, splitting whitespace runs so boundary tokens
//! land between words and lines rather than inside them. NFD
//! decomposition comes from `unicode-normalization`, a dependency this
//! crate's teacher has no use for but other files in the retrieval pack
//! do (see `DESIGN.md`): the teacher never needs to pull diacritics apart
//! from their base letters, this engine always does before case-folding
//! and optional accent stripping.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::token::{BoundaryKind, Token};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Combining diacritical marks stripped when `strip_accents` is set,
/// applied post-NFD so e.g. `ë` (e + U+0308) becomes `e` (spec 4.4,
/// "Map accented vowels to their base when the mode so declares").
fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F)
}

/// Ordered list of literal (pattern, replacement) pairs plus the fixed
/// normalization flags a mode file's `\preprocessor` block can turn on.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    substitutions: Vec<(String, String)>,
    fold_case: bool,
    strip_accents: bool,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self {
            substitutions: Vec::new(),
            fold_case: true,
            strip_accents: false,
        }
    }

    pub fn add_substitution(&mut self, pattern: impl Into<String>, replacement: impl Into<String>) {
        self.substitutions.push((pattern.into(), replacement.into()));
    }

    pub fn set_fold_case(&mut self, value: bool) {
        self.fold_case = value;
    }

    pub fn set_strip_accents(&mut self, value: bool) {
        self.strip_accents = value;
    }

    /// Run substitutions and normalization, then tokenize into a flat
    /// `Token` stream: one `Literal` per Unicode scalar, with `Boundary`
    /// markers inserted around whitespace runs and at line edges.
    pub fn process(&self, input: &str) -> Vec<Token> {
        let mut text = input.to_string();
        for (pattern, replacement) in &self.substitutions {
            text = text.replace(pattern.as_str(), replacement.as_str());
        }

        let decomposed: String = text.nfd().collect();
        let mut normalized = String::with_capacity(decomposed.len());
        for c in decomposed.chars() {
            if self.strip_accents && is_combining_mark(c) {
                continue;
            }
            if self.fold_case {
                normalized.extend(c.to_lowercase());
            } else {
                normalized.push(c);
            }
        }

        tokenize(&normalized)
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let lines: Vec<&str> = text.split('\n').collect();
    for line in lines {
        tokens.push(Token::Boundary(BoundaryKind::LineStart));
        for word in WHITESPACE_RUN.split(line) {
            if word.is_empty() {
                continue;
            }
            tokens.push(Token::Boundary(BoundaryKind::WordStart));
            for c in word.chars() {
                tokens.push(Token::literal(c.to_string()));
            }
            tokens.push(Token::Boundary(BoundaryKind::WordEnd));
        }
        tokens.push(Token::Boundary(BoundaryKind::LineEnd));
    }
    tokens
}
