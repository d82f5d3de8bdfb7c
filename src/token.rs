//! The tagged value that flows between every pipeline stage.
//!
//! A dynamically-typed host language can let tokens be either a character,
//! a charset-entry reference, or a boundary marker without declaring the
//! distinction anywhere. In Rust we carry the tag explicitly (see
//! `DESIGN.md`, "dynamic typing -> tagged variants").

use serde::Serialize;

/// A positional anchor a rule's source side can carry, or that the
/// preprocessor inserts into the token stream around whitespace runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BoundaryKind {
    LineStart,
    LineEnd,
    WordStart,
    WordEnd,
}

/// Every item flowing between pipeline stages.
///
/// `Literal` holds a `String` rather than a `char` because a Unicode-literal
/// variable (`{UNI_1F4A9}`) can resolve to more than one Unicode scalar and
/// must stay atomic across the pipeline (spec: Variable, Fragment
/// finalization). Ordinary preprocessed input still produces one `Literal`
/// per scalar; only Unicode-literal resolution ever puts more than one
/// scalar in a single `Literal`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Token {
    /// A literal grapheme cluster passed through from input, or a resolved
    /// Unicode-literal variable.
    Literal(String),
    /// A named charset entry: a real `Character` or a `VirtualChar`.
    Symbol(String),
    /// A structural word/line boundary marker.
    Boundary(BoundaryKind),
}

impl Token {
    pub fn literal<S: Into<String>>(s: S) -> Self {
        Token::Literal(s.into())
    }

    pub fn symbol<S: Into<String>>(s: S) -> Self {
        Token::Symbol(s.into())
    }

    /// True for `Symbol` tokens — names that must resolve against a
    /// charset during post-processing.
    pub fn is_symbol(&self) -> bool {
        matches!(self, Token::Symbol(_))
    }

    pub fn as_symbol_name(&self) -> Option<&str> {
        match self {
            Token::Symbol(name) => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Literal(s) => write!(f, "{s}"),
            Token::Symbol(name) => write!(f, "<{name}>"),
            Token::Boundary(BoundaryKind::LineStart) => write!(f, "\u{2402}LS"),
            Token::Boundary(BoundaryKind::LineEnd) => write!(f, "\u{2402}LE"),
            Token::Boundary(BoundaryKind::WordStart) => write!(f, "\u{2402}WS"),
            Token::Boundary(BoundaryKind::WordEnd) => write!(f, "\u{2402}WE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_display_round_trips_text() {
        let t = Token::literal("a");
        assert_eq!(t.to_string(), "a");
    }

    #[test]
    fn symbol_is_distinguished_from_literal() {
        assert!(Token::symbol("tinco").is_symbol());
        assert!(!Token::literal("t").is_symbol());
    }
}
