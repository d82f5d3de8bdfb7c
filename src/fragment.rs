//! Fragment / Sheaf / SheafChain: the algebra that expands compact authored
//! rule text into enumerated token combinations (spec section 4.1).
//!
//! The shape here mirrors how the teacher crate builds up small, owned,
//! linearly-scanned structures rather than reaching for a parser-combinator
//! crate (see `bpe.rs`'s hand-rolled symbol linked list) — a rule side is
//! small authored text, not a file format, so a direct character scan is
//! both simpler and faster than pulling in a grammar dependency.
//!
//! A rule's two sides read differently even though they share the same
//! bracket/paren algebra: a source side spells literal input characters
//! one at a time (it has to line up against the preprocessor's one-token-
//! per-scalar stream), while a destination side names charset entries by
//! whole word (`tinco`, not `t`,`i`,`n`,`c`,`o`). `TokenizeMode` is how one
//! expansion engine serves both readings without duplicating the algebra.

use crate::error::{FinalizeError, ParseError};
use crate::token::{BoundaryKind, Token};

/// How a fully-expanded combination string turns into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizeMode {
    /// One token per Unicode scalar (source sides: must match the
    /// preprocessor's per-character stream).
    CharLevel,
    /// One token per whitespace-delimited word, naming a charset entry
    /// unless quoted or a boundary marker (destination sides).
    WordLevel,
}

/// The smallest authored expansion unit: `prefix(a,b)(c,d)` style text,
/// finalized into a non-empty list of equal-length token sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub combinations: Vec<Vec<Token>>,
}

impl Fragment {
    /// Parse and finalize one fragment expression (already regular-variable
    /// substituted; `{UNI_...}` placeholders are resolved here).
    pub fn parse(expr: &str, line_no: usize, mode: TokenizeMode) -> Result<Fragment, ParseError> {
        let segments = scan_segments(expr, line_no)?;
        let raw_combinations = expand_segments(&segments);
        Ok(Fragment {
            combinations: raw_combinations
                .into_iter()
                .map(|combo| tokenize_piece(combo, mode))
                .collect(),
        })
    }

    /// Validate the arity invariant (spec section 3: "All sequences in a
    /// finalized Fragment have identical length") and resolve any
    /// `{UNI_...}` placeholders that scanning left as `Piece::Placeholder`.
    pub fn finalize(self) -> Result<Fragment, FinalizeError> {
        let resolved: Result<Vec<Vec<Token>>, FinalizeError> = self
            .combinations
            .into_iter()
            .map(resolve_combination)
            .collect();
        let combinations = resolved?;

        let lengths: Vec<usize> = combinations.iter().map(|c| c.len()).collect();
        if let Some(first) = lengths.first() {
            if lengths.iter().any(|l| l != first) {
                return Err(FinalizeError::ArityMismatch { lengths });
            }
        }

        crate::invariants::assert_fragment_arity(&combinations);
        Ok(Fragment { combinations })
    }

    pub fn arity(&self) -> Option<usize> {
        self.combinations.first().map(|c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }
}

/// Intermediate token-or-placeholder produced by the scan, before
/// `{UNI_...}` placeholders are resolved by `Fragment::finalize`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Token(Token),
    Placeholder(String),
}

/// Resolve all placeholder pieces in one combination into concrete tokens.
fn resolve_combination(pieces: Vec<Piece>) -> Result<Vec<Token>, FinalizeError> {
    pieces
        .into_iter()
        .map(|p| match p {
            Piece::Token(t) => Ok(t),
            Piece::Placeholder(name) => resolve_placeholder(&name),
        })
        .collect()
}

fn resolve_placeholder(name: &str) -> Result<Token, FinalizeError> {
    let Some(hex_groups) = name.strip_prefix("UNI_") else {
        return Err(FinalizeError::UnresolvedVariable(name.to_string()));
    };
    let mut text = String::new();
    for group in hex_groups.split('_') {
        let code = u32::from_str_radix(group, 16)
            .map_err(|_| FinalizeError::InvalidUnicodeLiteral(name.to_string()))?;
        let ch = char::from_u32(code)
            .ok_or_else(|| FinalizeError::InvalidUnicodeLiteral(name.to_string()))?;
        text.push(ch);
    }
    if text.is_empty() {
        return Err(FinalizeError::InvalidUnicodeLiteral(name.to_string()));
    }
    Ok(Token::literal(text))
}

/// One fixed-text segment, or an alternation group with >= 1 (possibly
/// empty) alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Group(Vec<String>),
}

fn scan_segments(expr: &str, line_no: usize) -> Result<Vec<Segment>, ParseError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '(' {
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            let close = chars[i..]
                .iter()
                .position(|&c| c == ')')
                .map(|p| i + p)
                .ok_or_else(|| ParseError::new(line_no, i + 1, "')'", "end of expression".into()))?;
            let inner: String = chars[i + 1..close].iter().collect();
            let alternatives: Vec<String> = inner.split(',').map(|s| s.to_string()).collect();
            segments.push(Segment::Group(alternatives));
            i = close + 1;
        } else {
            literal.push(c);
            i += 1;
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Cartesian product across `Group` segments, concatenating the fixed text
/// of `Literal` segments in between, in source order.
fn expand_segments(segments: &[Segment]) -> Vec<String> {
    let mut combos: Vec<String> = vec![String::new()];
    for segment in segments {
        combos = match segment {
            Segment::Literal(text) => combos
                .into_iter()
                .map(|mut c| {
                    c.push_str(text);
                    c
                })
                .collect(),
            Segment::Group(alts) => combos
                .into_iter()
                .flat_map(|c| {
                    alts.iter().map(move |alt| {
                        let mut next = c.clone();
                        next.push_str(alt);
                        next
                    })
                })
                .collect(),
        };
    }
    combos
}

fn boundary_keyword(word: &str) -> Option<BoundaryKind> {
    match word {
        "^WS" => Some(BoundaryKind::WordStart),
        "^WE" => Some(BoundaryKind::WordEnd),
        "^LS" => Some(BoundaryKind::LineStart),
        "^LE" => Some(BoundaryKind::LineEnd),
        _ => None,
    }
}

fn tokenize_piece(combo: String, mode: TokenizeMode) -> Vec<Piece> {
    match mode {
        TokenizeMode::CharLevel => tokenize_char_level(&combo),
        TokenizeMode::WordLevel => combo.split_whitespace().flat_map(tokenize_word).collect(),
    }
}

/// Split one fully-expanded combination string into `Piece`s: `{...}`
/// placeholders stay atomic, everything else becomes one piece per scalar.
fn tokenize_char_level(combo: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let chars: Vec<char> = combo.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(end) = chars[i..].iter().position(|&c| c == '}') {
                let end = i + end;
                let name: String = chars[i + 1..end].iter().collect();
                pieces.push(Piece::Placeholder(name));
                i = end + 1;
                continue;
            }
        }
        pieces.push(Piece::Token(Token::literal(chars[i].to_string())));
        i += 1;
    }
    pieces
}

/// Turn one whitespace-delimited word into a piece: a boundary marker, a
/// quoted literal, a bare `{UNI_...}` placeholder, or a charset symbol
/// name. A word mixing a placeholder with surrounding text falls back to
/// the char-level scan, since that combination has no word-level meaning.
fn tokenize_word(word: &str) -> Vec<Piece> {
    if let Some(kind) = boundary_keyword(word) {
        return vec![Piece::Token(Token::Boundary(kind))];
    }
    if word.len() >= 2 && word.starts_with('"') && word.ends_with('"') {
        return vec![Piece::Token(Token::literal(&word[1..word.len() - 1]))];
    }
    if word.len() >= 2 && word.starts_with('{') && word.ends_with('}') {
        return vec![Piece::Placeholder(word[1..word.len() - 1].to_string())];
    }
    if word.contains('{') {
        return tokenize_char_level(word);
    }
    vec![Piece::Token(Token::symbol(word))]
}

/// A `*`-joined list of Fragments inside a `[...]` block. Evaluates to the
/// cartesian product of its Fragments' combinations, concatenated in
/// source order (see `DESIGN.md` for why this crate reads "concatenation
/// of Fragments' combinations" as cartesian rather than positional zip).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheaf {
    pub fragments: Vec<Fragment>,
}

impl Sheaf {
    /// Parse the inside of a `[...]` block (already stripped of the
    /// brackets), splitting on top-level `*`.
    pub fn parse(inner: &str, line_no: usize, mode: TokenizeMode) -> Result<Vec<Fragment>, ParseError> {
        inner
            .split('*')
            .map(|expr| Fragment::parse(expr.trim(), line_no, mode))
            .collect()
    }

    pub fn from_fragments(fragments: Vec<Fragment>) -> Sheaf {
        Sheaf { fragments }
    }

    /// All concrete token sequences this sheaf evaluates to.
    pub fn enumerate(&self) -> Vec<Vec<Token>> {
        let mut combos: Vec<Vec<Token>> = vec![Vec::new()];
        for fragment in &self.fragments {
            combos = combos
                .into_iter()
                .flat_map(|prefix| {
                    fragment.combinations.iter().map(move |combo| {
                        let mut next = prefix.clone();
                        next.extend(combo.iter().cloned());
                        next
                    })
                })
                .collect();
        }
        combos
    }
}

/// An ordered list of Sheaves, split from a rule side on `][` boundaries.
/// Plain words outside brackets are wrapped as degenerate singleton
/// sheaves so bare text and bracketed alternation mix freely (spec 4.1);
/// a bare word that names a boundary marker becomes an anchor sheaf
/// instead of literal/symbol content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheafChain {
    pub sheaves: Vec<Sheaf>,
}

impl SheafChain {
    pub fn from_sheaves(sheaves: Vec<Sheaf>) -> SheafChain {
        SheafChain { sheaves }
    }

    /// Scan a rule side into a `SheafChain`.
    pub fn parse(text: &str, line_no: usize, mode: TokenizeMode) -> Result<SheafChain, ParseError> {
        let mut sheaves = Vec::new();
        let mut literal = String::new();
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            if chars[i] == '[' {
                if !literal.is_empty() {
                    flush_literal_run(&std::mem::take(&mut literal), line_no, mode, &mut sheaves)?;
                }
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|p| i + p)
                    .ok_or_else(|| {
                        ParseError::new(line_no, i + 1, "']'", "end of expression".into())
                    })?;
                let inner: String = chars[i + 1..close].iter().collect();
                let fragments = Sheaf::parse(&inner, line_no, mode)?;
                sheaves.push(Sheaf::from_fragments(fragments));
                i = close + 1;
            } else {
                literal.push(chars[i]);
                i += 1;
            }
        }
        if !literal.is_empty() {
            flush_literal_run(&literal, line_no, mode, &mut sheaves)?;
        }

        Ok(SheafChain { sheaves })
    }

    pub fn finalize(self) -> Result<Vec<Sheaf>, FinalizeError> {
        self.sheaves
            .into_iter()
            .map(|sheaf| {
                let fragments: Result<Vec<Fragment>, FinalizeError> = sheaf
                    .fragments
                    .into_iter()
                    .map(Fragment::finalize)
                    .collect();
                Ok(Sheaf::from_fragments(fragments?))
            })
            .collect()
    }

    /// Iterator over the cartesian product across sheaves (spec 4.1,
    /// `SheafChainIterator`): one index per sheaf, advanced odometer-style.
    pub fn iter(&self, finalized: &[Sheaf]) -> SheafChainIterator {
        let enumerations: Vec<Vec<Vec<Token>>> = finalized.iter().map(Sheaf::enumerate).collect();
        SheafChainIterator::new(enumerations)
    }
}

/// Split a literal run (no brackets) on whitespace; a sub-word naming a
/// boundary marker becomes its own anchor sheaf, everything else is
/// expanded through the Fragment algebra and wrapped as a sheaf.
fn flush_literal_run(
    run: &str,
    line_no: usize,
    mode: TokenizeMode,
    sheaves: &mut Vec<Sheaf>,
) -> Result<(), ParseError> {
    for word in run.split_whitespace() {
        if let Some(kind) = boundary_keyword(word) {
            let fragment = Fragment {
                combinations: vec![vec![Token::Boundary(kind)]],
            };
            sheaves.push(Sheaf::from_fragments(vec![fragment]));
        } else {
            sheaves.push(literal_sheaf(word, line_no, mode)?);
        }
    }
    Ok(())
}

fn literal_sheaf(text: &str, line_no: usize, mode: TokenizeMode) -> Result<Sheaf, ParseError> {
    let fragment = Fragment::parse(text, line_no, mode)?;
    Ok(Sheaf::from_fragments(vec![fragment]))
}

/// Finite, restartable odometer over a list of already-enumerated Sheaves.
pub struct SheafChainIterator {
    enumerations: Vec<Vec<Vec<Token>>>,
    indices: Vec<usize>,
    done: bool,
}

impl SheafChainIterator {
    fn new(enumerations: Vec<Vec<Vec<Token>>>) -> Self {
        let done = enumerations.iter().any(|e| e.is_empty());
        let indices = vec![0; enumerations.len()];
        SheafChainIterator {
            enumerations,
            indices,
            done,
        }
    }

    pub fn restart(&mut self) {
        self.indices.iter_mut().for_each(|i| *i = 0);
        self.done = self.enumerations.iter().any(|e| e.is_empty());
    }

    pub fn len(&self) -> usize {
        self.enumerations.iter().map(Vec::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for SheafChainIterator {
    type Item = Vec<Token>;

    fn next(&mut self) -> Option<Vec<Token>> {
        if self.done || self.enumerations.is_empty() {
            if self.enumerations.is_empty() && !self.done {
                self.done = true;
                return Some(Vec::new());
            }
            return None;
        }

        let mut result = Vec::new();
        for (sheaf_idx, enumeration) in self.enumerations.iter().enumerate() {
            result.extend(enumeration[self.indices[sheaf_idx]].iter().cloned());
        }

        // Advance odometer from the rightmost sheaf.
        for i in (0..self.indices.len()).rev() {
            self.indices[i] += 1;
            if self.indices[i] < self.enumerations[i].len() {
                break;
            }
            self.indices[i] = 0;
            if i == 0 {
                self.done = true;
            }
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_expands_cartesian_groups() {
        let fragment = Fragment::parse("h(a,ä)(i,ï)", 1, TokenizeMode::CharLevel)
            .unwrap()
            .finalize()
            .unwrap();
        let rendered: Vec<String> = fragment
            .combinations
            .iter()
            .map(|combo| combo.iter().map(|t| t.to_string()).collect::<String>())
            .collect();
        assert_eq!(rendered, vec!["hai", "haï", "häi", "häï"]);
    }

    #[test]
    fn fragment_allows_empty_alternative() {
        let fragment = Fragment::parse("h(,a)", 1, TokenizeMode::CharLevel)
            .unwrap()
            .finalize()
            .unwrap();
        assert_eq!(fragment.combinations.len(), 2);
        assert_eq!(fragment.combinations[0].len(), 1); // "h"
        assert_eq!(fragment.combinations[1].len(), 2); // "h", "a"
    }

    #[test]
    fn fragment_resolves_unicode_literal_as_one_atomic_token() {
        let fragment = Fragment::parse("x{UNI_0041}y", 1, TokenizeMode::CharLevel)
            .unwrap()
            .finalize()
            .unwrap();
        assert_eq!(fragment.combinations.len(), 1);
        let combo = &fragment.combinations[0];
        assert_eq!(combo.len(), 3);
        assert_eq!(combo[1], Token::literal("A"));
    }

    #[test]
    fn word_level_fragment_yields_symbol_tokens() {
        let fragment = Fragment::parse("(tinco,calma)", 1, TokenizeMode::WordLevel)
            .unwrap()
            .finalize()
            .unwrap();
        assert_eq!(fragment.combinations[0], vec![Token::symbol("tinco")]);
        assert_eq!(fragment.combinations[1], vec![Token::symbol("calma")]);
    }

    #[test]
    fn sheaf_enumerates_cartesian_product_of_fragments() {
        let fragments = Sheaf::parse("(t,c)*(a,e)", 1, TokenizeMode::CharLevel)
            .unwrap()
            .into_iter()
            .map(|f| f.finalize().unwrap())
            .collect();
        let sheaf = Sheaf::from_fragments(fragments);
        let combos = sheaf.enumerate();
        assert_eq!(combos.len(), 4);
    }

    #[test]
    fn sheaf_chain_iterates_odometer_style() {
        let chain = SheafChain::parse("[t*c][a,e]", 1, TokenizeMode::CharLevel).unwrap();
        let finalized = chain.clone().finalize().unwrap();
        let results: Vec<Vec<Token>> = chain.iter(&finalized).collect();
        // sheaf 1 has a single fragment "t*c" concatenated -> one combo "tc"
        // sheaf 2 has "(a,e)" -> two combos
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn sheaf_chain_mixes_bare_text_and_brackets() {
        let chain = SheafChain::parse("x[a,b]y", 1, TokenizeMode::CharLevel).unwrap();
        assert_eq!(chain.sheaves.len(), 3);
    }

    #[test]
    fn sheaf_chain_recognizes_boundary_word() {
        let chain = SheafChain::parse("^WS t", 1, TokenizeMode::CharLevel).unwrap();
        assert_eq!(chain.sheaves.len(), 2);
        assert_eq!(
            chain.sheaves[0].fragments[0].combinations[0],
            vec![Token::Boundary(BoundaryKind::WordStart)]
        );
    }
}
