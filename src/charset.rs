//! Charset registry: real `Character`s and contextual `VirtualChar`s.
//!
//! A charset file is lines of `\char <hex> <NAME> [flags...]` and
//! `\virtual <NAME> { <trigger> --> <replacement>; ... }` (spec section 6).
//! The charset owns its entries; the rest of the pipeline only ever carries
//! entry *names* (`Token::Symbol`), never pointers into this structure
//! (spec section 9, "Charset ownership") — that keeps `Token` serializable
//! and avoids lifetime entanglement between the trie, the token stream, and
//! the charset, mirroring how the teacher keeps `Vocabulary` as a
//! standalone owned store looked up by id (`vocab.rs`).

use std::collections::HashMap;

use crate::error::ParseError;
use crate::token::{BoundaryKind, Token};

/// Bitset of classification flags a `\char` line may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharFlags(u8);

impl CharFlags {
    pub const NONE: CharFlags = CharFlags(0);
    pub const PUNCTUATION: CharFlags = CharFlags(1 << 0);
    pub const SPACE: CharFlags = CharFlags(1 << 1);
    pub const DIGIT: CharFlags = CharFlags(1 << 2);

    pub fn contains(self, other: CharFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: CharFlags) {
        self.0 |= other.0;
    }

    fn from_name(name: &str) -> Option<CharFlags> {
        match name {
            "punctuation" => Some(CharFlags::PUNCTUATION),
            "space" => Some(CharFlags::SPACE),
            "digit" => Some(CharFlags::DIGIT),
            _ => None,
        }
    }
}

impl std::ops::BitOr for CharFlags {
    type Output = CharFlags;
    fn bitor(self, rhs: CharFlags) -> CharFlags {
        CharFlags(self.0 | rhs.0)
    }
}

/// A real charset entry: a name, a font code, and (for Unicode-mapped
/// charsets) the code point it emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub name: String,
    pub font_code: u32,
    pub code_point: Option<char>,
    pub flags: CharFlags,
}

/// One triggered substitution a `VirtualChar` may perform during
/// `ResolveVirtuals` pass 1: replace `trigger` with `replacement` when the
/// trigger sequence is found around the virtual's position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub trigger: Vec<Token>,
    pub replacement: Vec<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A reordering with the adjacent token on `side`, applied unconditionally
/// in `ResolveVirtuals` pass 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swap {
    pub side: Side,
    pub with: Token,
}

/// A charset entry resolved contextually against real characters during
/// post-processing, never emitted directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualChar {
    pub name: String,
    pub rewrites: Vec<Rewrite>,
    pub sequence: Option<Vec<Token>>,
    pub swaps: Vec<Swap>,
}

/// Registry of real and virtual characters backing one mode.
#[derive(Debug, Clone, Default)]
pub struct Charset {
    pub name: String,
    characters: HashMap<String, Character>,
    virtuals: HashMap<String, VirtualChar>,
}

impl Charset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            characters: HashMap::new(),
            virtuals: HashMap::new(),
        }
    }

    pub fn add_character(&mut self, character: Character) {
        self.characters.insert(character.name.clone(), character);
    }

    pub fn add_virtual(&mut self, v: VirtualChar) {
        self.virtuals.insert(v.name.clone(), v);
    }

    pub fn get_character(&self, name: &str) -> Option<&Character> {
        self.characters.get(name)
    }

    pub fn get_virtual(&self, name: &str) -> Option<&VirtualChar> {
        self.virtuals.get(name)
    }

    pub fn is_virtual(&self, name: &str) -> bool {
        self.virtuals.contains_key(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.characters.contains_key(name) || self.virtuals.contains_key(name)
    }

    pub fn n_characters(&self) -> usize {
        self.characters.len()
    }

    pub fn n_virtuals(&self) -> usize {
        self.virtuals.len()
    }

    /// Parse a charset file's full text into a `Charset`.
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Charset, ParseError> {
        let mut charset = Charset::new(name);

        for (line_no, raw_line) in source.lines().enumerate() {
            let line_no = line_no + 1;
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix("\\char") {
                let character = parse_char_line(rest.trim(), line_no)?;
                charset.add_character(character);
            } else if let Some(rest) = line.strip_prefix("\\virtual") {
                let v = parse_virtual_block(rest.trim(), line_no)?;
                charset.add_virtual(v);
            } else {
                return Err(ParseError::new(
                    line_no,
                    1,
                    "\\char or \\virtual directive",
                    line.to_string(),
                ));
            }
        }

        Ok(charset)
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_char_line(rest: &str, line_no: usize) -> Result<Character, ParseError> {
    let mut parts = rest.split_whitespace();
    let hex = parts
        .next()
        .ok_or_else(|| ParseError::new(line_no, 1, "hex code point", "end of line".into()))?;
    let name = parts
        .next()
        .ok_or_else(|| ParseError::new(line_no, 1, "character name", "end of line".into()))?;

    let font_code = u32::from_str_radix(hex, 16)
        .map_err(|_| ParseError::new(line_no, 1, "hexadecimal font code", hex.to_string()))?;

    // `\char` lines carry a font glyph index, not a Unicode codepoint — the
    // grammar has no separate marker for "this one is actually Unicode", so
    // `code_point` stays `None` here and `Emit` always derives the rendered
    // scalar from `font_code` through the PUA-shift fallback.
    let code_point = None;

    let mut flags = CharFlags::NONE;
    for flag_name in parts {
        if let Some(flag) = CharFlags::from_name(flag_name) {
            flags.insert(flag);
        } else {
            return Err(ParseError::new(
                line_no,
                1,
                "a recognized flag (punctuation, space, digit)",
                flag_name.to_string(),
            ));
        }
    }

    Ok(Character {
        name: name.to_string(),
        font_code,
        code_point,
        flags,
    })
}

/// Parse `<NAME> { <trigger> --> <replacement>; sequence: ...; swap: ...; }`.
/// The block may span multiple source lines; `rest` is everything on the
/// `\virtual` line after the directive keyword, and is expected to already
/// contain the full `{ ... }` body (multi-line charset files are folded to
/// one logical line before this function runs, see `Charset::parse`'s
/// caller contract in `modefile.rs` for mode-embedded charsets).
fn parse_virtual_block(rest: &str, line_no: usize) -> Result<VirtualChar, ParseError> {
    let open = rest
        .find('{')
        .ok_or_else(|| ParseError::new(line_no, 1, "'{'", rest.to_string()))?;
    let close = rest
        .rfind('}')
        .ok_or_else(|| ParseError::new(line_no, 1, "'}'", rest.to_string()))?;
    if close < open {
        return Err(ParseError::new(line_no, 1, "'{' before '}'", rest.to_string()));
    }

    let name = rest[..open].trim().to_string();
    if name.is_empty() {
        return Err(ParseError::new(line_no, 1, "virtual character name", "nothing".into()));
    }

    let body = &rest[open + 1..close];

    let mut v = VirtualChar {
        name,
        rewrites: Vec::new(),
        sequence: None,
        swaps: Vec::new(),
    };

    for stmt in body.split(';') {
        let stmt = stmt.trim();
        if stmt.is_empty() {
            continue;
        }

        if let Some(rest) = stmt.strip_prefix("sequence:") {
            v.sequence = Some(parse_token_list(rest.trim()));
        } else if let Some(rest) = stmt.strip_prefix("swap:") {
            let mut words = rest.trim().split_whitespace();
            let side = match words.next() {
                Some("left") => Side::Left,
                Some("right") => Side::Right,
                other => {
                    return Err(ParseError::new(
                        line_no,
                        1,
                        "'left' or 'right'",
                        other.unwrap_or("nothing").to_string(),
                    ))
                }
            };
            let with = words
                .next()
                .map(parse_token_word)
                .ok_or_else(|| ParseError::new(line_no, 1, "swap partner token", "nothing".into()))?;
            v.swaps.push(Swap { side, with });
        } else if let Some((trigger, replacement)) = stmt.split_once("-->") {
            v.rewrites.push(Rewrite {
                trigger: parse_token_list(trigger.trim()),
                replacement: parse_token_list(replacement.trim()),
            });
        } else {
            return Err(ParseError::new(
                line_no,
                1,
                "a rewrite ('-->'), 'sequence:', or 'swap:' statement",
                stmt.to_string(),
            ));
        }
    }

    Ok(v)
}

fn parse_token_list(s: &str) -> Vec<Token> {
    s.split_whitespace().map(parse_token_word).collect()
}

fn parse_token_word(word: &str) -> Token {
    if word.len() >= 2 && word.starts_with('"') && word.ends_with('"') {
        return Token::literal(&word[1..word.len() - 1]);
    }
    match word {
        "^WS" => Token::Boundary(BoundaryKind::WordStart),
        "^WE" => Token::Boundary(BoundaryKind::WordEnd),
        "^LS" => Token::Boundary(BoundaryKind::LineStart),
        "^LE" => Token::Boundary(BoundaryKind::LineEnd),
        _ => Token::symbol(word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_char_lines_with_flags() {
        let source = "\\char 21 tinco\n\\char 20 comma punctuation\n";
        let charset = Charset::parse("test", source).unwrap();
        assert_eq!(charset.n_characters(), 2);
        let tinco = charset.get_character("tinco").unwrap();
        assert_eq!(tinco.font_code, 0x21);
        let comma = charset.get_character("comma").unwrap();
        assert!(comma.flags.contains(CharFlags::PUNCTUATION));
    }

    #[test]
    fn parses_virtual_with_rewrite_sequence_and_swap() {
        let source = r#"\virtual vtehta_a { "a" tinco --> tinco a_tehta; sequence: a_tehta; swap: left tinco }"#;
        let charset = Charset::parse("test", source).unwrap();
        assert!(charset.is_virtual("vtehta_a"));
        let v = charset.get_virtual("vtehta_a").unwrap();
        assert_eq!(v.rewrites.len(), 1);
        assert_eq!(v.rewrites[0].trigger, vec![Token::literal("a"), Token::symbol("tinco")]);
        assert_eq!(v.sequence, Some(vec![Token::symbol("a_tehta")]));
        assert_eq!(v.swaps.len(), 1);
        assert_eq!(v.swaps[0].side, Side::Left);
    }

    #[test]
    fn rejects_bad_hex_code() {
        let err = Charset::parse("test", "\\char zz tinco\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn rejects_unknown_directive() {
        let err = Charset::parse("test", "\\frobnicate x\n").unwrap_err();
        assert_eq!(err.line, 1);
    }
}
