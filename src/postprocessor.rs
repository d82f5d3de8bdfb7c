//! PostProcessor chain: the fixed three-operator pipeline of spec section
//! 4.6 that turns a processor's token stream into a Unicode string.
//!
//! `PostProcessorOp` is finalized once per `Charset` and then applied in
//! declaration order. The teacher crate has no analogous chain-of-
//! operators stage (its pipeline is a single tokenizer implementation
//! chosen by model type, `lib.rs::Tokenizer::from_gguf_file`), so the
//! shape here is grounded instead on how `vocab.rs` separates "owns the
//! data" (`Charset`) from "operates read-only against it"
//! (`PostProcessorOp::apply` borrows `&Charset`, never mutates it).

use crate::charset::{Charset, Side};
use crate::debug::DebugRecord;
use crate::error::RuntimeWarning;
use crate::token::{BoundaryKind, Token};

/// Lower bound of the BMP Private Use Area (spec section 6).
pub const PUA_BMP_START: u32 = 0xE000;
/// Upper bound of the BMP Private Use Area.
pub const PUA_BMP_END: u32 = 0xF8FF;
/// Start of the supplementary PUA plane, for font codes that don't fit
/// in the BMP range.
pub const PUA_SUPPLEMENTARY_START: u32 = 0xE0000;

const PUA_BMP_SPAN: u32 = PUA_BMP_END - PUA_BMP_START + 1;

/// One stage of the postprocessor chain. `Send + Sync` so a `Mode` can be
/// shared across `rayon`'s batch transcription threads (spec 4.7
/// `transcribe_batch`).
pub trait PostProcessorOp: std::fmt::Debug + Send + Sync {
    /// Operator name, recorded in the `DebugRecord` stage trace.
    fn name(&self) -> &'static str;

    /// Resolve anything the operator needs from the charset once, before
    /// any `apply` call (spec 4.6: "each finalized once against the
    /// charset").
    fn finalize(&mut self, charset: &Charset);

    fn apply(&self, tokens: Vec<Token>, charset: &Charset, debug: &mut DebugRecord) -> Vec<Token>;
}

/// Ordered operator pipeline, fixed at construction to the spec 4.6 order
/// (`ResolveCharsets`, `ResolveVirtuals`, `Emit`) unless the caller builds
/// a custom chain for testing.
#[derive(Debug, Default)]
pub struct PostProcessorChain {
    ops: Vec<Box<dyn PostProcessorOp>>,
}

impl PostProcessorChain {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// The standard chain spec 4.6 fixes.
    pub fn standard(emit_boundaries: bool) -> Self {
        let mut chain = Self::new();
        chain.push(Box::new(ResolveCharsets));
        chain.push(Box::new(ResolveVirtuals));
        chain.push(Box::new(Emit { emit_boundaries }));
        chain
    }

    pub fn push(&mut self, op: Box<dyn PostProcessorOp>) {
        self.ops.push(op);
    }

    pub fn finalize(&mut self, charset: &Charset) {
        for op in &mut self.ops {
            op.finalize(charset);
        }
    }

    /// Run every operator in order, recording the token stream after each
    /// stage into `debug` (spec 4.7 debug record).
    pub fn apply(&self, mut tokens: Vec<Token>, charset: &Charset, debug: &mut DebugRecord) -> String {
        for op in &self.ops {
            tokens = op.apply(tokens, charset, debug);
            debug.record_stage(op.name(), &tokens);
        }
        render(&tokens)
    }
}

/// Validate every `Symbol` token against the charset. A token's own
/// representation does not change here — `Token` carries names, not
/// pointers into the charset (spec section 9, "Charset ownership") — this
/// stage only reports names that resolve against neither a real character
/// nor a virtual.
#[derive(Debug, Default)]
pub struct ResolveCharsets;

impl PostProcessorOp for ResolveCharsets {
    fn name(&self) -> &'static str {
        "resolve_charsets"
    }

    fn finalize(&mut self, _charset: &Charset) {}

    fn apply(&self, tokens: Vec<Token>, charset: &Charset, debug: &mut DebugRecord) -> Vec<Token> {
        for token in &tokens {
            if let Token::Symbol(name) = token {
                if !charset.contains(name) {
                    debug.warn(RuntimeWarning::UnknownCharsetName(name.clone()));
                }
            }
        }
        crate::invariants::assert_all_symbols_known(&tokens, charset);
        tokens
    }
}

/// Two-pass virtual-character resolution (spec 4.6).
#[derive(Debug, Default)]
pub struct ResolveVirtuals;

impl PostProcessorOp for ResolveVirtuals {
    fn name(&self) -> &'static str {
        "resolve_virtuals"
    }

    fn finalize(&mut self, _charset: &Charset) {}

    fn apply(&self, tokens: Vec<Token>, charset: &Charset, debug: &mut DebugRecord) -> Vec<Token> {
        let after_triggers = resolve_triggers(tokens, charset);
        resolve_sequences_and_swaps(after_triggers, charset, debug)
    }
}

/// Pass 1: scan left-to-right. At each virtual symbol, try its rewrites
/// in declaration order against the tokens immediately following it; the
/// first trigger that matches replaces the virtual plus the matched
/// window in-place, and the scan resumes past the replacement. A virtual
/// with no matching trigger is left in the stream for pass 2.
fn resolve_triggers(tokens: Vec<Token>, charset: &Charset) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;

    'scan: while i < tokens.len() {
        if let Token::Symbol(name) = &tokens[i] {
            if let Some(v) = charset.get_virtual(name) {
                for rewrite in &v.rewrites {
                    let window = rewrite.trigger.len();
                    if i + 1 + window <= tokens.len() && tokens[i + 1..i + 1 + window] == rewrite.trigger[..] {
                        out.extend(rewrite.replacement.iter().cloned());
                        i += 1 + window;
                        continue 'scan;
                    }
                }
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }

    out
}

/// Pass 2: every virtual surviving pass 1 gets its unconditional
/// `sequence` expansion, or, absent one, its first applicable `swap`; a
/// virtual with neither is an authoring error for this charset and is
/// dropped with a `RuntimeWarning` (spec 4.6, 8 invariant 6).
fn resolve_sequences_and_swaps(tokens: Vec<Token>, charset: &Charset, debug: &mut DebugRecord) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        let Token::Symbol(name) = token else {
            out.push(token.clone());
            i += 1;
            continue;
        };
        let Some(v) = charset.get_virtual(name) else {
            out.push(token.clone());
            i += 1;
            continue;
        };

        if let Some(sequence) = &v.sequence {
            out.extend(sequence.iter().cloned());
            i += 1;
            continue;
        }

        if let Some(swap) = v.swaps.first() {
            match swap.side {
                Side::Left if out.last() == Some(&swap.with) => {
                    let prev = out.pop().unwrap();
                    out.push(token.clone());
                    out.push(prev);
                    i += 1;
                    continue;
                }
                Side::Right if tokens.get(i + 1) == Some(&swap.with) => {
                    out.push(tokens[i + 1].clone());
                    out.push(token.clone());
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }

        debug.warn(RuntimeWarning::VirtualUnresolved(name.clone()));
        i += 1;
    }

    // Every path above either rewrote, expanded, swapped, or dropped-with-warning
    // a virtual; nothing virtual should have reached `out`.
    crate::invariants::assert_no_virtuals_remain(&out, charset);
    out
}

/// Map characters to code points (Unicode when the charset declares one,
/// else a PUA fallback derived from the font code) and boundary tokens to
/// whitespace, or drop them, per `emit_boundaries`.
#[derive(Debug)]
pub struct Emit {
    pub emit_boundaries: bool,
}

impl PostProcessorOp for Emit {
    fn name(&self) -> &'static str {
        "emit"
    }

    fn finalize(&mut self, _charset: &Charset) {}

    fn apply(&self, tokens: Vec<Token>, charset: &Charset, debug: &mut DebugRecord) -> Vec<Token> {
        tokens
            .into_iter()
            .map(|token| match &token {
                Token::Symbol(name) => match charset.get_character(name) {
                    Some(character) => Token::literal(code_point_text(character.code_point, character.font_code)),
                    None => {
                        if !charset.is_virtual(name) {
                            debug.warn(RuntimeWarning::UnresolvedToken(name.clone()));
                        }
                        token
                    }
                },
                Token::Boundary(kind) if !self.emit_boundaries => Token::Boundary(*kind),
                _ => token,
            })
            .collect()
    }
}

fn code_point_text(code_point: Option<char>, font_code: u32) -> String {
    let c = code_point.unwrap_or_else(|| fallback_code_point(font_code));
    c.to_string()
}

fn fallback_code_point(font_code: u32) -> char {
    let scalar = if font_code < PUA_BMP_SPAN {
        PUA_BMP_START + font_code
    } else {
        PUA_SUPPLEMENTARY_START + (font_code - PUA_BMP_SPAN)
    };
    char::from_u32(scalar).unwrap_or('\u{FFFD}')
}

/// Render a fully post-processed token stream to a plain string: literals
/// concatenate directly, a run of `WordEnd`/`WordStart` boundaries
/// collapses to a single space, `LineEnd`/`LineStart` to a newline, and
/// leading/trailing boundaries produce no output (spec 8: empty input ->
/// empty output).
fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut pending_space = false;
    let mut pending_newline = false;

    for token in tokens {
        match token {
            Token::Boundary(BoundaryKind::WordStart) | Token::Boundary(BoundaryKind::WordEnd) => {
                pending_space = true;
            }
            Token::Boundary(BoundaryKind::LineStart) | Token::Boundary(BoundaryKind::LineEnd) => {
                pending_newline = true;
            }
            Token::Literal(s) => {
                flush_separator(&mut out, &mut pending_space, &mut pending_newline);
                out.push_str(s);
            }
            Token::Symbol(_) => {
                flush_separator(&mut out, &mut pending_space, &mut pending_newline);
            }
        }
    }

    out
}

fn flush_separator(out: &mut String, pending_space: &mut bool, pending_newline: &mut bool) {
    if out.is_empty() {
        *pending_space = false;
        *pending_newline = false;
        return;
    }
    if *pending_newline {
        out.push('\n');
    } else if *pending_space {
        out.push(' ');
    }
    *pending_space = false;
    *pending_newline = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::{Character, Rewrite, Swap, VirtualChar};

    fn test_charset() -> Charset {
        let mut charset = Charset::new("test");
        charset.add_character(Character {
            name: "tinco".to_string(),
            font_code: 0x21,
            code_point: None,
            flags: Default::default(),
        });
        charset.add_character(Character {
            name: "a_tehta".to_string(),
            font_code: 0x05,
            code_point: None,
            flags: Default::default(),
        });
        charset
    }

    #[test]
    fn emit_maps_font_code_into_bmp_pua() {
        let charset = test_charset();
        let op = Emit { emit_boundaries: false };
        let mut debug = DebugRecord::new();
        let out = op.apply(vec![Token::symbol("tinco")], &charset, &mut debug);
        assert_eq!(out, vec![Token::literal(char::from_u32(0xE000 + 0x21).unwrap().to_string())]);
    }

    #[test]
    fn unresolved_symbol_is_warned_and_preserved() {
        let charset = test_charset();
        let op = Emit { emit_boundaries: false };
        let mut debug = DebugRecord::new();
        let out = op.apply(vec![Token::symbol("nope")], &charset, &mut debug);
        assert_eq!(out, vec![Token::symbol("nope")]);
        assert_eq!(debug.warnings.len(), 1);
    }

    #[test]
    fn resolve_virtuals_applies_trigger_then_drops_nothing() {
        let mut charset = test_charset();
        charset.add_virtual(VirtualChar {
            name: "vtehta_a".to_string(),
            rewrites: vec![Rewrite {
                trigger: vec![Token::symbol("tinco")],
                replacement: vec![Token::symbol("tinco"), Token::symbol("a_tehta")],
            }],
            sequence: None,
            swaps: vec![],
        });
        let mut debug = DebugRecord::new();
        let tokens = vec![Token::symbol("vtehta_a"), Token::symbol("tinco")];
        let out = ResolveVirtuals.apply(tokens, &charset, &mut debug);
        assert_eq!(out, vec![Token::symbol("tinco"), Token::symbol("a_tehta")]);
        assert!(debug.warnings.is_empty());
    }

    #[test]
    fn resolve_virtuals_falls_back_to_sequence_in_pass_two() {
        let mut charset = test_charset();
        charset.add_virtual(VirtualChar {
            name: "vtehta_a".to_string(),
            rewrites: vec![Rewrite {
                trigger: vec![Token::symbol("calma")],
                replacement: vec![Token::symbol("calma"), Token::symbol("a_tehta")],
            }],
            sequence: Some(vec![Token::symbol("a_tehta")]),
            swaps: vec![],
        });
        let mut debug = DebugRecord::new();
        let tokens = vec![Token::symbol("tinco"), Token::symbol("vtehta_a")];
        let out = ResolveVirtuals.apply(tokens, &charset, &mut debug);
        assert_eq!(out, vec![Token::symbol("tinco"), Token::symbol("a_tehta")]);
        assert!(debug.warnings.is_empty());
    }

    #[test]
    fn resolve_virtuals_applies_left_swap() {
        let mut charset = test_charset();
        charset.add_virtual(VirtualChar {
            name: "vtehta_a".to_string(),
            rewrites: vec![],
            sequence: None,
            swaps: vec![Swap {
                side: Side::Left,
                with: Token::symbol("tinco"),
            }],
        });
        let mut debug = DebugRecord::new();
        let tokens = vec![Token::symbol("tinco"), Token::symbol("vtehta_a")];
        let out = ResolveVirtuals.apply(tokens, &charset, &mut debug);
        assert_eq!(out, vec![Token::symbol("vtehta_a"), Token::symbol("tinco")]);
    }

    #[test]
    fn resolve_virtuals_warns_and_drops_when_unresolvable() {
        let mut charset = test_charset();
        charset.add_virtual(VirtualChar {
            name: "broken".to_string(),
            rewrites: vec![],
            sequence: None,
            swaps: vec![],
        });
        let mut debug = DebugRecord::new();
        let out = ResolveVirtuals.apply(vec![Token::symbol("broken")], &charset, &mut debug);
        assert!(out.is_empty());
        assert_eq!(debug.warnings, vec![RuntimeWarning::VirtualUnresolved("broken".to_string())]);
    }

    #[test]
    fn render_collapses_boundaries_and_trims_edges() {
        let tokens = vec![
            Token::Boundary(BoundaryKind::LineStart),
            Token::Boundary(BoundaryKind::WordStart),
            Token::literal("x"),
            Token::Boundary(BoundaryKind::WordEnd),
            Token::Boundary(BoundaryKind::WordStart),
            Token::literal("y"),
            Token::Boundary(BoundaryKind::WordEnd),
            Token::Boundary(BoundaryKind::LineEnd),
        ];
        assert_eq!(render(&tokens), "x y");
    }

    #[test]
    fn render_of_empty_token_stream_is_empty() {
        let tokens = vec![Token::Boundary(BoundaryKind::LineStart), Token::Boundary(BoundaryKind::LineEnd)];
        assert_eq!(render(&tokens), "");
    }
}
