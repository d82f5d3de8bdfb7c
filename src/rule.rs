//! Rules: one authored `src --> dst` or `src ==> i0 i1 ...` line, expanded
//! into concrete `SubRule`s.
//!
//! `-->` pairs a source `SheafChain` against a destination `SheafChain` and
//! zips their enumerations (spec 4.2). `==>` is the cross form: instead of
//! authoring destination text, it names source positions by index and
//! reuses the matched source tokens at those positions for the
//! destination — used for metathesis-like reorderings where writing the
//! destination out longhand would just repeat the source alphabet.

use crate::error::FinalizeError;
use crate::fragment::{Sheaf, SheafChain, TokenizeMode};
use crate::token::{BoundaryKind, Token};
use crate::variable::VariableTable;

/// Context the `Processor` must find *around* a matched token sequence,
/// without consuming it. Distinct from a literal `Token::Boundary` inside
/// the sequence, which the trie walk does consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnchorFlags(u8);

impl AnchorFlags {
    pub const NONE: AnchorFlags = AnchorFlags(0);
    pub const WORD_START: AnchorFlags = AnchorFlags(1 << 0);
    pub const WORD_END: AnchorFlags = AnchorFlags(1 << 1);
    pub const LINE_START: AnchorFlags = AnchorFlags(1 << 2);
    pub const LINE_END: AnchorFlags = AnchorFlags(1 << 3);

    pub fn contains(self, other: AnchorFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: AnchorFlags) {
        self.0 |= other.0;
    }

    /// Number of set bits: used as the tie-break when two matches reach
    /// equal trie depth (stricter anchors win, see `tree.rs`).
    pub fn specificity(self) -> u32 {
        self.0.count_ones()
    }
}

fn anchor_for(kind: BoundaryKind) -> Option<AnchorFlags> {
    match kind {
        BoundaryKind::WordStart => Some(AnchorFlags::WORD_START),
        BoundaryKind::WordEnd => Some(AnchorFlags::WORD_END),
        BoundaryKind::LineStart => Some(AnchorFlags::LINE_START),
        BoundaryKind::LineEnd => Some(AnchorFlags::LINE_END),
    }
}

/// Strip leading/trailing `Boundary` tokens off a matched sequence, folding
/// them into anchor flags instead of match content.
fn split_anchors(tokens: Vec<Token>) -> (AnchorFlags, Vec<Token>) {
    let mut flags = AnchorFlags::NONE;
    let mut body = tokens;

    while let Some(Token::Boundary(kind)) = body.first() {
        if let Some(flag) = anchor_for(*kind) {
            flags.insert(flag);
        }
        body.remove(0);
    }
    while let Some(Token::Boundary(kind)) = body.last() {
        if let Some(flag) = anchor_for(*kind) {
            flags.insert(flag);
        }
        body.pop();
    }

    (flags, body)
}

/// One fully expanded, concrete transformation: match `src` (subject to
/// `anchors`), emit `dst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRule {
    pub anchors: AnchorFlags,
    pub src: Vec<Token>,
    pub dst: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RuleBody {
    Direct(SheafChain),
    Cross(Vec<usize>),
}

/// One authored rule line, not yet expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    src: SheafChain,
    body: RuleBody,
    line_no: usize,
}

impl Rule {
    /// Parse one rule-group statement line. `vars` has already been applied
    /// by the caller via `VariableTable::substitute`.
    pub fn parse(line: &str, line_no: usize) -> Result<Rule, crate::error::ParseError> {
        if let Some((src_text, schema_text)) = line.split_once("==>") {
            let src = SheafChain::parse(src_text.trim(), line_no, TokenizeMode::CharLevel)?;
            let schema = schema_text
                .split_whitespace()
                .map(|tok| {
                    tok.parse::<usize>().map_err(|_| {
                        crate::error::ParseError::new(
                            line_no,
                            1,
                            "a source-position index",
                            tok.to_string(),
                        )
                    })
                })
                .collect::<Result<Vec<usize>, _>>()?;
            return Ok(Rule {
                src,
                body: RuleBody::Cross(schema),
                line_no,
            });
        }

        let (src_text, dst_text) = line.split_once("-->").ok_or_else(|| {
            crate::error::ParseError::new(line_no, 1, "'-->' or '==>'", line.to_string())
        })?;
        let src = SheafChain::parse(src_text.trim(), line_no, TokenizeMode::CharLevel)?;
        let dst = SheafChain::parse(dst_text.trim(), line_no, TokenizeMode::WordLevel)?;
        Ok(Rule {
            src,
            body: RuleBody::Direct(dst),
            line_no,
        })
    }

    /// Apply variable substitution to both sides' raw text before parsing.
    /// Callers typically substitute the whole line before calling `parse`;
    /// this helper exists for call sites that build a `Rule` from
    /// already-split text (macro deployment, see `rule_group.rs`).
    pub fn substitute_and_parse(
        line: &str,
        line_no: usize,
        vars: &VariableTable,
    ) -> Result<Rule, crate::error::ParseError> {
        let substituted = vars
            .substitute(line)
            .map_err(|e| crate::error::ParseError::new(line_no, 1, "resolvable variable", e.to_string()))?;
        Rule::parse(&substituted, line_no)
    }

    /// Expand into concrete `SubRule`s, zipping or broadcasting src/dst
    /// enumerations per spec 4.2, or resolving a cross schema per combo.
    pub fn finalize(self) -> Result<Vec<SubRule>, FinalizeError> {
        let src_sheaves: Vec<Sheaf> = self.src.clone().finalize()?;
        let src_combos: Vec<Vec<Token>> = self.src.iter(&src_sheaves).collect();

        match self.body {
            RuleBody::Direct(dst_chain) => {
                let dst_sheaves = dst_chain.clone().finalize()?;
                let dst_combos: Vec<Vec<Token>> = dst_chain.iter(&dst_sheaves).collect();
                zip_or_broadcast(src_combos, dst_combos)
            }
            RuleBody::Cross(schema) => src_combos
                .into_iter()
                .map(|combo| {
                    let dst = schema
                        .iter()
                        .map(|&idx| {
                            idx.checked_sub(1)
                                .and_then(|zero_based| combo.get(zero_based))
                                .cloned()
                                .ok_or(FinalizeError::CrossIndexOutOfRange {
                                    index: idx,
                                    src_len: combo.len(),
                                })
                        })
                        .collect::<Result<Vec<Token>, _>>()?;
                    let (anchors, src) = split_anchors(combo);
                    Ok(SubRule { anchors, src, dst })
                })
                .collect(),
        }
    }

    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

fn zip_or_broadcast(
    src_combos: Vec<Vec<Token>>,
    dst_combos: Vec<Vec<Token>>,
) -> Result<Vec<SubRule>, FinalizeError> {
    let src_count = src_combos.len();
    let dst_count = dst_combos.len();

    let pairs: Vec<(Vec<Token>, Vec<Token>)> = if src_count == dst_count {
        src_combos.into_iter().zip(dst_combos).collect()
    } else if dst_count == 1 {
        let dst = dst_combos.into_iter().next().unwrap();
        src_combos.into_iter().map(|s| (s, dst.clone())).collect()
    } else if src_count == 1 {
        let src = src_combos.into_iter().next().unwrap();
        dst_combos.into_iter().map(|d| (src.clone(), d)).collect()
    } else {
        return Err(FinalizeError::SideCountMismatch { src_count, dst_count });
    };

    // Reaching here means one of the compatible branches above was taken.
    crate::invariants::assert_side_counts_compatible(src_count, dst_count);

    Ok(pairs
        .into_iter()
        .map(|(src, dst)| {
            let (anchors, src) = split_anchors(src);
            SubRule { anchors, src, dst }
        })
        .collect())
}
