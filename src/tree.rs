//! TranscriptionTree: a trie keyed by source tokens, the structure the
//! `Processor` walks for longest-match transcription (spec section 4.5).
//!
//! Edges are keyed by `Token` via a `HashMap` rather than a fixed-size
//! array, because the source alphabet is open-ended (any charset symbol
//! name or literal scalar an author writes), unlike the teacher's
//! byte/char-indexed structures (`bpe.rs`, `sentencepiece.rs`). Anchors
//! never appear as trie edges: `Rule::finalize` strips leading/trailing
//! boundary tokens into `AnchorFlags` before a `SubRule` ever reaches here
//! (`rule.rs::split_anchors`), so every edge in this trie is either a
//! `Token::Literal` or a `Token::Symbol`.

use std::collections::HashMap;

use crate::rule::{AnchorFlags, SubRule};
use crate::token::{BoundaryKind, Token};

/// One accepting value at a trie node: the destination to emit, the
/// anchor constraints that must hold around the match, and the rule's
/// authoring-order priority for the last-write-wins tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Accept {
    anchors: AnchorFlags,
    dst: Vec<Token>,
    priority: usize,
}

#[derive(Debug, Clone, Default)]
struct Node {
    children: HashMap<Token, Node>,
    accepts: Vec<Accept>,
}

/// A trie over source token sequences. Each distinct `(src, anchors)` pair
/// installed carries exactly one destination — re-inserting the same pair
/// overwrites it (spec section 3 "Invariants" / section 9 "Rule shadowing
/// order": authoring order is the contract, last write wins).
#[derive(Debug, Clone, Default)]
pub struct TranscriptionTree {
    root: Node,
    len: usize,
}

impl TranscriptionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct `(src, anchors)` rules currently installed.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Install one `SubRule`. `priority` should be non-decreasing across
    /// calls within a `RuleGroup` so that, among accepts tied on anchor
    /// specificity, the later call wins (spec 4.5 step 4).
    pub fn insert(&mut self, subrule: SubRule, priority: usize) {
        let mut node = &mut self.root;
        for token in &subrule.src {
            node = node.children.entry(token.clone()).or_default();
        }

        if let Some(existing) = node
            .accepts
            .iter_mut()
            .find(|a| a.anchors == subrule.anchors)
        {
            existing.dst = subrule.dst;
            existing.priority = priority;
        } else {
            node.accepts.push(Accept {
                anchors: subrule.anchors,
                dst: subrule.dst,
                priority,
            });
            self.len += 1;
        }
    }

    /// Walk from `start`, tracking the deepest accepting node whose
    /// anchors are satisfied by the boundary context around the match.
    /// Returns `(matched_length, destination_tokens)`.
    pub fn deepest_match(
        &self,
        tokens: &[Token],
        start: usize,
        start_ctx: AnchorFlags,
    ) -> Option<(usize, Vec<Token>)> {
        let mut node = &self.root;
        let mut i = start;
        let mut best: Option<(usize, &Accept)> = None;

        loop {
            let depth = i - start;
            if depth > 0 {
                let end_ctx = context_after(tokens, i);
                for accept in &node.accepts {
                    if !anchors_satisfied(accept.anchors, start_ctx, end_ctx) {
                        continue;
                    }
                    let replace = match best {
                        None => true,
                        Some((best_depth, best_accept)) => {
                            depth > best_depth
                                || (depth == best_depth
                                    && rank(accept) > rank(best_accept))
                        }
                    };
                    if replace {
                        best = Some((depth, accept));
                    }
                }
            }

            if i >= tokens.len() {
                break;
            }
            match node.children.get(&tokens[i]) {
                Some(next) => {
                    node = next;
                    i += 1;
                }
                None => break,
            }
        }

        best.map(|(depth, accept)| (depth, accept.dst.clone()))
    }
}

fn rank(accept: &Accept) -> (u32, usize) {
    (accept.anchors.specificity(), accept.priority)
}

fn boundary_anchor(token: &Token) -> Option<AnchorFlags> {
    match token {
        Token::Boundary(BoundaryKind::WordStart) => Some(AnchorFlags::WORD_START),
        Token::Boundary(BoundaryKind::WordEnd) => Some(AnchorFlags::WORD_END),
        Token::Boundary(BoundaryKind::LineStart) => Some(AnchorFlags::LINE_START),
        Token::Boundary(BoundaryKind::LineEnd) => Some(AnchorFlags::LINE_END),
        _ => None,
    }
}

/// Anchor context satisfied immediately before `i`: the boundary token at
/// `i - 1`, or start-of-word/start-of-line if `i` is the very first
/// position (spec 4.5 step 1).
pub fn context_before(tokens: &[Token], i: usize) -> AnchorFlags {
    if i == 0 {
        let mut flags = AnchorFlags::NONE;
        flags.insert(AnchorFlags::WORD_START);
        flags.insert(AnchorFlags::LINE_START);
        return flags;
    }
    boundary_anchor(&tokens[i - 1]).unwrap_or(AnchorFlags::NONE)
}

/// Anchor context satisfied immediately at/after `i`: the boundary token
/// at `i`, or end-of-word/end-of-line if `i` is past the last position.
fn context_after(tokens: &[Token], i: usize) -> AnchorFlags {
    if i >= tokens.len() {
        let mut flags = AnchorFlags::NONE;
        flags.insert(AnchorFlags::WORD_END);
        flags.insert(AnchorFlags::LINE_END);
        return flags;
    }
    boundary_anchor(&tokens[i]).unwrap_or(AnchorFlags::NONE)
}

fn anchors_satisfied(required: AnchorFlags, start_ctx: AnchorFlags, end_ctx: AnchorFlags) -> bool {
    (!required.contains(AnchorFlags::WORD_START) || start_ctx.contains(AnchorFlags::WORD_START))
        && (!required.contains(AnchorFlags::LINE_START) || start_ctx.contains(AnchorFlags::LINE_START))
        && (!required.contains(AnchorFlags::WORD_END) || end_ctx.contains(AnchorFlags::WORD_END))
        && (!required.contains(AnchorFlags::LINE_END) || end_ctx.contains(AnchorFlags::LINE_END))
}
