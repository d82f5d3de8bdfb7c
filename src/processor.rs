//! Processor: walks an ordered list of `RuleGroup` tries over the
//! preprocessed token stream, replacing the longest matching source run at
//! each cursor with its destination tokens (spec section 4.5).
//!
//! Groups are consulted in declaration order; at a given cursor, the first
//! group with any accepting match there wins outright — a later group's
//! (possibly longer) match at that same cursor is never considered once an
//! earlier group has already matched (spec section 9 "group precedence is
//! first-match, not best-match across groups").

use crate::token::Token;
use crate::tree::{context_before, TranscriptionTree};

/// One named group's compiled trie, in the order its rules should be tried.
#[derive(Debug)]
pub struct Processor {
    groups: Vec<(String, TranscriptionTree)>,
}

impl Processor {
    pub fn new(groups: Vec<(String, TranscriptionTree)>) -> Self {
        Self { groups }
    }

    /// Walk `tokens` left to right. At each position, boundary tokens pass
    /// through unchanged (they carry no destination of their own, only
    /// anchor context for the trees); everything else is offered to each
    /// group's tree in turn, and the first accepting match advances the
    /// cursor by its matched length and emits its destination. A position
    /// with no match anywhere emits its own token literally and advances
    /// by one (spec 4.5 step 5, "unmatched tokens pass through unchanged").
    pub fn run(&self, tokens: &[Token]) -> Vec<Token> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;

        while i < tokens.len() {
            if matches!(tokens[i], Token::Boundary(_)) {
                out.push(tokens[i].clone());
                i += 1;
                continue;
            }

            let start_ctx = context_before(tokens, i);
            let mut matched = None;
            for (name, tree) in &self.groups {
                if let Some((len, dst)) = tree.deepest_match(tokens, i, start_ctx) {
                    log::trace!("group '{name}' matched {len} token(s) at position {i}");
                    matched = Some((len, dst));
                    break;
                }
            }

            match matched {
                Some((len, dst)) => {
                    out.extend(dst);
                    i += len;
                }
                None => {
                    out.push(tokens[i].clone());
                    i += 1;
                }
            }
        }

        out
    }
}
