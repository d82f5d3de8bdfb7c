//! Runtime invariant assertions for the transliteration pipeline.
//!
//! This module provides debug-mode assertions that verify pipeline
//! invariants at runtime. These checks help catch bugs during development
//! and testing without impacting release performance.
//!
//! # Invariants Enforced
//!
//! 1. **Fragment arity**: every combination enumerated from a `Fragment`
//!    has the same length as its siblings.
//! 2. **Rule side counts**: a finalized rule's source and destination
//!    combination counts either match exactly or one side broadcasts.
//! 3. **Charset resolution**: no `Token::Symbol` survives `ResolveCharsets`
//!    pointing at a name absent from both the real and virtual tables.
//! 4. **Virtual resolution**: no virtual-typed token survives both
//!    `ResolveVirtuals` passes.
//!
//! # Usage
//!
//! These assertions are only active in debug builds (`debug_assertions`).
//! In release builds, they compile to no-ops for zero overhead.
//!
//! ```ignore
//! use glaemscribe::invariants;
//!
//! invariants::assert_fragment_arity(&combinations);
//! ```

use crate::charset::Charset;
use crate::token::Token;

/// Asserts that every combination in a fragment's enumeration has the
/// same length.
///
/// # Panics
///
/// Panics in debug builds if any two combinations differ in length.
#[inline]
pub fn assert_fragment_arity(combinations: &[Vec<Token>]) {
    #[cfg(debug_assertions)]
    {
        if let Some(first) = combinations.first() {
            let expected = first.len();
            for (i, combo) in combinations.iter().enumerate() {
                debug_assert!(
                    combo.len() == expected,
                    "Invariant violation: combination[{i}] has arity {} but combination[0] has arity {expected}",
                    combo.len()
                );
            }
        }
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = combinations;
    }
}

/// Asserts that a finalized rule's source and destination combination
/// counts are compatible: equal, or one side is a singleton broadcast
/// over the other.
///
/// # Panics
///
/// Panics in debug builds if neither condition holds.
#[inline]
pub fn assert_side_counts_compatible(src_count: usize, dst_count: usize) {
    #[cfg(debug_assertions)]
    {
        debug_assert!(
            src_count == dst_count || src_count == 1 || dst_count == 1,
            "Invariant violation: {src_count} source combination(s) cannot zip or broadcast against {dst_count} destination combination(s)"
        );
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = (src_count, dst_count);
    }
}

/// Asserts that no `Token::Symbol` in the stream names something absent
/// from both the charset's real characters and its virtuals.
///
/// **Important**: call this only after `ResolveCharsets` has already
/// recorded any unknown names as `RuntimeWarning`s — this assertion exists
/// to catch the invariant being violated silently, not as a substitute for
/// that warning path.
///
/// # Panics
///
/// Panics in debug builds if an unresolved symbol is found.
#[inline]
pub fn assert_all_symbols_known(tokens: &[Token], charset: &Charset) {
    #[cfg(debug_assertions)]
    {
        for (i, token) in tokens.iter().enumerate() {
            if let Token::Symbol(name) = token {
                debug_assert!(
                    charset.contains(name),
                    "Invariant violation: token[{i}] names '{name}', absent from charset '{}'",
                    charset.name
                );
            }
        }
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = (tokens, charset);
    }
}

/// Asserts that no token surviving both `ResolveVirtuals` passes still
/// names a virtual character. By the time this runs, every virtual should
/// have either matched a trigger (pass 1), expanded its sequence or swap
/// (pass 2), or been dropped with a warning.
///
/// # Panics
///
/// Panics in debug builds if a virtual-named token remains.
#[inline]
pub fn assert_no_virtuals_remain(tokens: &[Token], charset: &Charset) {
    #[cfg(debug_assertions)]
    {
        for (i, token) in tokens.iter().enumerate() {
            if let Token::Symbol(name) = token {
                debug_assert!(
                    !charset.is_virtual(name),
                    "Invariant violation: token[{i}] is still virtual ('{name}') after both resolution passes"
                );
            }
        }
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = (tokens, charset);
    }
}
