//! The option map threaded through `finalize` (spec section 6 `\options`,
//! section 4.3 "macro deployment is conditional on option predicates").

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

impl OptionValue {
    /// Truthiness used by a bare `if <name>` macro guard: a `Bool` is
    /// itself, a non-empty `Str` is true (mirrors shell-style truthiness
    /// rather than requiring callers to spell out `== "true"`).
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Bool(b) => *b,
            OptionValue::Str(s) => !s.is_empty(),
        }
    }
}

pub type OptionsMap = HashMap<String, OptionValue>;

/// Build an options map from the mode file's declared defaults, then
/// overlay the caller's overrides (spec 4.7 `finalize(options)`).
pub fn merge_with_defaults(defaults: &OptionsMap, overrides: &OptionsMap) -> OptionsMap {
    let mut merged = defaults.clone();
    for (name, value) in overrides {
        merged.insert(name.clone(), value.clone());
    }
    merged
}
