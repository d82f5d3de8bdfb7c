//! Macros: named, parameterized blocks of rule text.
//!
//! Deploying a macro is re-parse, not inlining: the macro's body text, with
//! its formal parameters substituted by the call's arguments, is appended
//! to the deploying `RuleGroup`'s pending raw rule text and re-parsed in
//! that scope (spec section 4 "Macro"). This keeps the parser as the single
//! place that turns rule text into `Rule`s — a deployed macro looks exactly
//! like hand-written rule text, it just arrived later.
//!
//! Deployment can itself deploy macros, so `MAX_MACRO_DEPTH` bounds the
//! recursion the same way `variable::MAX_VARIABLE_DEPTH` bounds variable
//! expansion.

use crate::error::FinalizeError;

pub const MAX_MACRO_DEPTH: usize = 16;

/// A named, parameterized chunk of raw rule text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    pub name: String,
    pub params: Vec<String>,
    pub body: String,
}

impl Macro {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params,
            body: body.into(),
        }
    }

    /// Substitute this macro's formal parameters with `args` inside its
    /// body, returning the raw text to append to the deploying scope.
    pub fn deploy(&self, args: &[String], depth: usize) -> Result<String, FinalizeError> {
        if depth >= MAX_MACRO_DEPTH {
            return Err(FinalizeError::MacroLoop {
                name: self.name.clone(),
                max_depth: MAX_MACRO_DEPTH,
            });
        }
        if args.len() != self.params.len() {
            return Err(FinalizeError::MacroArityMismatch {
                name: self.name.clone(),
                given: args.len(),
                expected: self.params.len(),
            });
        }

        let mut body = self.body.clone();
        for (param, arg) in self.params.iter().zip(args.iter()) {
            let placeholder = format!("{{{param}}}");
            body = body.replace(&placeholder, arg);
        }
        Ok(body)
    }
}

/// Scope-local registry of macros available for deployment.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: Vec<Macro>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self { macros: Vec::new() }
    }

    pub fn define(&mut self, m: Macro) {
        self.macros.push(m);
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.iter().find(|m| m.name == name)
    }

    /// Deploy a named macro, tracking recursion depth across nested
    /// deployments triggered by the appended text.
    pub fn deploy(&self, name: &str, args: &[String], depth: usize) -> Result<String, FinalizeError> {
        let m = self
            .get(name)
            .ok_or_else(|| FinalizeError::UnknownMacro(name.to_string()))?;
        m.deploy(args, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploys_with_parameter_substitution() {
        let m = Macro::new("nasal", vec!["base".to_string()], "{base}n --> {base}tilde");
        let out = m.deploy(&["m".to_string()], 0).unwrap();
        assert_eq!(out, "mn --> mtilde");
    }

    #[test]
    fn rejects_arity_mismatch() {
        let m = Macro::new("nasal", vec!["a".to_string(), "b".to_string()], "{a}{b}");
        let err = m.deploy(&["x".to_string()], 0).unwrap_err();
        assert!(matches!(err, FinalizeError::MacroArityMismatch { given: 1, expected: 2, .. }));
    }

    #[test]
    fn rejects_deployment_past_max_depth() {
        let m = Macro::new("id", vec![], "x");
        let err = m.deploy(&[], MAX_MACRO_DEPTH).unwrap_err();
        assert!(matches!(err, FinalizeError::MacroLoop { .. }));
    }

    #[test]
    fn unknown_macro_is_reported() {
        let table = MacroTable::new();
        let err = table.deploy("nope", &[], 0).unwrap_err();
        assert_eq!(err, FinalizeError::UnknownMacro("nope".to_string()));
    }
}
