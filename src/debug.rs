//! `DebugRecord`: the structured trace `Mode::transcribe` returns
//! alongside its output string (spec section 4.7).

use serde::Serialize;

use crate::error::RuntimeWarning;
use crate::token::Token;

/// Token sequence at each pipeline stage, plus every runtime warning
/// raised along the way. Never causes `transcribe` to fail (spec 4.7,
/// 7: "transcribe always returns a best-effort output").
#[derive(Debug, Clone, Default, Serialize)]
pub struct DebugRecord {
    pub preprocessed: Vec<Token>,
    pub processed: Vec<Token>,
    /// `(operator name, tokens after that operator ran)`, in chain order.
    pub postprocess_stages: Vec<(String, Vec<Token>)>,
    pub warnings: Vec<RuntimeWarning>,
}

impl DebugRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: RuntimeWarning) {
        self.warnings.push(warning);
    }

    pub fn record_stage(&mut self, name: impl Into<String>, tokens: &[Token]) {
        self.postprocess_stages.push((name.into(), tokens.to_vec()));
    }
}
