//! Mode: the top-level aggregate a caller actually drives — one
//! preprocessor, one processor built from named rule groups, one
//! postprocessor chain, and the charset they all share (spec section 4.7).
//!
//! Finalization is kept separate from parsing (`from_source` parses, then
//! calls `finalize` once against the mode's own declared option defaults)
//! so a caller can later re-finalize the same `Mode` against a different
//! option override map, e.g. flipping on an archaic-spelling variant,
//! without re-parsing any source text.

use rayon::prelude::*;

use crate::charset::Charset;
use crate::debug::DebugRecord;
use crate::error::Error;
use crate::modefile::{self, ParsedMode};
use crate::options::{merge_with_defaults, OptionsMap};
use crate::postprocessor::PostProcessorChain;
use crate::preprocessor::Preprocessor;
use crate::processor::Processor;
use crate::rule_group::RuleGroup;
use crate::tree::TranscriptionTree;

/// The result of one `transcribe` call. Always returned, never an `Err`:
/// a mode that can't resolve every token still produces its best-effort
/// output, with the gaps recorded in `debug` (spec 4.7, section 7).
#[derive(Debug, Clone)]
pub struct TranscribeResult {
    /// `false` if any runtime warning was raised while producing `output`.
    pub ok: bool,
    pub output: String,
    pub debug: DebugRecord,
}

/// A fully assembled transliteration pipeline for one language/writing
/// system pairing.
#[derive(Debug)]
pub struct Mode {
    pub name: String,
    pub writing: String,
    charset: Charset,
    preprocessor: Preprocessor,
    rule_groups: Vec<RuleGroup>,
    option_defaults: OptionsMap,
    emit_boundaries: bool,
    processor: Option<Processor>,
    postprocessor: Option<PostProcessorChain>,
}

impl Mode {
    /// Parse a mode file and its companion charset file, then finalize
    /// against the mode's own declared option defaults so the returned
    /// `Mode` is immediately usable.
    pub fn from_source(mode_source: &str, charset_source: &str) -> Result<Mode, Error> {
        let parsed: ParsedMode = modefile::parse_mode_file(mode_source)?;

        let charset_name = parsed.charset_name.clone().unwrap_or_else(|| "charset".to_string());
        let charset = Charset::parse(charset_name, charset_source)?;

        let mut preprocessor = Preprocessor::new();
        for (pattern, replacement) in &parsed.preprocessor_pairs {
            preprocessor.add_substitution(pattern, replacement);
        }
        preprocessor.set_strip_accents(parsed.strip_accents);

        let mut rule_groups = Vec::with_capacity(parsed.rule_groups.len());
        for (name, body) in &parsed.rule_groups {
            let mut group = RuleGroup::new(name.clone());
            group.parse_body(body, 0)?;
            rule_groups.push(group);
        }

        let mut mode = Mode {
            name: parsed.language.unwrap_or_default(),
            writing: parsed.writing.unwrap_or_default(),
            charset,
            preprocessor,
            rule_groups,
            option_defaults: parsed.option_defaults,
            emit_boundaries: parsed.emit_boundaries,
            processor: None,
            postprocessor: None,
        };
        mode.finalize(&OptionsMap::new())?;
        Ok(mode)
    }

    /// Rebuild the processor and postprocessor from the mode's rule groups
    /// and charset, against `overrides` layered on top of the mode's own
    /// option defaults. Idempotent: always discards and rebuilds derived
    /// state rather than patching it, so calling this twice with the same
    /// arguments leaves the mode in the same state either time.
    pub fn finalize(&mut self, overrides: &OptionsMap) -> Result<(), Error> {
        let options = merge_with_defaults(&self.option_defaults, overrides);

        let mut errors = Vec::new();
        let mut groups: Vec<(String, TranscriptionTree)> = Vec::with_capacity(self.rule_groups.len());
        for group in &self.rule_groups {
            let (tree, group_errors) = group.finalize(&options);
            errors.extend(group_errors);
            groups.push((group.name.clone(), tree));
        }

        if !errors.is_empty() {
            return Err(Error::Finalize(errors));
        }

        let mut postprocessor = PostProcessorChain::standard(self.emit_boundaries);
        postprocessor.finalize(&self.charset);

        self.processor = Some(Processor::new(groups));
        self.postprocessor = Some(postprocessor);
        Ok(())
    }

    /// Run the full pipeline: preprocess, walk the processor, post-process.
    /// Never fails — a mode that hasn't been finalized yet (or failed to
    /// finalize) simply returns the input's preprocessed form untouched,
    /// with `ok = false`.
    pub fn transcribe(&self, text: &str) -> TranscribeResult {
        let mut debug = DebugRecord::new();
        let preprocessed = self.preprocessor.process(text);
        debug.preprocessed = preprocessed.clone();

        let (Some(processor), Some(postprocessor)) = (&self.processor, &self.postprocessor) else {
            return TranscribeResult {
                ok: false,
                output: String::new(),
                debug,
            };
        };

        let processed = processor.run(&preprocessed);
        debug.processed = processed.clone();

        let output = postprocessor.apply(processed, &self.charset, &mut debug);
        let ok = debug.warnings.is_empty();

        TranscribeResult { ok, output, debug }
    }

    /// Transcribe many inputs in parallel (spec 4.7 `transcribe_batch`),
    /// mirroring the teacher's `Tokenizer::encode_batch` use of `rayon`.
    pub fn transcribe_batch(&self, texts: &[&str]) -> Vec<TranscribeResult> {
        texts.par_iter().map(|text| self.transcribe(text)).collect()
    }

    pub fn is_finalized(&self) -> bool {
        self.processor.is_some()
    }

    pub fn charset(&self) -> &Charset {
        &self.charset
    }

    pub fn rule_group_names(&self) -> Vec<&str> {
        self.rule_groups.iter().map(|g| g.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODE_SOURCE: &str = r#"
\language qya
\writing tengwar
\charset tengwar-annatar
\preprocessor
\end
\processor
\rules consonants
t --> tinco;
\end
\end
\postprocessor
\end
"#;

    const CHARSET_SOURCE: &str = "\\char 21 tinco\n";

    #[test]
    fn from_source_builds_an_immediately_usable_mode() {
        let mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap();
        assert!(mode.is_finalized());
        assert_eq!(mode.rule_group_names(), vec!["consonants"]);
    }

    #[test]
    fn transcribe_maps_source_text_through_to_rendered_output() {
        let mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap();
        let result = mode.transcribe("t");
        assert!(result.ok);
        assert_eq!(result.output, char::from_u32(0xE000 + 0x21).unwrap().to_string());
    }

    #[test]
    fn transcribe_of_empty_input_yields_empty_output() {
        let mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap();
        let result = mode.transcribe("");
        assert!(result.ok);
        assert_eq!(result.output, "");
    }

    #[test]
    fn transcribe_batch_runs_every_input() {
        let mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap();
        let results = mode.transcribe_batch(&["t", "t t"]);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.ok));
    }

    #[test]
    fn unfinalized_mode_reports_not_ok_without_panicking() {
        let mut mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap();
        mode.processor = None;
        mode.postprocessor = None;
        let result = mode.transcribe("t");
        assert!(!result.ok);
        assert_eq!(result.output, "");
    }
}
