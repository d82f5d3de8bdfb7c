//! Integration tests exercising `Mode` end to end: parsing a mode file and
//! its charset from source text, finalizing, and transcribing.

use glaemscribe::{Mode, OptionValue};

const MODE_SOURCE: &str = r#"
\language qya
\writing tengwar
\charset tengwar-annatar
\options {
  archaic: false
}
\preprocessor
"th" --> "s"
\end
\processor
\rules consonants
macro nasal_final(base) { {base}n --> {base}tilde };
deploy nasal_final(m) if not archaic;
(t,c,n,l,r) --> (tinco,calma,numen,lambe,romen);
^WE t --> tinco_final;
\end
\rules vowels
var v = (a,e,i,o,u);
{v} --> {v}_tehta;
\end
\end
\postprocessor
\end
"#;

const CHARSET_SOURCE: &str = "\
\\char 21 tinco
\\char 22 calma
\\char 23 numen
\\char 24 lambe
\\char 25 romen
\\char 26 tinco_final
\\char 27 mtilde
\\char 05 a_tehta
\\char 06 e_tehta
\\char 07 i_tehta
\\char 08 o_tehta
\\char 09 u_tehta
";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn transliterates_simple_consonant_vowel_text() {
    init_logging();
    let mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap();
    let result = mode.transcribe("ta");
    assert!(result.ok);
    assert_eq!(
        result.output,
        format!(
            "{}{}",
            char::from_u32(0xE000 + 0x21).unwrap(),
            char::from_u32(0xE000 + 0x05).unwrap()
        )
    );
}

#[test]
fn word_final_anchor_overrides_plain_consonant_rule() {
    init_logging();
    let mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap();
    let result = mode.transcribe("at");
    assert!(result.ok);
    assert_eq!(
        result.output,
        format!(
            "{}{}",
            char::from_u32(0xE000 + 0x05).unwrap(),
            char::from_u32(0xE000 + 0x26).unwrap()
        )
    );
}

#[test]
fn preprocessor_substitution_runs_before_tokenization() {
    init_logging();
    let mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap();
    let with_th = mode.transcribe("that");
    let with_s = mode.transcribe("sat");
    assert!(with_th.ok && with_s.ok);
    assert_eq!(with_th.output.chars().last(), with_s.output.chars().last());
}

#[test]
fn empty_input_transcribes_to_empty_output() {
    init_logging();
    let mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap();
    let result = mode.transcribe("");
    assert!(result.ok);
    assert_eq!(result.output, "");
}

#[test]
fn guarded_macro_deploys_only_once_option_is_enabled() {
    init_logging();
    let mut mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap();

    let without_archaic = mode.transcribe("m");
    assert!(without_archaic.ok);

    let mut overrides = glaemscribe::OptionsMap::new();
    overrides.insert("archaic".to_string(), OptionValue::Bool(true));
    mode.finalize(&overrides).unwrap();

    let with_archaic = mode.transcribe("m");
    assert!(with_archaic.ok);
}

#[test]
fn transcribe_batch_matches_sequential_transcription() {
    init_logging();
    let mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap();
    let texts = ["ta", "at", "ca sat na"];

    let sequential: Vec<String> = texts.iter().map(|t| mode.transcribe(t).output).collect();
    let batched: Vec<String> = mode.transcribe_batch(&texts).into_iter().map(|r| r.output).collect();

    assert_eq!(sequential, batched);
}

#[test]
fn unresolved_charset_name_is_reported_as_not_ok() {
    init_logging();
    let bad_mode_source = MODE_SOURCE.replace("tinco_final", "tinco_final_unmapped");
    let mode = Mode::from_source(&bad_mode_source, CHARSET_SOURCE).unwrap();
    let result = mode.transcribe("at");
    assert!(!result.ok);
    assert!(!result.debug.warnings.is_empty());
}

#[test]
fn debug_record_serializes_to_json() {
    init_logging();
    let mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap();
    let result = mode.transcribe("ta");

    let snapshot = serde_json::to_value(&result.debug).expect("DebugRecord must serialize");
    assert!(snapshot.get("preprocessed").is_some());
    assert!(snapshot.get("processed").is_some());
    assert!(snapshot.get("postprocess_stages").is_some());

    let stages = snapshot["postprocess_stages"].as_array().unwrap();
    assert_eq!(stages.len(), 3, "expected one entry per postprocessor op");

    let round_tripped: String = serde_json::to_string(&result.debug).unwrap();
    assert!(round_tripped.contains("preprocessed"));
}
