//! Property-based tests for `Mode::transcribe` invariants (spec section 8).

use glaemscribe::Mode;
use proptest::prelude::*;

const MODE_SOURCE: &str = r#"
\language qya
\writing tengwar
\charset tengwar-annatar
\preprocessor
\end
\processor
\rules consonants
(t,c,n,l,r) --> (tinco,calma,numen,lambe,romen);
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
\\char 05 a_tehta
\\char 06 e_tehta
\\char 07 i_tehta
\\char 08 o_tehta
\\char 09 u_tehta
";

fn fixture_mode() -> Mode {
    Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: transcribe never panics on arbitrary Unicode text.
    #[test]
    fn transcribe_never_panics(text in "\\PC{0,200}") {
        let mode = fixture_mode();
        let _ = mode.transcribe(&text);
    }

    /// Property: transcribing the same text twice produces the same result
    /// (a finalized `Mode` is a pure function of its input text).
    #[test]
    fn transcribe_is_deterministic(text in "[a-z ]{0,100}") {
        let mode = fixture_mode();
        let first = mode.transcribe(&text);
        let second = mode.transcribe(&text);
        prop_assert_eq!(first.output, second.output);
        prop_assert_eq!(first.ok, second.ok);
    }

    /// Property: text built only from covered consonant/vowel letters and
    /// single spaces resolves with no runtime warnings.
    #[test]
    fn covered_alphabet_text_always_resolves_cleanly(text in "[tcnlraeiou ]{0,80}") {
        let mode = fixture_mode();
        let result = mode.transcribe(&text);
        prop_assert!(result.ok, "unexpected warnings for input {:?}: {:?}", text, result.debug.warnings);
    }

    /// Property: batch transcription of N copies of the same text yields N
    /// identical results, matching sequential transcription.
    #[test]
    fn batch_transcription_matches_sequential(text in "[a-z ]{0,60}", n in 1usize..8) {
        let mode = fixture_mode();
        let texts: Vec<&str> = std::iter::repeat(text.as_str()).take(n).collect();
        let batched = mode.transcribe_batch(&texts);
        let sequential: Vec<_> = texts.iter().map(|t| mode.transcribe(t)).collect();
        prop_assert_eq!(
            batched.iter().map(|r| r.output.clone()).collect::<Vec<_>>(),
            sequential.iter().map(|r| r.output.clone()).collect::<Vec<_>>()
        );
    }
}

#[test]
fn empty_text_has_no_special_case_bugs() {
    let mode = fixture_mode();
    let result = mode.transcribe("");
    assert!(result.ok);
    assert!(result.output.is_empty());
}
