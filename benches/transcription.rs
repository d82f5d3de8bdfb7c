use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glaemscribe::Mode;

const MODE_SOURCE: &str = r#"
\language qya
\writing tengwar
\charset tengwar-annatar
\preprocessor
\end
\processor
\rules consonants
t --> tinco;
c --> calma;
n --> numen;
l --> lambe;
r --> romen;
\end
\rules vowels
a --> a_tehta;
e --> e_tehta;
i --> i_tehta;
o --> o_tehta;
u --> u_tehta;
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

fn bench_transcribe(c: &mut Criterion) {
    let mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).expect("fixture mode must finalize");
    let mut group = c.benchmark_group("transcribe");

    for word_count in &[10, 100, 1000] {
        let text = "ai laurie lantar lassi surinen ".repeat(*word_count);
        group.bench_with_input(BenchmarkId::from_parameter(word_count), word_count, |b, _| {
            b.iter(|| mode.transcribe(black_box(&text)));
        });
    }
    group.finish();
}

fn bench_transcribe_batch(c: &mut Criterion) {
    let mode = Mode::from_source(MODE_SOURCE, CHARSET_SOURCE).expect("fixture mode must finalize");
    let mut group = c.benchmark_group("transcribe_batch");

    for batch_size in &[1, 10, 100] {
        let texts: Vec<String> = (0..*batch_size)
            .map(|i| format!("ai laurie number {i}"))
            .collect();
        let text_refs: Vec<&str> = texts.iter().map(std::string::String::as_str).collect();

        group.bench_with_input(BenchmarkId::from_parameter(batch_size), batch_size, |b, _| {
            b.iter(|| mode.transcribe_batch(black_box(&text_refs)));
        });
    }
    group.finish();
}

fn bench_from_source(c: &mut Criterion) {
    c.bench_function("mode_from_source", |b| {
        b.iter(|| Mode::from_source(black_box(MODE_SOURCE), black_box(CHARSET_SOURCE)));
    });
}

criterion_group!(benches, bench_transcribe, bench_transcribe_batch, bench_from_source);
criterion_main!(benches);
