// Criterion benchmarks for the wfst algebra.
//
// The inputs are synthetic word lists, so no data files are needed.
//
// Run:
//   cargo bench -p wfst

use criterion::{Criterion, criterion_group, criterion_main};
use wfst::{ImplementationType, Transducer, Transition, TransitionGraph};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Deterministic pseudo-words over a small alphabet.
fn word_list(count: usize) -> Vec<String> {
    let letters = ['a', 'e', 'i', 'k', 'l', 'n', 's', 't'];
    let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
    (0..count)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let len = 3 + (seed % 6) as usize;
            (0..len)
                .map(|i| letters[((seed >> (i * 3)) % letters.len() as u64) as usize])
                .collect()
        })
        .collect()
}

/// Maps every letter to its upper-case form with a small weight.
fn upcase() -> Transducer {
    let mut graph = TransitionGraph::new();
    for c in ['a', 'e', 'i', 'k', 'l', 'n', 's', 't'] {
        let upper = c.to_ascii_uppercase().to_string();
        graph.add_transition(0, Transition::from_strs(0, &c.to_string(), &upper, 0.5));
    }
    graph.set_final_weight(0, 0.0);
    Transducer::from_graph(graph, ImplementationType::Tropical)
}

fn lexicon(count: usize) -> Transducer {
    let mut t = Transducer::fsa(word_list(count));
    t.convert(ImplementationType::Tropical);
    t
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_determinize(c: &mut Criterion) {
    let mut union = lexicon(500);
    union.disjunct(&lexicon(300)).ok();
    c.bench_function("determinize_800_words", |b| {
        b.iter(|| {
            let mut t = union.clone();
            std::hint::black_box(t.determinize().map(|t| t.state_count()).ok());
        });
    });
}

fn bench_minimize(c: &mut Criterion) {
    let words = lexicon(1000);
    c.bench_function("minimize_1000_words", |b| {
        b.iter(|| {
            let mut t = words.clone();
            std::hint::black_box(t.minimize().map(|t| t.state_count()).ok());
        });
    });
}

fn bench_compose(c: &mut Criterion) {
    let words = lexicon(500);
    let rule = upcase();
    c.bench_function("compose_500_words_upcase", |b| {
        b.iter(|| {
            let mut t = words.clone();
            std::hint::black_box(t.compose(&rule).map(|t| t.state_count()).ok());
        });
    });
}

fn bench_extract(c: &mut Criterion) {
    let mut words = lexicon(500);
    words.minimize().ok();
    c.bench_function("extract_500_words", |b| {
        b.iter(|| std::hint::black_box(words.extract_paths(-1, -1).map(|p| p.len()).ok()));
    });
}

criterion_group!(benches, bench_determinize, bench_minimize, bench_compose, bench_extract);
criterion_main!(benches);
