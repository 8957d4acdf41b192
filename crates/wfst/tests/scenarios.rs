//! End-to-end scenarios: composition weights, word lists, weight pushing,
//! interchange round trips, harmonization and extraction bounds.

use std::collections::BTreeSet;

use wfst::harmonize::harmonize;
use wfst::io::{AttReadOptions, AttWriteOptions};
use wfst::{FstError, ImplementationType, PushType, Symbol, Transducer, Transition, TransitionGraph};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn weighted_arc(input: &str, output: &str, weight: f64) -> Transducer {
    let mut graph = TransitionGraph::new();
    graph.add_transition(0, Transition::from_strs(1, input, output, weight));
    graph.set_final_weight(1, 0.0);
    Transducer::from_graph(graph, ImplementationType::Tropical)
}

fn path_weights(t: &Transducer) -> Vec<(String, String, f64)> {
    t.extract_paths(-1, -1)
        .unwrap()
        .into_iter()
        .map(|p| (p.input_string(), p.output_string(), p.weight))
        .collect()
}

/// `[a::1 a:b::0.3 b::0]::0.7`
fn weighted_chain() -> Transducer {
    let mut graph = TransitionGraph::new();
    graph.add_transition(0, Transition::from_strs(1, "a", "a", 1.0));
    graph.add_transition(1, Transition::from_strs(2, "a", "b", 0.3));
    graph.add_transition(2, Transition::from_strs(3, "b", "b", 0.0));
    graph.set_final_weight(3, 0.7);
    Transducer::from_graph(graph, ImplementationType::Tropical)
}

fn sample_lexicon() -> Transducer {
    let mut graph = TransitionGraph::new();
    graph.add_transition(0, Transition::from_strs(1, "k", "k", 0.5));
    graph.add_transition(1, Transition::from_strs(2, "a", "a", 0.0));
    graph.add_transition(2, Transition::from_strs(3, "t", "t", 0.0));
    graph.add_transition(3, Transition::new(4, Symbol::EPSILON, Symbol::intern("+N"), 1.25));
    graph.add_transition(3, Transition::from_strs(4, " ", "+Sg", 2.0));
    graph.add_transition(1, Transition::from_strs(1, "a", "a", 3.0));
    graph.set_final_weight(4, 0.125);
    Transducer::from_graph(graph, ImplementationType::Tropical)
}

#[test]
fn composed_weights_add_up() {
    init_logging();
    let mut t = weighted_arc("a", "b", 2.0);
    t.compose(&weighted_arc("b", "c", 3.0)).unwrap();
    assert_eq!(path_weights(&t), vec![("a".into(), "c".into(), 5.0)]);
}

#[test]
fn word_list_equals_explicit_union() {
    let words = Transducer::fsa(["foobar", "foobaz"]);

    let mut graph = TransitionGraph::new();
    for (i, c) in ["f", "o", "o", "b", "a"].iter().enumerate() {
        graph.add_transition(i as u32, Transition::from_strs(i as u32 + 1, c, c, 0.0));
    }
    graph.add_transition(5, Transition::from_strs(6, "r", "r", 0.0));
    graph.add_transition(5, Transition::from_strs(6, "z", "z", 0.0));
    graph.set_final_weight(6, 0.0);
    let explicit = Transducer::from_graph(graph, ImplementationType::Unweighted);

    assert!(words.compare(&explicit).unwrap());
    assert!(!words.compare(&Transducer::fsa(["foobar"])).unwrap());
}

#[test]
fn pushing_conserves_path_weight() {
    for push in [PushType::ToFinal, PushType::ToInitial] {
        let mut t = weighted_chain();
        t.push_weights(push).unwrap();
        let paths = path_weights(&t);
        assert_eq!(paths.len(), 1);
        assert_eq!((paths[0].0.as_str(), paths[0].1.as_str()), ("aab", "abb"));
        assert!((paths[0].2 - 2.0).abs() < 1e-9, "{push:?}: {}", paths[0].2);
        assert!(t.compare(&weighted_chain()).unwrap());
    }
}

#[test]
fn push_to_initial_front_loads_weight() {
    let mut t = weighted_chain();
    t.push_weights(PushType::ToInitial).unwrap();
    let first = t.graph().transitions(0).unwrap()[0];
    assert!((first.weight - 2.0).abs() < 1e-9);
    assert!((t.final_weights()[0].1).abs() < 1e-9);
}

#[test]
fn text_round_trip() {
    let original = sample_lexicon();
    let mut text = Vec::new();
    original.write_att(&mut text, AttWriteOptions::default()).unwrap();
    let read = Transducer::read_att(text.as_slice(), AttReadOptions::default(), ImplementationType::Tropical).unwrap();
    assert_eq!(read.len(), 1);
    assert!(read[0].compare(&original).unwrap());
    assert_eq!(read[0].graph(), original.graph());
}

#[test]
fn binary_round_trip_of_a_stream() {
    let first = sample_lexicon();
    let second = weighted_chain();
    let mut buf = Vec::new();
    first.write_binary(&mut buf).unwrap();
    second.write_binary(&mut buf).unwrap();
    let read = Transducer::read_binary(&buf).unwrap();
    assert_eq!(read.len(), 2);
    assert!(read[0].compare(&first).unwrap());
    assert!(read[1].compare(&second).unwrap());
}

#[test]
fn binary_stream_rejects_mixed_types() {
    let mut buf = Vec::new();
    sample_lexicon().write_binary(&mut buf).unwrap();
    Transducer::fsa(["a"]).write_binary(&mut buf).unwrap();
    assert!(matches!(
        Transducer::read_binary(&buf),
        Err(FstError::TypeMismatch { .. })
    ));
}

#[test]
fn harmonization_keeps_original_relation() {
    // a:a or anything-to-itself, then b:c
    let mut a = TransitionGraph::new();
    a.add_transition(0, Transition::from_strs(1, "a", "a", 0.0));
    a.add_transition(0, Transition::new(1, Symbol::IDENTITY, Symbol::IDENTITY, 1.0));
    a.add_transition(1, Transition::from_strs(2, "b", "c", 0.0));
    a.add_transition(1, Transition::new(2, Symbol::UNKNOWN, Symbol::intern("c"), 2.0));
    a.set_final_weight(2, 0.0);

    let mut b = TransitionGraph::new();
    b.add_transition(0, Transition::from_strs(1, "x", "y", 0.0));
    b.set_final_weight(1, 0.0);

    let original_alphabet = a.alphabet().clone();
    let before: BTreeSet<_> = Transducer::from_graph(a.clone(), ImplementationType::Tropical)
        .extract_paths(-1, -1)
        .unwrap()
        .into_iter()
        .map(|p| (p.pairs, p.weight.to_bits()))
        .collect();

    let mut harmonized = a.clone();
    harmonize(&mut harmonized, &mut b);
    assert!(harmonized.transition_count() > a.transition_count());
    assert!(harmonized.alphabet().contains(&Symbol::intern("x")));

    let after: BTreeSet<_> = Transducer::from_graph(harmonized, ImplementationType::Tropical)
        .extract_paths(-1, -1)
        .unwrap()
        .into_iter()
        .filter(|p| {
            p.pairs
                .iter()
                .all(|(i, o)| original_alphabet.contains(i) && original_alphabet.contains(o))
        })
        .map(|p| (p.pairs, p.weight.to_bits()))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn cyclic_extraction_needs_a_bound() {
    let mut t = Transducer::fsa(["ab"]);
    t.repeat_plus();
    assert!(t.is_cyclic());
    assert!(matches!(t.extract_paths(-1, -1), Err(FstError::CyclicTransducer)));

    let once: BTreeSet<String> = t
        .extract_paths(-1, 1)
        .unwrap()
        .into_iter()
        .map(|p| p.input_string())
        .collect();
    assert!(once.contains("ab"));
    assert!(once.contains("abab"));
    assert!(!once.contains("ababab"));

    let three = t.extract_paths(3, -1).unwrap();
    assert_eq!(three.len(), 3);
}

#[test]
fn lookup_through_the_facade() {
    let mut t = Transducer::fst([("cat", "cat+N"), ("cats", "cat+N+Pl")]);
    t.minimize().unwrap();
    let input: Vec<Symbol> = "cats".chars().map(|c| Symbol::intern(&c.to_string())).collect();
    let found = t.lookup(&input, -1).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].output_string(), "cat+N+Pl");
    assert!(!t.is_lookup_infinitely_ambiguous(&input));
}
