//! Rule compilation checked by looking strings up in the compiled rules.

use std::collections::BTreeSet;

use wfst::{FstError, ImplementationType, Symbol, SymbolPair, Transducer};
use wfst_rules::{
    RuleError, replace_down, replace_everywhere, replace_left, replace_right, replace_up, two_level_if,
    two_level_if_and_only_if, two_level_only_if,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn symbols(text: &str) -> Vec<Symbol> {
    text.chars().map(|c| Symbol::intern(&c.to_string())).collect()
}

fn identities(letters: &str) -> BTreeSet<SymbolPair> {
    symbols(letters).into_iter().map(|s| (s, s)).collect()
}

fn pair(input: &str, output: &str) -> SymbolPair {
    (Symbol::intern(input), Symbol::intern(output))
}

fn outputs(rule: &Transducer, input: &str) -> BTreeSet<String> {
    rule.lookup(&symbols(input), -1)
        .unwrap()
        .into_iter()
        .map(|p| p.output_string())
        .collect()
}

fn strings(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn context(left: &str, right: &str) -> (Transducer, Transducer) {
    (Transducer::fsa([left]), Transducer::fsa([right]))
}

#[test]
fn replace_up_between_contexts() {
    init_logging();
    let rule = replace_up(
        &context("c", "c"),
        &Transducer::fst([("aa", "bb")]),
        false,
        &identities("abc"),
    )
    .unwrap();
    assert_eq!(outputs(&rule, "caacac"), strings(&["cbbcac"]));
    assert_eq!(outputs(&rule, "aac"), strings(&["aac"]));
    assert_eq!(outputs(&rule, "cbc"), strings(&["cbc"]));
}

#[test]
fn optional_replace_keeps_the_original() {
    let rule = replace_up(
        &context("c", "c"),
        &Transducer::fst([("aa", "bb")]),
        true,
        &identities("abc"),
    )
    .unwrap();
    assert_eq!(outputs(&rule, "caacac"), strings(&["caacac", "cbbcac"]));
}

#[test]
fn upper_and_lower_contexts_differ() {
    let mapping = Transducer::fst([("a", "b")]);
    let ctx = context("b", "");
    let alphabet = identities("ab");

    // The second `a` follows an `a` above but a `b` below.
    let up = replace_up(&ctx, &mapping, false, &alphabet).unwrap();
    assert_eq!(outputs(&up, "baa"), strings(&["bba"]));

    let down = replace_down(&ctx, &mapping, false, &alphabet).unwrap();
    assert_eq!(outputs(&down, "baa"), strings(&["bbb"]));

    let left = replace_left(&ctx, &mapping, false, &alphabet).unwrap();
    assert_eq!(outputs(&left, "baa"), strings(&["bbb"]));
}

#[test]
fn replace_right_reads_the_right_context_below() {
    let mapping = Transducer::fst([("a", "b")]);
    let ctx = context("", "b");
    let alphabet = identities("ab");

    // Only the last `a` is followed by a `b` above; below, the rewritten
    // last `a` makes the first one qualify too.
    let up = replace_up(&ctx, &mapping, false, &alphabet).unwrap();
    assert_eq!(outputs(&up, "aab"), strings(&["abb"]));

    let right = replace_right(&ctx, &mapping, false, &alphabet).unwrap();
    assert_eq!(outputs(&right, "aab"), strings(&["bbb"]));
    assert_eq!(outputs(&right, "aa"), strings(&["aa"]));

    // The left context stays on the input side.
    let left_context = replace_right(&context("b", ""), &mapping, false, &alphabet).unwrap();
    assert_eq!(outputs(&left_context, "baa"), strings(&["bba"]));
}

#[test]
fn replace_everywhere_rewrites_each_match() {
    let rule = replace_everywhere(&Transducer::fst([("ab", "x")]), false, &identities("abx")).unwrap();
    assert_eq!(outputs(&rule, "abcab").len(), 0);
    assert_eq!(outputs(&rule, "abab"), strings(&["xx"]));
    assert_eq!(outputs(&rule, "aab"), strings(&["ax"]));
}

#[test]
fn context_must_be_an_automaton() {
    let not_automaton = (Transducer::fst([("c", "d")]), Transducer::fsa(["c"]));
    let result = replace_up(&not_automaton, &Transducer::fst([("a", "b")]), false, &identities("abcd"));
    assert!(matches!(result, Err(RuleError::ContextNotAutomata)));
}

#[test]
fn mapping_must_consume_input() {
    let result = replace_everywhere(&Transducer::fst([("", "x")]), false, &identities("ax"));
    assert!(matches!(result, Err(RuleError::EmptyMapping)));
}

#[test]
fn context_types_must_match_the_mapping() {
    let mut mapping = Transducer::fst([("a", "b")]);
    mapping.convert(ImplementationType::Tropical);
    let result = replace_up(&context("c", "c"), &mapping, false, &identities("abc"));
    assert!(matches!(result, Err(RuleError::Fst(FstError::TypeMismatch { .. }))));
}

fn two_level_alphabet() -> BTreeSet<SymbolPair> {
    let mut alphabet = identities("abc");
    alphabet.insert(pair("a", "b"));
    alphabet
}

fn a_to_b() -> BTreeSet<SymbolPair> {
    [pair("a", "b")].into_iter().collect()
}

#[test]
fn two_level_if_forces_the_mapping_in_context() {
    init_logging();
    let rule = two_level_if(&context("c", "c"), &a_to_b(), &two_level_alphabet()).unwrap();
    assert_eq!(outputs(&rule, "cac"), strings(&["cbc"]));
    assert_eq!(outputs(&rule, "ac"), strings(&["ac", "bc"]));
}

#[test]
fn two_level_only_if_restricts_the_mapping_to_context() {
    let rule = two_level_only_if(&context("c", "c"), &a_to_b(), &two_level_alphabet()).unwrap();
    assert_eq!(outputs(&rule, "cac"), strings(&["cac", "cbc"]));
    assert_eq!(outputs(&rule, "ac"), strings(&["ac"]));
}

#[test]
fn two_level_if_and_only_if_combines_both() {
    let rule = two_level_if_and_only_if(&context("c", "c"), &a_to_b(), &two_level_alphabet()).unwrap();
    assert_eq!(outputs(&rule, "cac"), strings(&["cbc"]));
    assert_eq!(outputs(&rule, "cab"), strings(&["cab"]));
    assert_eq!(outputs(&rule, "caac"), strings(&["caac"]));
}
