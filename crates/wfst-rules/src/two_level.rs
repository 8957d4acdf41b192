//! Two-level constraints.
//!
//! A two-level rule is an automaton over symbol pairs. Its contexts are pair
//! automata too, so `c:c` in a context only matches a `c` that stays a `c`.
//! All three rules accept any string over `alphabet` (plus the mapping pairs)
//! that satisfies the constraint; compose or intersect them with a lexicon
//! to apply them.
//!
//! | rule                         | meaning                                   |
//! |------------------------------|-------------------------------------------|
//! | [`two_level_if`]             | in context, a mapped input must be mapped |
//! | [`two_level_only_if`]        | a mapping may only occur in context       |
//! | [`two_level_if_and_only_if`] | both                                      |

use std::collections::BTreeSet;

use wfst::algebra;
use wfst::{ImplementationType, SymbolPair, TransitionGraph};

use crate::context::{check_kinds, concat_all, into_rule, pair_set, universe};
use crate::{Context, RuleError};

struct Parts {
    kind: ImplementationType,
    universe: TransitionGraph,
    mapping: TransitionGraph,
    left: TransitionGraph,
    right: TransitionGraph,
}

fn parts(
    context: &Context,
    mappings: &BTreeSet<SymbolPair>,
    alphabet: &BTreeSet<SymbolPair>,
) -> Result<Parts, RuleError> {
    let kind = context.0.kind();
    check_kinds(context, kind)?;
    let all: BTreeSet<SymbolPair> = alphabet.union(mappings).copied().collect();
    Ok(Parts {
        kind,
        universe: universe(&all),
        mapping: pair_set(mappings),
        left: context.0.graph().clone(),
        right: context.1.graph().clone(),
    })
}

fn if_graph(
    p: &Parts,
    mappings: &BTreeSet<SymbolPair>,
    alphabet: &BTreeSet<SymbolPair>,
) -> Result<TransitionGraph, RuleError> {
    let inputs: BTreeSet<_> = mappings.iter().map(|&(input, _)| input).collect();
    let others: BTreeSet<SymbolPair> = alphabet
        .iter()
        .copied()
        .filter(|pair| inputs.contains(&pair.0) && !mappings.contains(pair))
        .collect();
    let center = pair_set(&others);
    let bad = concat_all(&[&p.universe, &p.left, &center, &p.right, &p.universe]);
    let rule = algebra::subtract(&p.universe, &bad)?;
    log::debug!("two_level_if: {} states", rule.state_count());
    Ok(rule)
}

fn only_if_graph(p: &Parts) -> Result<TransitionGraph, RuleError> {
    let ends_in_left = algebra::concatenate(&p.universe, &p.left);
    let not_left = algebra::subtract(&p.universe, &ends_in_left)?;
    let starts_with_right = algebra::concatenate(&p.right, &p.universe);
    let not_right = algebra::subtract(&p.universe, &starts_with_right)?;

    let bad_left = concat_all(&[&not_left, &p.mapping, &p.universe]);
    let bad_right = concat_all(&[&p.universe, &p.mapping, &not_right]);
    let rule = algebra::subtract(&p.universe, &algebra::disjunct(&bad_left, &bad_right))?;
    log::debug!("two_level_only_if: {} states", rule.state_count());
    Ok(rule)
}

fn finish(graph: TransitionGraph, kind: ImplementationType) -> Result<wfst::Transducer, RuleError> {
    Ok(into_rule(algebra::minimize(&graph)?, kind))
}

/// `mappings <= context`: wherever the context holds, an input that some
/// mapping rewrites may only be paired through one of `mappings`.
pub fn two_level_if(
    context: &Context,
    mappings: &BTreeSet<SymbolPair>,
    alphabet: &BTreeSet<SymbolPair>,
) -> Result<wfst::Transducer, RuleError> {
    let p = parts(context, mappings, alphabet)?;
    finish(if_graph(&p, mappings, alphabet)?, p.kind)
}

/// `mappings => context`: a pair of `mappings` is only allowed between the
/// left and the right context.
pub fn two_level_only_if(
    context: &Context,
    mappings: &BTreeSet<SymbolPair>,
    alphabet: &BTreeSet<SymbolPair>,
) -> Result<wfst::Transducer, RuleError> {
    let p = parts(context, mappings, alphabet)?;
    finish(only_if_graph(&p)?, p.kind)
}

/// `mappings <=> context`.
pub fn two_level_if_and_only_if(
    context: &Context,
    mappings: &BTreeSet<SymbolPair>,
    alphabet: &BTreeSet<SymbolPair>,
) -> Result<wfst::Transducer, RuleError> {
    let p = parts(context, mappings, alphabet)?;
    let both = algebra::intersect(&if_graph(&p, mappings, alphabet)?, &only_if_graph(&p)?)?;
    finish(both, p.kind)
}
