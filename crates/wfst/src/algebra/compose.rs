// Composition.
//
// Result states are (a, b, filter). The filter forbids the redundant
// interleavings of epsilon moves: after B has moved alone on an input
// epsilon, A may not move alone until a joint step has happened. Without it
// every pair of epsilon moves would yield two result paths.
//
// Unknown and identity labels match each other when A's output and B's input
// both stand for "a symbol neither alphabet knows"; an ordinary symbol never
// matches them.

use std::collections::{BTreeMap, VecDeque};

use hashbrown::HashMap;
use wfst_core::weight;
use wfst_core::{FstError, StateId, Symbol, SymbolPair};

use super::{determinize, epsilon, transform};
use crate::graph::{INITIAL_STATE, Transition, TransitionGraph};

type ComposeState = (StateId, StateId, u8);

fn is_wildcard(s: Symbol) -> bool {
    s.is_unknown() || s.is_identity()
}

/// Labels produced by a joint move of `a` and `b`.
fn joint_labels(a: &Transition, b: &Transition, out: &mut Vec<SymbolPair>) {
    let (mid_a, mid_b) = (a.output, b.input);
    if mid_a.is_epsilon() || mid_b.is_epsilon() {
        return;
    }
    match (is_wildcard(mid_a), is_wildcard(mid_b)) {
        (false, false) => {
            if mid_a == mid_b {
                out.push((a.input, b.output));
            }
        }
        (true, true) => {
            let a_identity = a.input.is_identity() && mid_a.is_identity();
            let b_identity = mid_b.is_identity() && b.output.is_identity();
            match (a_identity, b_identity) {
                (true, true) => out.push((Symbol::IDENTITY, Symbol::IDENTITY)),
                // z:y where z is the unseen symbol
                (true, false) => out.push((Symbol::UNKNOWN, b.output)),
                (false, true) => out.push((a.input, Symbol::UNKNOWN)),
                (false, false) => {
                    out.push((a.input, b.output));
                    // u1 -> z -> u2 with u1 == u2 is possible too
                    if a.input.is_unknown() && b.output.is_unknown() {
                        out.push((Symbol::IDENTITY, Symbol::IDENTITY));
                    }
                }
            }
        }
        _ => {}
    }
}

/// Compose `a` with `b`: x:z is in the result when x:y is in `a` and y:z is
/// in `b`, with weight the best sum over all such y.
pub fn compose(a: &TransitionGraph, b: &TransitionGraph) -> Result<TransitionGraph, FstError> {
    let mut result = TransitionGraph::new().with_alphabet_of(a).with_alphabet_of(b);
    let mut ids: HashMap<ComposeState, StateId> = HashMap::new();
    let mut worklist: VecDeque<ComposeState> = VecDeque::new();
    let start = (INITIAL_STATE, INITIAL_STATE, 0u8);
    ids.insert(start, INITIAL_STATE);
    worklist.push_back(start);

    let mut labels = Vec::new();
    while let Some(current) = worklist.pop_front() {
        let (sa, sb, filter) = current;
        let source = ids[&current];

        if a.is_final_state(sa) && b.is_final_state(sb) {
            result.set_final_weight(
                source,
                weight::times(a.final_or_zero(sa), b.final_or_zero(sb)),
            );
        }

        let mut emit = |next: ComposeState, input: Symbol, output: Symbol, w: f64,
                        result: &mut TransitionGraph| {
            let len = ids.len() as StateId;
            let target = *ids.entry(next).or_insert_with(|| {
                worklist.push_back(next);
                len
            });
            result.add_transition_with(source, Transition::new(target, input, output, w), false);
        };

        for ta in a.arcs(sa) {
            // A moves alone on an output epsilon.
            if ta.output.is_epsilon() {
                if filter == 0 {
                    emit((ta.target, sb, 0), ta.input, Symbol::EPSILON, ta.weight, &mut result);
                }
                continue;
            }
            for tb in b.arcs(sb) {
                labels.clear();
                joint_labels(ta, tb, &mut labels);
                for &(input, output) in &labels {
                    emit(
                        (ta.target, tb.target, 0),
                        input,
                        output,
                        weight::times(ta.weight, tb.weight),
                        &mut result,
                    );
                }
            }
        }
        // B moves alone on an input epsilon.
        for tb in b.arcs(sb).iter().filter(|t| t.input.is_epsilon()) {
            emit((sa, tb.target, 1), Symbol::EPSILON, tb.output, tb.weight, &mut result);
        }
    }
    result.ensure_state(ids.len() as StateId - 1);
    crate::topology::connect(&mut result);
    log::debug!(
        "compose: {} x {} -> {} states",
        a.state_count(),
        b.state_count(),
        result.state_count()
    );
    Ok(result)
}

/// Compose `a` with the intersection of `rules` without building the
/// intersection.
///
/// With `invert` set the intersection is composed with `a` instead, so `a`
/// then constrains the output side of the rules. Rules are made
/// epsilon-free and deterministic before the product.
pub fn compose_intersect(
    a: &TransitionGraph,
    rules: &[TransitionGraph],
    invert: bool,
) -> Result<TransitionGraph, FstError> {
    if invert {
        let inverted: Vec<TransitionGraph> = rules.iter().map(transform::invert).collect();
        let result = compose_intersect(&transform::invert(a), &inverted, false)?;
        return Ok(transform::invert(&result));
    }
    if rules.is_empty() {
        return Ok(a.clone());
    }

    let mut prepared = Vec::with_capacity(rules.len());
    for rule in rules {
        if determinize::is_deterministic(rule) {
            prepared.push(rule.clone());
        } else {
            prepared.push(determinize(&epsilon::remove_epsilons(rule)?)?);
        }
    }
    let rule_arcs: Vec<Vec<BTreeMap<SymbolPair, (StateId, f64)>>> = prepared
        .iter()
        .map(|r| {
            r.states()
                .map(|s| r.arcs(s).iter().map(|t| (t.pair(), (t.target, t.weight))).collect())
                .collect()
        })
        .collect();

    let mut result = TransitionGraph::new().with_alphabet_of(a);
    for r in &prepared {
        result = result.with_alphabet_of(r);
    }

    type Key = (StateId, Vec<StateId>, u8);
    let mut ids: HashMap<Key, StateId> = HashMap::new();
    let mut worklist: VecDeque<Key> = VecDeque::new();
    let start: Key = (INITIAL_STATE, vec![INITIAL_STATE; prepared.len()], 0);
    ids.insert(start.clone(), INITIAL_STATE);
    worklist.push_back(start);

    // Every rule agrees on `pair`: their joint next states and added weight.
    let agree = |states: &[StateId], pair: SymbolPair| -> Option<(Vec<StateId>, f64)> {
        let mut next = Vec::with_capacity(states.len());
        let mut w = weight::ONE;
        for (i, &s) in states.iter().enumerate() {
            let &(target, tw) = rule_arcs[i][s as usize].get(&pair)?;
            next.push(target);
            w = weight::times(w, tw);
        }
        Some((next, w))
    };

    while let Some(current) = worklist.pop_front() {
        let source = ids[&current];
        let (sa, ref rs, filter) = current;

        if a.is_final_state(sa) && rs.iter().zip(&prepared).all(|(&s, r)| r.is_final_state(s)) {
            let w = rs
                .iter()
                .zip(&prepared)
                .fold(a.final_or_zero(sa), |acc, (&s, r)| weight::times(acc, r.final_or_zero(s)));
            result.set_final_weight(source, w);
        }

        let mut moves: Vec<(Key, Transition)> = Vec::new();
        for ta in a.arcs(sa) {
            if ta.output.is_epsilon() {
                if filter == 0 {
                    moves.push((
                        (ta.target, rs.clone(), 0),
                        Transition::new(0, ta.input, Symbol::EPSILON, ta.weight),
                    ));
                }
                continue;
            }
            for (&(x, y), _) in rule_arcs[0][rs[0] as usize].iter().filter(|(p, _)| p.0 == ta.output) {
                if let Some((next, w)) = agree(rs, (x, y)) {
                    moves.push((
                        (ta.target, next, 0),
                        Transition::new(0, ta.input, y, weight::times(ta.weight, w)),
                    ));
                }
            }
        }
        for (&(x, y), _) in rule_arcs[0][rs[0] as usize].iter().filter(|(p, _)| p.0.is_epsilon()) {
            if let Some((next, w)) = agree(rs, (x, y)) {
                moves.push(((sa, next, 1), Transition::new(0, Symbol::EPSILON, y, w)));
            }
        }

        for (key, mut t) in moves {
            let len = ids.len() as StateId;
            t.target = *ids.entry(key.clone()).or_insert_with(|| {
                worklist.push_back(key);
                len
            });
            result.add_transition_with(source, t, false);
        }
    }
    result.ensure_state(ids.len() as StateId - 1);
    crate::topology::connect(&mut result);
    log::debug!(
        "compose_intersect: {} rules -> {} states",
        rules.len(),
        result.state_count()
    );
    Ok(result)
}
