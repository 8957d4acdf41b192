use std::collections::VecDeque;

use hashbrown::HashMap;
use wfst_core::weight;
use wfst_core::{FstError, StateId, Symbol};

use super::epsilon;
use crate::graph::{INITIAL_STATE, Transition, TransitionGraph};

/// Swap the input and output side of every transition.
pub fn invert(graph: &TransitionGraph) -> TransitionGraph {
    let mut result = graph.clone();
    result.for_each_transition_mut(|_, t| std::mem::swap(&mut t.input, &mut t.output));
    result
}

/// Projected symbol: an unknown symbol on one side of a pair becomes the
/// identity symbol once both sides are the same.
fn project(s: Symbol) -> Symbol {
    if s.is_unknown() { Symbol::IDENTITY } else { s }
}

/// Keep only the input side.
pub fn input_project(graph: &TransitionGraph) -> TransitionGraph {
    let mut result = graph.clone();
    result.for_each_transition_mut(|_, t| {
        t.input = project(t.input);
        t.output = t.input;
    });
    result
}

/// Keep only the output side.
pub fn output_project(graph: &TransitionGraph) -> TransitionGraph {
    let mut result = graph.clone();
    result.for_each_transition_mut(|_, t| {
        t.output = project(t.output);
        t.input = t.output;
    });
    result
}

/// Reverse every path. The result has a fresh initial state taking over the
/// final weights; the old initial state becomes the only final state.
pub fn reverse(graph: &TransitionGraph) -> TransitionGraph {
    let mut reversed = TransitionGraph::new().with_alphabet_of(graph);
    reversed.ensure_state(graph.state_count() as StateId);
    for (source, t) in graph.iter_transitions() {
        reversed.add_transition_with(t.target + 1, Transition { target: source + 1, ..*t }, false);
    }
    reversed.set_final_weight(INITIAL_STATE + 1, weight::ONE);

    let mut start_final = weight::ZERO;
    let mut start_arcs = Vec::new();
    for (state, w) in graph.final_states() {
        if state == INITIAL_STATE {
            start_final = weight::plus(start_final, w);
        }
        start_arcs.extend(reversed.arcs(state + 1).iter().map(|t| Transition {
            weight: weight::times(w, t.weight),
            ..*t
        }));
    }
    reversed.arcs_mut(INITIAL_STATE).extend(start_arcs);
    if !weight::is_zero(start_final) {
        reversed.set_final_weight(INITIAL_STATE, start_final);
    }
    crate::topology::connect(&mut reversed);
    reversed
}

fn require_automaton(graph: &TransitionGraph, operation: &'static str) -> Result<(), FstError> {
    if graph.is_automaton() {
        Ok(())
    } else {
        Err(FstError::NotAutomata(operation))
    }
}

/// Pair every string of `a` with every string of `b`, padding the shorter one
/// with trailing epsilons. Both operands must be automata.
pub fn cross_product(a: &TransitionGraph, b: &TransitionGraph) -> Result<TransitionGraph, FstError> {
    require_automaton(a, "cross_product")?;
    require_automaton(b, "cross_product")?;
    let a = epsilon::remove_epsilons(a)?;
    let b = epsilon::remove_epsilons(b)?;

    // None marks a side that has already ended.
    type Key = (Option<StateId>, Option<StateId>);
    let mut result = TransitionGraph::new().with_alphabet_of(&a).with_alphabet_of(&b);
    let mut ids: HashMap<Key, StateId> = HashMap::new();
    let mut worklist: VecDeque<Key> = VecDeque::new();
    let start: Key = (Some(INITIAL_STATE), Some(INITIAL_STATE));
    ids.insert(start, INITIAL_STATE);
    worklist.push_back(start);

    while let Some(key) = worklist.pop_front() {
        let source = ids[&key];
        let mut moves: Vec<(Key, Symbol, Symbol, f64)> = Vec::new();
        match key {
            (Some(sa), Some(sb)) => {
                if a.is_final_state(sa) && b.is_final_state(sb) {
                    result.set_final_weight(
                        source,
                        weight::times(a.final_or_zero(sa), b.final_or_zero(sb)),
                    );
                }
                for ta in a.arcs(sa) {
                    for tb in b.arcs(sb) {
                        moves.push((
                            (Some(ta.target), Some(tb.target)),
                            ta.input,
                            tb.input,
                            weight::times(ta.weight, tb.weight),
                        ));
                    }
                }
                if let Ok(fa) = a.final_weight(sa) {
                    for tb in b.arcs(sb) {
                        moves.push((
                            (None, Some(tb.target)),
                            Symbol::EPSILON,
                            tb.input,
                            weight::times(fa, tb.weight),
                        ));
                    }
                }
                if let Ok(fb) = b.final_weight(sb) {
                    for ta in a.arcs(sa) {
                        moves.push((
                            (Some(ta.target), None),
                            ta.input,
                            Symbol::EPSILON,
                            weight::times(fb, ta.weight),
                        ));
                    }
                }
            }
            (None, Some(sb)) => {
                if let Ok(fb) = b.final_weight(sb) {
                    result.set_final_weight(source, fb);
                }
                for tb in b.arcs(sb) {
                    moves.push(((None, Some(tb.target)), Symbol::EPSILON, tb.input, tb.weight));
                }
            }
            (Some(sa), None) => {
                if let Ok(fa) = a.final_weight(sa) {
                    result.set_final_weight(source, fa);
                }
                for ta in a.arcs(sa) {
                    moves.push(((Some(ta.target), None), ta.input, Symbol::EPSILON, ta.weight));
                }
            }
            (None, None) => {}
        }
        for (next, input, output, w) in moves {
            let len = ids.len() as StateId;
            let target = *ids.entry(next).or_insert_with(|| {
                worklist.push_back(next);
                len
            });
            result.add_transition_with(source, Transition::new(target, input, output, w), false);
        }
    }
    result.ensure_state(ids.len() as StateId - 1);
    crate::topology::connect(&mut result);
    Ok(result)
}

/// Every interleaving of a string of `a` with a string of `b`. Both operands
/// must be automata.
pub fn shuffle(a: &TransitionGraph, b: &TransitionGraph) -> Result<TransitionGraph, FstError> {
    require_automaton(a, "shuffle")?;
    require_automaton(b, "shuffle")?;
    let mut result = TransitionGraph::new().with_alphabet_of(a).with_alphabet_of(b);
    let mut ids: HashMap<(StateId, StateId), StateId> = HashMap::new();
    let mut worklist = VecDeque::new();
    ids.insert((INITIAL_STATE, INITIAL_STATE), INITIAL_STATE);
    worklist.push_back((INITIAL_STATE, INITIAL_STATE));

    while let Some((sa, sb)) = worklist.pop_front() {
        let source = ids[&(sa, sb)];
        if a.is_final_state(sa) && b.is_final_state(sb) {
            result.set_final_weight(source, weight::times(a.final_or_zero(sa), b.final_or_zero(sb)));
        }
        let moves = a
            .arcs(sa)
            .iter()
            .map(|t| ((t.target, sb), t))
            .chain(b.arcs(sb).iter().map(|t| ((sa, t.target), t)));
        for (next, t) in moves {
            let len = ids.len() as StateId;
            let target = *ids.entry(next).or_insert_with(|| {
                worklist.push_back(next);
                len
            });
            result.add_transition_with(source, Transition { target, ..*t }, false);
        }
    }
    result.ensure_state(ids.len() as StateId - 1);
    crate::topology::connect(&mut result);
    Ok(result)
}
