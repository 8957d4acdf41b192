// Rational operations: union, concatenation and closures.
//
// All constructions graft copies of the initial state's transitions instead
// of adding epsilon transitions, so an epsilon-free operand gives an
// epsilon-free result.

use wfst_core::weight;
use wfst_core::StateId;

use crate::graph::{INITIAL_STATE, Transition, TransitionGraph};

/// The graph accepting only the empty string, with weight one.
pub fn epsilon_graph() -> TransitionGraph {
    let mut g = TransitionGraph::new();
    g.set_final_weight(INITIAL_STATE, weight::ONE);
    g
}

/// Copy the transitions leaving `from` (offset by `offset`) onto `state`,
/// adding `extra` to each weight.
fn graft(
    result: &mut TransitionGraph,
    state: StateId,
    source: &TransitionGraph,
    from: StateId,
    offset: StateId,
    extra: f64,
) {
    let arcs: Vec<Transition> = source
        .arcs(from)
        .iter()
        .map(|t| Transition {
            target: t.target + offset,
            weight: weight::times(extra, t.weight),
            ..*t
        })
        .collect();
    result.arcs_mut(state).extend(arcs);
}

/// Union of `a` and `b`.
pub fn disjunct(a: &TransitionGraph, b: &TransitionGraph) -> TransitionGraph {
    let mut result = TransitionGraph::new();
    let offset_a = result.append_graph(a);
    let offset_b = result.append_graph(b);
    graft(&mut result, INITIAL_STATE, a, INITIAL_STATE, offset_a, weight::ONE);
    graft(&mut result, INITIAL_STATE, b, INITIAL_STATE, offset_b, weight::ONE);
    let start_final = weight::plus(a.final_or_zero(INITIAL_STATE), b.final_or_zero(INITIAL_STATE));
    if !weight::is_zero(start_final) {
        result.set_final_weight(INITIAL_STATE, start_final);
    }
    crate::topology::connect(&mut result);
    result
}

/// Concatenation of `a` followed by `b`.
pub fn concatenate(a: &TransitionGraph, b: &TransitionGraph) -> TransitionGraph {
    let mut result = a.clone();
    let offset = result.append_graph(b);
    let b_start_final = b.final_or_zero(INITIAL_STATE);
    let finals: Vec<(StateId, f64)> = a.final_states().collect();
    for (state, w) in finals {
        graft(&mut result, state, b, INITIAL_STATE, offset, w);
        if weight::is_zero(b_start_final) {
            result.clear_final(state);
        } else {
            result.set_final_weight(state, weight::times(w, b_start_final));
        }
    }
    crate::topology::connect(&mut result);
    result
}

/// Kleene plus: one or more repetitions.
pub fn repeat_plus(a: &TransitionGraph) -> TransitionGraph {
    // State 0 is a fresh entry state; the copy of a's initial state keeps
    // its own incoming transitions.
    let mut result = TransitionGraph::new();
    let offset = result.append_graph(a);
    graft(&mut result, INITIAL_STATE, a, INITIAL_STATE, offset, weight::ONE);
    if let Ok(w) = a.final_weight(INITIAL_STATE) {
        result.set_final_weight(INITIAL_STATE, w);
    }
    let finals: Vec<(StateId, f64)> = a.final_states().collect();
    for (state, w) in finals {
        graft(&mut result, state + offset, a, INITIAL_STATE, offset, w);
    }
    crate::topology::connect(&mut result);
    result
}

/// Kleene star: zero or more repetitions.
pub fn repeat_star(a: &TransitionGraph) -> TransitionGraph {
    let mut result = repeat_plus(a);
    let start = weight::plus(result.final_or_zero(INITIAL_STATE), weight::ONE);
    result.set_final_weight(INITIAL_STATE, start);
    result
}

/// Exactly `n` repetitions.
pub fn repeat_n(a: &TransitionGraph, n: usize) -> TransitionGraph {
    let mut result = epsilon_graph().with_alphabet_of(a);
    for _ in 0..n {
        result = concatenate(&result, a);
    }
    result
}

/// At most `n` repetitions.
pub fn repeat_n_minus(a: &TransitionGraph, n: usize) -> TransitionGraph {
    repeat_n_to_k(a, 0, n)
}

/// At least `n` repetitions.
pub fn repeat_n_plus(a: &TransitionGraph, n: usize) -> TransitionGraph {
    concatenate(&repeat_n(a, n), &repeat_star(a))
}

/// From `n` to `k` repetitions, inclusive. Empty when `k < n`.
pub fn repeat_n_to_k(a: &TransitionGraph, n: usize, k: usize) -> TransitionGraph {
    let mut result = TransitionGraph::new().with_alphabet_of(a);
    let mut power = repeat_n(a, n);
    for i in n..=k {
        if i > n {
            power = concatenate(&power, a);
        }
        result = disjunct(&result, &power);
    }
    result
}

/// Zero or one occurrence.
pub fn optionalize(a: &TransitionGraph) -> TransitionGraph {
    disjunct(a, &epsilon_graph())
}
