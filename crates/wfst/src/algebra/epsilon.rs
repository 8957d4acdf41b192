use std::collections::VecDeque;

use hashbrown::HashMap;
use wfst_core::weight::{self, Weight};
use wfst_core::{FstError, StateId, Symbol};

use crate::graph::{Transition, TransitionGraph};
use crate::topology;

/// Remove every epsilon:epsilon transition.
///
/// Each state takes over the non-epsilon transitions and final weights of its
/// epsilon closure, with the closure distance added. Parallel transitions with
/// the same label and target are merged, keeping the smaller weight.
pub fn remove_epsilons(graph: &TransitionGraph) -> Result<TransitionGraph, FstError> {
    if !graph.iter_transitions().any(|(_, t)| t.is_epsilon()) {
        return Ok(graph.clone());
    }
    let mut result = TransitionGraph::new().with_alphabet_of(graph);
    result.ensure_state(graph.state_count() as StateId - 1);

    for state in graph.states() {
        let closure = epsilon_closure(graph, state)?;
        let mut final_weight = weight::ZERO;
        let mut merged: HashMap<(StateId, Symbol, Symbol), usize> = HashMap::new();
        let mut arcs: Vec<Transition> = Vec::new();
        for &(reached, distance) in &closure {
            final_weight = weight::plus(
                final_weight,
                weight::times(distance, graph.final_or_zero(reached)),
            );
            for t in graph.arcs(reached).iter().filter(|t| !t.is_epsilon()) {
                let w = weight::times(distance, t.weight);
                match merged.get(&(t.target, t.input, t.output)) {
                    Some(&i) => arcs[i].weight = weight::plus(arcs[i].weight, w),
                    None => {
                        merged.insert((t.target, t.input, t.output), arcs.len());
                        arcs.push(Transition { weight: w, ..*t });
                    }
                }
            }
        }
        if !weight::is_zero(final_weight) {
            result.set_final_weight(state, final_weight);
        }
        *result.arcs_mut(state) = arcs;
    }
    topology::connect(&mut result);
    log::debug!(
        "remove_epsilons: {} -> {} states",
        graph.state_count(),
        result.state_count()
    );
    Ok(result)
}

/// States reachable from `state` over epsilon:epsilon transitions, with the
/// best distance to each, `state` itself included at distance one.
pub(crate) fn epsilon_closure(
    graph: &TransitionGraph,
    state: StateId,
) -> Result<Vec<(StateId, Weight)>, FstError> {
    let mut distance: HashMap<StateId, Weight> = HashMap::new();
    let mut relaxations: HashMap<StateId, usize> = HashMap::new();
    let mut queue = VecDeque::new();
    distance.insert(state, weight::ONE);
    queue.push_back(state);
    let limit = graph.state_count() + 1;

    while let Some(current) = queue.pop_front() {
        let here = distance[&current];
        for t in graph.arcs(current).iter().filter(|t| t.is_epsilon()) {
            let candidate = weight::times(here, t.weight);
            let known = distance.get(&t.target).copied().unwrap_or(weight::ZERO);
            if candidate < known && !weight::approx_eq(candidate, known, weight::DELTA) {
                let count = relaxations.entry(t.target).or_insert(0);
                *count += 1;
                if *count > limit {
                    return Err(FstError::Fatal(format!(
                        "negative-weight epsilon cycle reachable from state {state}"
                    )));
                }
                distance.insert(t.target, candidate);
                queue.push_back(t.target);
            }
        }
    }
    let mut closure: Vec<(StateId, Weight)> = distance.into_iter().collect();
    closure.sort_unstable_by_key(|&(s, _)| s);
    Ok(closure)
}
