// Weight pushing over the tropical semiring.
//
// A potential function d reweights every transition s -> t as
// w' = w + d(t) - d(s) (toward the initial state) or w' = d(s) + w - d(t)
// (toward the final states). The telescoping sum keeps every accepted
// path's total weight unchanged.

use std::collections::VecDeque;

use wfst_core::weight::{self, Weight};
use wfst_core::{FstError, StateId};

use crate::graph::{INITIAL_STATE, Transition, TransitionGraph};

/// Direction of [`push_weights`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushType {
    /// Move weight mass as close to the initial state as possible.
    ToInitial,
    /// Move weight mass as close to the final states as possible.
    ToFinal,
}

/// Single-source shortest distances.
///
/// With `reverse == false`, `d[s]` is the best weight of any path from the
/// initial state to `s`. With `reverse == true`, `d[s]` is the best weight of
/// any path from `s` to a final state, final weight included. Unreachable
/// states get [`weight::ZERO`].
///
/// Fails with a fatal error when a negative-weight cycle makes the distance
/// undefined.
pub fn shortest_distance(graph: &TransitionGraph, reverse: bool) -> Result<Vec<Weight>, FstError> {
    let n = graph.state_count();
    let mut adjacency: Vec<Vec<(StateId, Weight)>> = vec![Vec::new(); n];
    let mut distance = vec![weight::ZERO; n];
    let mut queue = VecDeque::new();
    let mut queued = vec![false; n];

    if reverse {
        for (source, t) in graph.iter_transitions() {
            adjacency[t.target as usize].push((source, t.weight));
        }
        for (state, w) in graph.final_states() {
            distance[state as usize] = w;
            queue.push_back(state);
            queued[state as usize] = true;
        }
    } else {
        for (source, t) in graph.iter_transitions() {
            adjacency[source as usize].push((t.target, t.weight));
        }
        distance[INITIAL_STATE as usize] = weight::ONE;
        queue.push_back(INITIAL_STATE);
        queued[INITIAL_STATE as usize] = true;
    }

    // Each state can improve at most n times without a negative cycle.
    let mut relaxations = vec![0usize; n];
    while let Some(state) = queue.pop_front() {
        queued[state as usize] = false;
        let here = distance[state as usize];
        for &(next, w) in &adjacency[state as usize] {
            let candidate = weight::times(here, w);
            if candidate < distance[next as usize]
                && !weight::approx_eq(candidate, distance[next as usize], weight::DELTA)
            {
                distance[next as usize] = candidate;
                relaxations[next as usize] += 1;
                if relaxations[next as usize] > n {
                    return Err(FstError::Fatal(format!(
                        "negative-weight cycle through state {next}; shortest distance is undefined"
                    )));
                }
                if !queued[next as usize] {
                    queued[next as usize] = true;
                    queue.push_back(next);
                }
            }
        }
    }
    Ok(distance)
}

/// Redistribute weights without changing any accepted path's total weight.
pub fn push_weights(graph: &mut TransitionGraph, push: PushType) -> Result<(), FstError> {
    match push {
        PushType::ToInitial => push_to_initial(graph),
        PushType::ToFinal => push_to_final(graph),
    }
}

fn push_to_final(graph: &mut TransitionGraph) -> Result<(), FstError> {
    let d = shortest_distance(graph, false)?;
    graph.for_each_transition_mut(|source, t| {
        let (ds, dt) = (d[source as usize], d[t.target as usize]);
        if !weight::is_zero(ds) && !weight::is_zero(dt) {
            t.weight = weight::divide(weight::times(ds, t.weight), dt);
        }
    });
    graph.for_each_final_weight_mut(|state, w| {
        let ds = d[state as usize];
        if !weight::is_zero(ds) {
            *w = weight::times(ds, *w);
        }
    });
    log::trace!("push_weights: to final over {} states", graph.state_count());
    Ok(())
}

fn push_to_initial(graph: &mut TransitionGraph) -> Result<(), FstError> {
    let d = shortest_distance(graph, true)?;
    let total = d[INITIAL_STATE as usize];
    graph.for_each_transition_mut(|source, t| {
        let (ds, dt) = (d[source as usize], d[t.target as usize]);
        if !weight::is_zero(ds) && !weight::is_zero(dt) {
            t.weight = weight::divide(weight::times(t.weight, dt), ds);
        }
    });
    graph.for_each_final_weight_mut(|state, w| {
        let ds = d[state as usize];
        if !weight::is_zero(ds) {
            *w = weight::divide(*w, ds);
        }
    });
    if weight::is_zero(total) || weight::approx_eq(total, weight::ONE, weight::DELTA / 10.0) {
        return Ok(());
    }
    // The residual total of the initial state has to be carried by the first
    // step of every path. If state 0 is re-entered by a cycle, the cycle must
    // not pay it again, so state 0's behavior moves to a fresh state first.
    let reentered = graph.iter_transitions().any(|(_, t)| t.target == INITIAL_STATE);
    if reentered {
        split_initial_state(graph);
    }
    if let Ok(arcs) = graph.transitions_mut(INITIAL_STATE) {
        for t in arcs.iter_mut() {
            t.weight = weight::times(total, t.weight);
        }
    }
    if let Ok(w) = graph.final_weight(INITIAL_STATE) {
        graph.set_final_weight(INITIAL_STATE, weight::times(total, w));
    }
    log::trace!("push_weights: to initial, total {total}");
    Ok(())
}

/// Move the behavior of state 0 to a new state that takes over every incoming
/// transition, leaving state 0 as an entry-only copy.
pub(crate) fn split_initial_state(graph: &mut TransitionGraph) -> StateId {
    let copy = graph.add_state();
    let arcs: Vec<Transition> = graph.arcs(INITIAL_STATE).to_vec();
    for t in &arcs {
        graph.add_transition(copy, *t);
    }
    if let Ok(w) = graph.final_weight(INITIAL_STATE) {
        graph.set_final_weight(copy, w);
    }
    graph.for_each_transition_mut(|_, t| {
        if t.target == INITIAL_STATE {
            t.target = copy;
        }
    });
    copy
}
