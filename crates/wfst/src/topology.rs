// Structural queries over a transition graph: reachability, trimming, cycle
// detection and topological order.

use std::collections::VecDeque;

use wfst_core::StateId;

use crate::graph::{INITIAL_STATE, TransitionGraph};

/// States reachable from the initial state.
pub fn accessible(graph: &TransitionGraph) -> Vec<bool> {
    let mut seen = vec![false; graph.state_count()];
    let mut queue = VecDeque::new();
    queue.push_back(INITIAL_STATE);
    seen[INITIAL_STATE as usize] = true;
    while let Some(state) = queue.pop_front() {
        for t in graph.arcs(state) {
            if !seen[t.target as usize] {
                seen[t.target as usize] = true;
                queue.push_back(t.target);
            }
        }
    }
    seen
}

/// States from which some final state can be reached.
pub fn coaccessible(graph: &TransitionGraph) -> Vec<bool> {
    let n = graph.state_count();
    let mut reverse: Vec<Vec<StateId>> = vec![Vec::new(); n];
    for (source, t) in graph.iter_transitions() {
        reverse[t.target as usize].push(source);
    }
    let mut seen = vec![false; n];
    let mut queue: VecDeque<StateId> = graph.final_states().map(|(s, _)| s).collect();
    for &s in &queue {
        seen[s as usize] = true;
    }
    while let Some(state) = queue.pop_front() {
        for &source in &reverse[state as usize] {
            if !seen[source as usize] {
                seen[source as usize] = true;
                queue.push_back(source);
            }
        }
    }
    seen
}

/// Remove states that are not both accessible and coaccessible. State 0 stays.
pub fn connect(graph: &mut TransitionGraph) {
    let forward = accessible(graph);
    let backward = coaccessible(graph);
    let keep: Vec<bool> = forward
        .iter()
        .zip(&backward)
        .map(|(&f, &b)| f && b)
        .collect();
    if keep.iter().all(|&k| k) {
        return;
    }
    let before = graph.state_count();
    graph.retain_states(&keep);
    log::trace!("connect: {before} -> {} states", graph.state_count());
}

/// Whether a cycle can be reached from the initial state.
pub fn is_cyclic(graph: &TransitionGraph) -> bool {
    find_cycle(graph, |_| true)
}

/// Whether a cycle made only of transitions accepted by `follow` can be reached
/// from the initial state. Reachability itself uses every transition.
pub(crate) fn find_cycle<F>(graph: &TransitionGraph, follow: F) -> bool
where
    F: Fn(&crate::graph::Transition) -> bool,
{
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Grey,
        Black,
    }

    let reachable = accessible(graph);
    let mut color = vec![Color::White; graph.state_count()];
    for root in graph.states() {
        if !reachable[root as usize] || color[root as usize] != Color::White {
            continue;
        }
        // Explicit DFS stack of (state, next transition index).
        let mut stack: Vec<(StateId, usize)> = vec![(root, 0)];
        color[root as usize] = Color::Grey;
        while let Some(top) = stack.last_mut() {
            let state = top.0;
            let arcs = graph.arcs(state);
            if top.1 < arcs.len() {
                let t = arcs[top.1];
                top.1 += 1;
                if !follow(&t) {
                    continue;
                }
                match color[t.target as usize] {
                    Color::Grey => return true,
                    Color::White => {
                        color[t.target as usize] = Color::Grey;
                        stack.push((t.target, 0));
                    }
                    Color::Black => {}
                }
            } else {
                color[state as usize] = Color::Black;
                stack.pop();
            }
        }
    }
    false
}

/// States in topological order, or `None` if the graph has a cycle.
pub fn topsort(graph: &TransitionGraph) -> Option<Vec<StateId>> {
    let n = graph.state_count();
    let mut indegree = vec![0usize; n];
    for (_, t) in graph.iter_transitions() {
        indegree[t.target as usize] += 1;
    }
    let mut queue: VecDeque<StateId> = graph
        .states()
        .filter(|&s| indegree[s as usize] == 0)
        .collect();
    let mut order = Vec::with_capacity(n);
    while let Some(state) = queue.pop_front() {
        order.push(state);
        for t in graph.arcs(state) {
            indegree[t.target as usize] -= 1;
            if indegree[t.target as usize] == 0 {
                queue.push_back(t.target);
            }
        }
    }
    (order.len() == n).then_some(order)
}

/// Number of transitions on the longest accepted path, or `None` if the
/// reachable part of the graph is cyclic.
pub fn longest_path_size(graph: &TransitionGraph) -> Option<usize> {
    let mut trimmed = graph.clone();
    connect(&mut trimmed);
    if !trimmed.is_final_state(INITIAL_STATE) && trimmed.transition_count() == 0 {
        return Some(0);
    }
    let order = topsort(&trimmed)?;
    let mut longest: Vec<Option<usize>> = vec![None; trimmed.state_count()];
    longest[INITIAL_STATE as usize] = Some(0);
    let mut best = 0;
    for state in order {
        let Some(here) = longest[state as usize] else {
            continue;
        };
        if trimmed.is_final_state(state) {
            best = best.max(here);
        }
        for t in trimmed.arcs(state) {
            let slot = &mut longest[t.target as usize];
            *slot = Some(slot.map_or(here + 1, |l| l.max(here + 1)));
        }
    }
    Some(best)
}
