use std::cmp::Ordering;
use std::collections::BinaryHeap;

use wfst_core::weight::{self, Weight};
use wfst_core::{FstError, StateId, SymbolPair};

use super::determinize;
use crate::graph::{INITIAL_STATE, Transition, TransitionGraph};
use crate::push;

/// A partial path in the search tree: its last state and the entry that led to it.
struct Node {
    state: StateId,
    parent: Option<usize>,
    label: Option<SymbolPair>,
    cost: Weight,
}

/// Queue entry ordered by estimated total cost, best first.
struct Candidate {
    estimate: Weight,
    node: usize,
    /// Leaving through the final weight instead of expanding.
    exit: bool,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Candidate {}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; the smallest estimate must come out first.
        weight::compare(other.estimate, self.estimate).then(other.node.cmp(&self.node))
    }
}

/// The `n` best paths with distinct label strings, as a tree-shaped graph
/// whose final weights carry each path's total weight.
pub fn n_best(graph: &TransitionGraph, n: usize) -> Result<TransitionGraph, FstError> {
    let det = determinize(graph)?;
    let mut result = TransitionGraph::new().with_alphabet_of(graph);
    if n == 0 {
        return Ok(result);
    }
    let to_final = push::shortest_distance(&det, true)?;

    let mut nodes = vec![Node {
        state: INITIAL_STATE,
        parent: None,
        label: None,
        cost: weight::ONE,
    }];
    let mut heap = BinaryHeap::new();
    heap.push(Candidate {
        estimate: to_final[INITIAL_STATE as usize],
        node: 0,
        exit: false,
    });
    let mut expanded = vec![0usize; det.state_count()];
    let mut found = 0;

    while let Some(Candidate { node, exit, estimate }) = heap.pop() {
        if weight::is_zero(estimate) {
            break;
        }
        if exit {
            add_path(&mut result, &nodes, node, estimate);
            found += 1;
            if found == n {
                break;
            }
            continue;
        }
        let (state, cost) = (nodes[node].state, nodes[node].cost);
        expanded[state as usize] += 1;
        if expanded[state as usize] > n {
            continue;
        }
        if let Ok(w) = det.final_weight(state) {
            heap.push(Candidate {
                estimate: weight::times(cost, w),
                node,
                exit: true,
            });
        }
        for t in det.arcs(state) {
            let next_cost = weight::times(cost, t.weight);
            let estimate = weight::times(next_cost, to_final[t.target as usize]);
            if weight::is_zero(estimate) {
                continue;
            }
            nodes.push(Node {
                state: t.target,
                parent: Some(node),
                label: Some(t.pair()),
                cost: next_cost,
            });
            heap.push(Candidate {
                estimate,
                node: nodes.len() - 1,
                exit: false,
            });
        }
    }
    log::debug!("n_best: {found} of {n} paths");
    Ok(result)
}

/// Insert the path ending at `node` into the result tree with total weight `total`.
fn add_path(result: &mut TransitionGraph, nodes: &[Node], node: usize, total: Weight) {
    let mut labels = Vec::new();
    let mut current = Some(node);
    while let Some(i) = current {
        if let Some(label) = nodes[i].label {
            labels.push(label);
        }
        current = nodes[i].parent;
    }
    labels.reverse();

    let mut state = INITIAL_STATE;
    for (input, output) in labels {
        let existing = result
            .arcs(state)
            .iter()
            .find(|t| t.input == input && t.output == output)
            .map(|t| t.target);
        state = match existing {
            Some(target) => target,
            None => {
                let next = result.add_state();
                result.add_transition(state, Transition::new(next, input, output, weight::ONE));
                next
            }
        };
    }
    result.set_final_weight(state, total);
}
