// Minimization: epsilon removal, determinization, pushing weights toward the
// initial state, then partition refinement over (input, output, weight) keys.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use hashbrown::HashMap;
use wfst_core::{FstError, StateId, Symbol};

use super::{determinize, quantize};
use crate::graph::{INITIAL_STATE, Transition, TransitionGraph};
use crate::push::{self, PushType};
use crate::topology;

/// A transition label with its quantized weight. After pushing, two states are
/// equivalent exactly when they agree on finality and on these keys.
type ArcKey = (Symbol, Symbol, i64);

fn arc_key(t: &Transition) -> ArcKey {
    (t.input, t.output, quantize(t.weight))
}

/// Minimal deterministic graph defining the same weighted relation.
pub fn minimize(graph: &TransitionGraph) -> Result<TransitionGraph, FstError> {
    let mut det = determinize(graph)?;
    topology::connect(&mut det);
    push::push_weights(&mut det, PushType::ToInitial)?;

    let n = det.state_count();

    // Initial partition: by final weight class.
    let mut by_final: BTreeMap<Option<i64>, Vec<StateId>> = BTreeMap::new();
    for state in det.states() {
        let class = det.is_final_state(state).then(|| quantize(det.final_or_zero(state)));
        by_final.entry(class).or_default().push(state);
    }
    let mut partitions: Vec<Vec<StateId>> = by_final.into_values().collect();
    let mut block_of = vec![0usize; n];
    for (idx, block) in partitions.iter().enumerate() {
        for &s in block {
            block_of[s as usize] = idx;
        }
    }

    let mut predecessors: HashMap<(StateId, ArcKey), Vec<StateId>> = HashMap::new();
    let mut keys: BTreeSet<ArcKey> = BTreeSet::new();
    for (source, t) in det.iter_transitions() {
        let key = arc_key(t);
        keys.insert(key);
        predecessors.entry((t.target, key)).or_default().push(source);
    }

    let mut worklist: VecDeque<(usize, ArcKey)> = VecDeque::new();
    for idx in 0..partitions.len() {
        for &key in &keys {
            worklist.push_back((idx, key));
        }
    }

    let mut marked = vec![false; n];
    while let Some((splitter, key)) = worklist.pop_front() {
        let mut touched: BTreeSet<usize> = BTreeSet::new();
        let mut hits: Vec<StateId> = Vec::new();
        for &target in &partitions[splitter] {
            if let Some(sources) = predecessors.get(&(target, key)) {
                for &source in sources {
                    if !marked[source as usize] {
                        marked[source as usize] = true;
                        hits.push(source);
                        touched.insert(block_of[source as usize]);
                    }
                }
            }
        }
        if hits.is_empty() {
            continue;
        }

        for idx in touched {
            let (inside, outside): (Vec<StateId>, Vec<StateId>) = partitions[idx]
                .iter()
                .partition(|&&s| marked[s as usize]);
            if outside.is_empty() {
                continue;
            }
            let (keep, split) = if inside.len() <= outside.len() {
                (outside, inside)
            } else {
                (inside, outside)
            };
            let new_idx = partitions.len();
            for &s in &split {
                block_of[s as usize] = new_idx;
            }
            partitions[idx] = keep;
            partitions.push(split);
            for &k in &keys {
                worklist.push_back((idx, k));
                worklist.push_back((new_idx, k));
            }
        }
        for s in hits {
            marked[s as usize] = false;
        }
    }

    let result = build_from_blocks(&det, &partitions, &block_of);
    log::debug!(
        "minimize: {} -> {} states",
        graph.state_count(),
        result.state_count()
    );
    Ok(result)
}

/// One state per block, taken from its first member. The initial state's
/// block becomes state 0; the others keep the order of their first member.
fn build_from_blocks(
    det: &TransitionGraph,
    partitions: &[Vec<StateId>],
    block_of: &[usize],
) -> TransitionGraph {
    let mut order: Vec<usize> = (0..partitions.len())
        .filter(|&idx| !partitions[idx].is_empty())
        .collect();
    order.sort_by_key(|&idx| {
        let first = partitions[idx].iter().copied().min().unwrap_or(StateId::MAX);
        (block_of[INITIAL_STATE as usize] != idx, first)
    });
    let mut new_id = vec![0 as StateId; partitions.len()];
    for (i, &idx) in order.iter().enumerate() {
        new_id[idx] = i as StateId;
    }

    let mut result = TransitionGraph::new().with_alphabet_of(det);
    result.ensure_state(order.len().saturating_sub(1) as StateId);
    for &idx in &order {
        let Some(&representative) = partitions[idx].iter().min() else {
            continue;
        };
        let state = new_id[idx];
        if let Ok(w) = det.final_weight(representative) {
            result.set_final_weight(state, w);
        }
        for t in det.arcs(representative) {
            let target = new_id[block_of[t.target as usize]];
            result.add_transition_with(state, Transition { target, ..*t }, false);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::weight::approx_eq;

    fn word(g: &mut TransitionGraph, letters: &[&str], w: f64) {
        let mut state = INITIAL_STATE;
        for (i, l) in letters.iter().enumerate() {
            let next = g.add_state();
            let weight = if i == 0 { w } else { 0.0 };
            g.add_transition(state, Transition::from_strs(next, l, l, weight));
            state = next;
        }
        g.set_final_weight(state, 0.0);
    }

    #[test]
    fn shared_suffixes_are_merged() {
        // cat | bat | hat -> 3 states: start, after first letter, after a, after t
        let mut g = TransitionGraph::new();
        word(&mut g, &["c", "a", "t"], 0.0);
        word(&mut g, &["b", "a", "t"], 0.0);
        word(&mut g, &["h", "a", "t"], 0.0);
        let m = minimize(&g).unwrap();
        assert_eq!(m.state_count(), 4);
        assert_eq!(m.transitions(0).unwrap().len(), 3);
    }

    #[test]
    fn weights_keep_states_apart_until_pushed() {
        // a b::1 | c b::1 pushes to identical suffixes.
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::from_strs(1, "a", "a", 0.0));
        g.add_transition(1, Transition::from_strs(2, "b", "b", 1.0));
        g.add_transition(0, Transition::from_strs(3, "c", "c", 0.0));
        g.add_transition(3, Transition::from_strs(4, "b", "b", 1.0));
        g.set_final_weight(2, 0.0);
        g.set_final_weight(4, 0.0);
        let m = minimize(&g).unwrap();
        assert_eq!(m.state_count(), 3);
        let total: f64 = m.iter_transitions().map(|(_, t)| t.weight).sum::<f64>()
            / m.transitions(0).unwrap().len() as f64;
        assert!(approx_eq(total, 1.0, 1e-6));
    }

    #[test]
    fn different_final_weights_stay_distinct() {
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::from_strs(1, "a", "a", 0.0));
        g.add_transition(1, Transition::from_strs(2, "a", "a", 0.0));
        g.set_final_weight(1, 1.0);
        g.set_final_weight(2, 0.0);
        let m = minimize(&g).unwrap();
        assert_eq!(m.state_count(), 3);
    }

    #[test]
    fn cycle_collapses() {
        // (a a)* as a 4-state ring minimizes to 2 states.
        let mut g = TransitionGraph::new();
        for s in 0..4 {
            g.add_transition(s, Transition::from_strs((s + 1) % 4, "a", "a", 0.0));
        }
        g.set_final_weight(0, 0.0);
        g.set_final_weight(2, 0.0);
        let m = minimize(&g).unwrap();
        assert_eq!(m.state_count(), 2);
        assert!(m.is_final_state(0));
    }

    #[test]
    fn empty_language() {
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::from_strs(1, "a", "a", 0.0));
        let m = minimize(&g).unwrap();
        assert_eq!(m.state_count(), 1);
        assert_eq!(m.transition_count(), 0);
    }
}
