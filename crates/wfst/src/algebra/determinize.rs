// Weighted subset construction.
//
// A result state is a set of (source state, residual weight) pairs. For each
// label leaving the set, the result transition carries the best weight w of
// the moves on that label and every target keeps its residual over w. Subsets
// are looked up by their quantized residuals, so float noise does not create
// fresh states.

use std::collections::{BTreeMap, VecDeque};

use hashbrown::HashMap;
use wfst_core::weight::{self, Weight};
use wfst_core::{FstError, StateId, SymbolPair};

use super::{epsilon, quantize};
use crate::graph::{INITIAL_STATE, Transition, TransitionGraph};

type Subset = Vec<(StateId, Weight)>;
type SubsetKey = Vec<(StateId, i64)>;

fn key_of(subset: &Subset) -> SubsetKey {
    subset.iter().map(|&(s, r)| (s, quantize(r))).collect()
}

/// Whether no state has an epsilon:epsilon transition or two transitions
/// with the same label.
pub fn is_deterministic(graph: &TransitionGraph) -> bool {
    graph.states().all(|state| {
        let arcs = graph.arcs(state);
        let mut labels: Vec<SymbolPair> = arcs.iter().map(Transition::pair).collect();
        labels.sort_unstable();
        labels.dedup();
        labels.len() == arcs.len() && !arcs.iter().any(Transition::is_epsilon)
    })
}

/// Determinize over input:output labels, treating each pair as one atomic
/// label. Epsilons are removed first.
///
/// Terminates for every unweighted graph; weighted graphs whose cycles are
/// not twins may need unboundedly many residual states.
pub fn determinize(graph: &TransitionGraph) -> Result<TransitionGraph, FstError> {
    let input = epsilon::remove_epsilons(graph)?;
    let mut result = TransitionGraph::new().with_alphabet_of(&input);

    let mut ids: HashMap<SubsetKey, StateId> = HashMap::new();
    let mut subsets: Vec<Subset> = Vec::new();
    let mut worklist: VecDeque<StateId> = VecDeque::new();

    let start: Subset = vec![(INITIAL_STATE, weight::ONE)];
    ids.insert(key_of(&start), INITIAL_STATE);
    subsets.push(start);
    worklist.push_back(INITIAL_STATE);

    while let Some(current) = worklist.pop_front() {
        let subset = subsets[current as usize].clone();

        let final_weight = subset.iter().fold(weight::ZERO, |acc, &(s, r)| {
            weight::plus(acc, weight::times(r, input.final_or_zero(s)))
        });
        if !weight::is_zero(final_weight) {
            result.set_final_weight(current, final_weight);
        }

        // BTreeMap keeps the output order independent of hashing.
        let mut moves: BTreeMap<SymbolPair, Vec<(StateId, Weight)>> = BTreeMap::new();
        for &(s, residual) in &subset {
            for t in input.arcs(s) {
                moves
                    .entry(t.pair())
                    .or_default()
                    .push((t.target, weight::times(residual, t.weight)));
            }
        }

        for ((in_sym, out_sym), targets) in moves {
            let best = targets
                .iter()
                .fold(weight::ZERO, |acc, &(_, w)| weight::plus(acc, w));
            let mut residuals: BTreeMap<StateId, Weight> = BTreeMap::new();
            for (target, w) in targets {
                let r = weight::divide(w, best);
                residuals
                    .entry(target)
                    .and_modify(|e| *e = weight::plus(*e, r))
                    .or_insert(r);
            }
            let next: Subset = residuals.into_iter().collect();
            let key = key_of(&next);
            let next_id = match ids.get(&key) {
                Some(&id) => id,
                None => {
                    let id = subsets.len() as StateId;
                    ids.insert(key, id);
                    subsets.push(next);
                    worklist.push_back(id);
                    id
                }
            };
            result.add_transition_with(
                current,
                Transition::new(next_id, in_sym, out_sym, best),
                false,
            );
        }
    }
    result.ensure_state(subsets.len() as StateId - 1);
    log::debug!(
        "determinize: {} -> {} states",
        graph.state_count(),
        result.state_count()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::Symbol;
    use wfst_core::weight::approx_eq;

    #[test]
    fn merges_common_prefixes() {
        // ab | ac as two separate branches
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::from_strs(1, "a", "a", 0.0));
        g.add_transition(1, Transition::from_strs(2, "b", "b", 0.0));
        g.add_transition(0, Transition::from_strs(3, "a", "a", 0.0));
        g.add_transition(3, Transition::from_strs(4, "c", "c", 0.0));
        g.set_final_weight(2, 0.0);
        g.set_final_weight(4, 0.0);
        assert!(!is_deterministic(&g));

        let d = determinize(&g).unwrap();
        assert!(is_deterministic(&d));
        assert_eq!(d.transitions(0).unwrap().len(), 1);
        assert_eq!(d.transitions(1).unwrap().len(), 2);
    }

    #[test]
    fn residual_weights_are_carried() {
        // a::1 b::0 | a::3 c::0
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::from_strs(1, "a", "a", 1.0));
        g.add_transition(1, Transition::from_strs(2, "b", "b", 0.0));
        g.add_transition(0, Transition::from_strs(3, "a", "a", 3.0));
        g.add_transition(3, Transition::from_strs(4, "c", "c", 0.0));
        g.set_final_weight(2, 0.0);
        g.set_final_weight(4, 0.0);

        let d = determinize(&g).unwrap();
        let first = d.transitions(0).unwrap()[0];
        assert!(approx_eq(first.weight, 1.0, 1e-9));
        let second: Vec<_> = d.transitions(first.target).unwrap().to_vec();
        let to_c = second
            .iter()
            .find(|t| t.input == Symbol::intern("c"))
            .unwrap();
        assert!(approx_eq(to_c.weight, 2.0, 1e-9));
    }

    #[test]
    fn pairs_are_atomic_labels() {
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::from_strs(1, "a", "x", 0.0));
        g.add_transition(0, Transition::from_strs(1, "a", "y", 0.0));
        g.set_final_weight(1, 0.0);
        assert!(is_deterministic(&g));
        let d = determinize(&g).unwrap();
        assert_eq!(d.transitions(0).unwrap().len(), 2);
    }

    #[test]
    fn cyclic_unweighted_terminates() {
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::from_strs(0, "a", "a", 0.0));
        g.add_transition(0, Transition::from_strs(1, "a", "a", 0.0));
        g.set_final_weight(1, 0.0);
        let d = determinize(&g).unwrap();
        assert!(is_deterministic(&d));
        assert_eq!(d.state_count(), 2);
    }
}
