use std::collections::{BTreeSet, VecDeque};

use hashbrown::HashMap;
use wfst_core::weight;
use wfst_core::{FstError, StateId, SymbolPair};

use super::{compose, determinize, epsilon, rational, transform};
use crate::graph::{INITIAL_STATE, Transition, TransitionGraph};
use crate::topology;

/// Intersection over atomic input:output labels. Weights add.
pub fn intersect(a: &TransitionGraph, b: &TransitionGraph) -> Result<TransitionGraph, FstError> {
    let a = epsilon::remove_epsilons(a)?;
    let b = epsilon::remove_epsilons(b)?;
    let mut result = TransitionGraph::new().with_alphabet_of(&a).with_alphabet_of(&b);

    let mut ids: HashMap<(StateId, StateId), StateId> = HashMap::new();
    let mut worklist = VecDeque::new();
    ids.insert((INITIAL_STATE, INITIAL_STATE), INITIAL_STATE);
    worklist.push_back((INITIAL_STATE, INITIAL_STATE));

    while let Some((sa, sb)) = worklist.pop_front() {
        let source = ids[&(sa, sb)];
        if a.is_final_state(sa) && b.is_final_state(sb) {
            result.set_final_weight(source, weight::times(a.final_or_zero(sa), b.final_or_zero(sb)));
        }
        for ta in a.arcs(sa) {
            for tb in b.arcs(sb).iter().filter(|tb| tb.pair() == ta.pair()) {
                let key = (ta.target, tb.target);
                let len = ids.len() as StateId;
                let target = *ids.entry(key).or_insert_with(|| {
                    worklist.push_back(key);
                    len
                });
                result.add_transition_with(
                    source,
                    Transition::new(target, ta.input, ta.output, weight::times(ta.weight, tb.weight)),
                    false,
                );
            }
        }
    }
    result.ensure_state(ids.len() as StateId - 1);
    topology::connect(&mut result);
    log::debug!("intersect: -> {} states", result.state_count());
    Ok(result)
}

/// Complete `graph` over `labels` with a non-final sink state and swap
/// finality. `graph` must be deterministic; weights are dropped.
pub fn complement_over(graph: &TransitionGraph, labels: &BTreeSet<SymbolPair>) -> TransitionGraph {
    let mut result = graph.clone();
    let sink = result.add_state();
    for state in result.states() {
        let present: BTreeSet<SymbolPair> = result.arcs(state).iter().map(Transition::pair).collect();
        let missing: Vec<Transition> = labels
            .iter()
            .filter(|label| !present.contains(label))
            .map(|&(input, output)| Transition::new(sink, input, output, weight::ONE))
            .collect();
        result.arcs_mut(state).extend(missing);
    }
    result.for_each_transition_mut(|_, t| t.weight = weight::ONE);
    for state in result.states() {
        if result.is_final_state(state) {
            result.clear_final(state);
        } else {
            result.set_final_weight(state, weight::ONE);
        }
    }
    for &(input, output) in labels {
        result.add_symbol_to_alphabet(input);
        result.add_symbol_to_alphabet(output);
    }
    result
}

/// Paths of `a` whose label string `b` does not accept. `a` keeps its weights.
pub fn subtract(a: &TransitionGraph, b: &TransitionGraph) -> Result<TransitionGraph, FstError> {
    let a = epsilon::remove_epsilons(a)?;
    let mut unweighted_b = b.clone();
    unweighted_b.for_each_transition_mut(|_, t| t.weight = weight::ONE);
    unweighted_b.for_each_final_weight_mut(|_, w| *w = weight::ONE);
    let det_b = determinize(&unweighted_b)?;

    let labels: BTreeSet<SymbolPair> = a
        .iter_transitions()
        .chain(det_b.iter_transitions())
        .map(|(_, t)| t.pair())
        .collect();
    let not_b = complement_over(&det_b, &labels);
    intersect(&a, &not_b)
}

/// `a`, plus the paths of `b` whose input string `a` does not accept.
pub fn priority_union(a: &TransitionGraph, b: &TransitionGraph) -> Result<TransitionGraph, FstError> {
    let domain_a = transform::input_project(a);
    let domain_b = transform::input_project(b);
    let only_b = subtract(&domain_b, &domain_a)?;
    let filtered_b = compose(&only_b, b)?;
    Ok(rational::disjunct(a, &filtered_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::Symbol;

    fn string(g: &mut TransitionGraph, letters: &[(&str, &str)], w: f64) {
        let mut state = INITIAL_STATE;
        for &(i, o) in letters {
            let next = g.add_state();
            g.add_transition(state, Transition::from_strs(next, i, o, 0.0));
            state = next;
        }
        g.set_final_weight(state, w);
    }

    fn accepts(g: &TransitionGraph, letters: &[(&str, &str)]) -> Option<f64> {
        // Depth-first over an epsilon-free graph.
        fn walk(g: &TransitionGraph, s: StateId, rest: &[(Symbol, Symbol)], acc: f64) -> Option<f64> {
            if rest.is_empty() {
                return g.final_weight(s).ok().map(|w| acc + w);
            }
            g.arcs(s)
                .iter()
                .filter(|t| t.pair() == rest[0])
                .filter_map(|t| walk(g, t.target, &rest[1..], acc + t.weight))
                .reduce(f64::min)
        }
        let pairs: Vec<_> = letters
            .iter()
            .map(|&(i, o)| (Symbol::intern(i), Symbol::intern(o)))
            .collect();
        walk(g, INITIAL_STATE, &pairs, 0.0)
    }

    #[test]
    fn intersection_keeps_common_strings() {
        let mut a = TransitionGraph::new();
        string(&mut a, &[("a", "a"), ("b", "b")], 1.0);
        string(&mut a, &[("a", "a")], 0.0);
        let mut b = TransitionGraph::new();
        string(&mut b, &[("a", "a"), ("b", "b")], 2.0);
        let c = intersect(&a, &b).unwrap();
        assert_eq!(accepts(&c, &[("a", "a"), ("b", "b")]), Some(3.0));
        assert_eq!(accepts(&c, &[("a", "a")]), None);
    }

    #[test]
    fn subtraction_removes_strings() {
        let mut a = TransitionGraph::new();
        string(&mut a, &[("a", "a")], 0.5);
        string(&mut a, &[("b", "b")], 1.5);
        let mut b = TransitionGraph::new();
        string(&mut b, &[("a", "a")], 9.0);
        let c = subtract(&a, &b).unwrap();
        assert_eq!(accepts(&c, &[("a", "a")]), None);
        assert_eq!(accepts(&c, &[("b", "b")]), Some(1.5));
    }

    #[test]
    fn subtracting_transducer_pairs() {
        let mut a = TransitionGraph::new();
        string(&mut a, &[("a", "x")], 0.0);
        string(&mut a, &[("a", "y")], 0.0);
        let mut b = TransitionGraph::new();
        string(&mut b, &[("a", "x")], 0.0);
        let c = subtract(&a, &b).unwrap();
        assert_eq!(accepts(&c, &[("a", "x")]), None);
        assert_eq!(accepts(&c, &[("a", "y")]), Some(0.0));
    }

    #[test]
    fn priority_union_prefers_first() {
        let mut a = TransitionGraph::new();
        string(&mut a, &[("a", "x")], 0.0);
        let mut b = TransitionGraph::new();
        string(&mut b, &[("a", "y")], 0.0);
        string(&mut b, &[("b", "z")], 0.0);
        let c = priority_union(&a, &b).unwrap();
        let c = epsilon::remove_epsilons(&c).unwrap();
        assert_eq!(accepts(&c, &[("a", "x")]), Some(0.0));
        assert_eq!(accepts(&c, &[("a", "y")]), None);
        assert_eq!(accepts(&c, &[("b", "z")]), Some(0.0));
    }
}
