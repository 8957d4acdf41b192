use std::collections::VecDeque;

use wfst_core::weight;
use wfst_core::{FstError, StateId};

use super::minimize;
use crate::graph::{INITIAL_STATE, Transition, TransitionGraph};

/// Tolerance for weights that went through pushing on both sides.
const COMPARE_DELTA: f64 = 1e-4;

/// Whether `a` and `b` define the same weighted relation.
///
/// Both graphs are minimized; minimal pushed graphs of equal relations are
/// isomorphic, and the isomorphism is forced by the labels from state 0.
pub fn compare(a: &TransitionGraph, b: &TransitionGraph) -> Result<bool, FstError> {
    let ma = minimize(a)?;
    let mb = minimize(b)?;
    if ma.state_count() != mb.state_count() || ma.transition_count() != mb.transition_count() {
        log::trace!(
            "compare: sizes differ ({} / {} states)",
            ma.state_count(),
            mb.state_count()
        );
        return Ok(false);
    }

    let mut mapping: Vec<Option<StateId>> = vec![None; ma.state_count()];
    mapping[INITIAL_STATE as usize] = Some(INITIAL_STATE);
    let mut queue = VecDeque::from([(INITIAL_STATE, INITIAL_STATE)]);
    while let Some((sa, sb)) = queue.pop_front() {
        match (ma.final_weight(sa), mb.final_weight(sb)) {
            (Ok(wa), Ok(wb)) if weight::approx_eq(wa, wb, COMPARE_DELTA) => {}
            (Err(FstError::NotFinalState(_)), Err(FstError::NotFinalState(_))) => {}
            _ => return Ok(false),
        }
        let mut arcs_a: Vec<Transition> = ma.arcs(sa).to_vec();
        let mut arcs_b: Vec<Transition> = mb.arcs(sb).to_vec();
        if arcs_a.len() != arcs_b.len() {
            return Ok(false);
        }
        arcs_a.sort_by_key(Transition::pair);
        arcs_b.sort_by_key(Transition::pair);
        for (ta, tb) in arcs_a.iter().zip(&arcs_b) {
            if ta.pair() != tb.pair() || !weight::approx_eq(ta.weight, tb.weight, COMPARE_DELTA) {
                return Ok(false);
            }
            match mapping[ta.target as usize] {
                Some(mapped) if mapped != tb.target => return Ok(false),
                Some(_) => {}
                None => {
                    mapping[ta.target as usize] = Some(tb.target);
                    queue.push_back((ta.target, tb.target));
                }
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{disjunct, repeat_star};

    fn letter(s: &str, w: f64) -> TransitionGraph {
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::from_strs(1, s, s, w));
        g.set_final_weight(1, 0.0);
        g
    }

    #[test]
    fn union_is_commutative() {
        let a = letter("a", 1.0);
        let b = letter("b", 2.0);
        assert!(compare(&disjunct(&a, &b), &disjunct(&b, &a)).unwrap());
    }

    #[test]
    fn weight_placement_does_not_matter() {
        let mut early = letter("a", 1.0);
        early.set_final_weight(1, 0.0);
        let mut late = letter("a", 0.0);
        late.set_final_weight(1, 1.0);
        assert!(compare(&early, &late).unwrap());
    }

    #[test]
    fn different_weights_differ() {
        assert!(!compare(&letter("a", 1.0), &letter("a", 2.0)).unwrap());
    }

    #[test]
    fn different_strings_differ() {
        assert!(!compare(&letter("a", 0.0), &letter("b", 0.0)).unwrap());
    }

    #[test]
    fn star_of_star() {
        let star = repeat_star(&letter("a", 0.0));
        assert!(compare(&star, &repeat_star(&star)).unwrap());
    }
}
