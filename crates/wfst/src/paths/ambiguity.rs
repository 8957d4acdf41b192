use wfst_core::Symbol;

use crate::graph::TransitionGraph;
use crate::topology::find_cycle;

/// Whether some input string has infinitely many paths: a reachable cycle
/// that reads no input. Flag diacritics read no input either.
pub fn is_infinitely_ambiguous(graph: &TransitionGraph) -> bool {
    has_input_epsilon_cycle(graph, true)
}

/// Whether looking up `input` could produce infinitely many results.
///
/// The answer does not depend on `input`: it is [`is_infinitely_ambiguous`]
/// for the whole graph, which over-approximates the per-string answer.
pub fn is_lookup_infinitely_ambiguous(graph: &TransitionGraph, _input: &[Symbol]) -> bool {
    is_infinitely_ambiguous(graph)
}

/// Reachable cycle over input epsilons, and over flag diacritics when
/// `flags_read_nothing` is set.
pub(crate) fn has_input_epsilon_cycle(graph: &TransitionGraph, flags_read_nothing: bool) -> bool {
    find_cycle(graph, |t| {
        t.input.is_epsilon() || (flags_read_nothing && t.input.is_flag_diacritic())
    })
}
