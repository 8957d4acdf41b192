// Small pair automata shared by the rule constructions.
//
// A rule is compiled as an automaton over symbol pairs: every transition label
// `i:o` is one letter. Contexts given as automata over single symbols are
// lifted into that pair alphabet before they are combined with anything else.

use std::collections::BTreeSet;

use wfst::algebra;
use wfst::{ImplementationType, Symbol, SymbolPair, Transducer, Transition, TransitionGraph};
use wfst_core::{FstError, weight};

use crate::{Context, RuleError};

/// Which side of a pair a context is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Input,
    Output,
}

impl Side {
    pub(crate) fn of(self, pair: SymbolPair) -> Symbol {
        match self {
            Side::Input => pair.0,
            Side::Output => pair.1,
        }
    }
}

/// Both context automata must have the rule's implementation type.
pub(crate) fn check_kinds(context: &Context, kind: ImplementationType) -> Result<(), RuleError> {
    for side in [&context.0, &context.1] {
        if side.kind() != kind {
            return Err(FstError::TypeMismatch {
                expected: kind,
                actual: side.kind(),
            }
            .into());
        }
    }
    Ok(())
}

/// Both contexts must pair every symbol with itself.
pub(crate) fn check_automata(context: &Context) -> Result<(), RuleError> {
    if context.0.is_automaton() && context.1.is_automaton() {
        Ok(())
    } else {
        Err(RuleError::ContextNotAutomata)
    }
}

/// Accepts exactly one pair out of `pairs`.
pub(crate) fn pair_set<'a, I>(pairs: I) -> TransitionGraph
where
    I: IntoIterator<Item = &'a SymbolPair>,
{
    let mut graph = TransitionGraph::new();
    let end = graph.add_state();
    for &(input, output) in pairs {
        graph.add_transition(0, Transition::new(end, input, output, weight::ONE));
    }
    graph.set_final_weight(end, weight::ONE);
    graph
}

/// Any string over `pairs`, including the empty one.
pub(crate) fn universe<'a, I>(pairs: I) -> TransitionGraph
where
    I: IntoIterator<Item = &'a SymbolPair>,
{
    algebra::repeat_star(&pair_set(pairs))
}

pub(crate) fn concat_all(parts: &[&TransitionGraph]) -> TransitionGraph {
    parts
        .iter()
        .fold(algebra::epsilon_graph(), |acc, part| algebra::concatenate(&acc, part))
}

/// Lift a context automaton into the pair alphabet.
///
/// A transition on `x` becomes one transition per pair of `pairs` whose
/// `side` is `x`. Each pair of `free` may appear anywhere, as a self-loop on
/// every state. Weights of the context are dropped.
pub(crate) fn lift(
    context: &TransitionGraph,
    side: Side,
    pairs: &BTreeSet<SymbolPair>,
    free: &[SymbolPair],
) -> TransitionGraph {
    let mut lifted = TransitionGraph::new();
    if context.state_count() > 0 {
        lifted.ensure_state(context.state_count() as u32 - 1);
    }
    for (state, t) in context.iter_transitions() {
        if t.input.is_epsilon() {
            lifted.add_transition(
                state,
                Transition::new(t.target, Symbol::EPSILON, Symbol::EPSILON, weight::ONE),
            );
            continue;
        }
        for &(input, output) in pairs.iter().filter(|&&p| side.of(p) == t.input) {
            lifted.add_transition(state, Transition::new(t.target, input, output, weight::ONE));
        }
    }
    for (state, _) in context.final_states() {
        lifted.set_final_weight(state, weight::ONE);
    }
    for &pair in free {
        lifted.insert_freely(pair, weight::ONE);
    }
    lifted
}

/// Pairs of `pairs` that are empty on `side`.
pub(crate) fn silent_on(side: Side, pairs: &BTreeSet<SymbolPair>) -> Vec<SymbolPair> {
    pairs
        .iter()
        .copied()
        .filter(|&p| side.of(p).is_epsilon())
        .collect()
}

/// Every non-epsilon pair label used by `graph`.
pub(crate) fn pairs_of(graph: &TransitionGraph) -> BTreeSet<SymbolPair> {
    graph
        .iter_transitions()
        .map(|(_, t)| t.pair())
        .filter(|&(input, output)| !(input.is_epsilon() && output.is_epsilon()))
        .collect()
}

pub(crate) fn into_rule(graph: TransitionGraph, kind: ImplementationType) -> Transducer {
    Transducer::from_graph(graph, kind)
}
