//! Replace rules.
//!
//! A replace rule maps every stretch of text accepted by the input side of
//! `mapping` to the mapping's output, but only between a left and a right
//! context. The rule is compiled over symbol pairs with brackets:
//!
//! 1. every candidate is a string over the alphabet pairs with zero or more
//!    bracketed mapping paths, `<` mapping `>`;
//! 2. a bracket whose surroundings do not match the contexts is removed by
//!    subtracting the strings with a misplaced bracket;
//! 3. an obligatory rule also subtracts every string that leaves a match
//!    unbracketed between the contexts;
//! 4. the brackets are erased.
//!
//! The [`ReplaceType`] decides on which side of the surrounding pairs each
//! context is matched: upper (input) or lower (output).

use std::collections::BTreeSet;

use wfst::algebra;
use wfst::{Symbol, SymbolPair, Transducer, TransitionGraph, topology};

use crate::context::{
    Side, check_automata, check_kinds, concat_all, into_rule, lift, pair_set, pairs_of, silent_on,
    universe,
};
use crate::{Context, RuleError};

const OPEN: &str = "@_REPLACE_OPEN_@";
const CLOSE: &str = "@_REPLACE_CLOSE_@";
const FOCUS_OPEN: &str = "@_REPLACE_FOCUS_OPEN_@";
const FOCUS_CLOSE: &str = "@_REPLACE_FOCUS_CLOSE_@";

/// Where the left and right contexts are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceType {
    /// Both contexts on the input side.
    Up,
    /// Both contexts on the output side.
    Down,
    /// Left context on the output side, right context on the input side.
    Left,
    /// Left context on the input side, right context on the output side.
    Right,
}

impl ReplaceType {
    fn sides(self) -> (Side, Side) {
        match self {
            ReplaceType::Up => (Side::Input, Side::Input),
            ReplaceType::Down => (Side::Output, Side::Output),
            ReplaceType::Left => (Side::Output, Side::Input),
            ReplaceType::Right => (Side::Input, Side::Output),
        }
    }
}

fn marker(name: &str) -> SymbolPair {
    let s = Symbol::intern(name);
    (s, s)
}

/// Reject mappings that accept nothing or whose input side accepts the
/// empty string: such a rule could fire an unbounded number of times.
fn check_mapping(mapping: &TransitionGraph) -> Result<(), RuleError> {
    let mut domain = algebra::input_project(mapping);
    topology::connect(&mut domain);
    let domain = algebra::remove_epsilons(&domain)?;
    let empty = domain.final_states().next().is_none();
    if empty || domain.is_final_state(wfst::INITIAL_STATE) {
        return Err(RuleError::EmptyMapping);
    }
    Ok(())
}

/// Compile a replace rule.
///
/// `alphabet` lists the pairs allowed outside replaced stretches; usually
/// identity pairs `x:x`. With `optional` unset every match between the
/// contexts is replaced.
pub fn replace(
    kind_of_rule: ReplaceType,
    context: &Context,
    mapping: &Transducer,
    optional: bool,
    alphabet: &BTreeSet<SymbolPair>,
) -> Result<Transducer, RuleError> {
    let kind = mapping.kind();
    check_kinds(context, kind)?;
    check_automata(context)?;
    let target = algebra::remove_epsilons(mapping.graph())?;
    check_mapping(&target)?;

    let (open, close) = (marker(OPEN), marker(CLOSE));
    let (focus_open, focus_close) = (marker(FOCUS_OPEN), marker(FOCUS_CLOSE));
    let content: BTreeSet<SymbolPair> = alphabet.union(&pairs_of(&target)).copied().collect();
    let mut with_brackets = content.clone();
    with_brackets.extend([open, close]);
    let any = universe(&with_brackets);

    // 1. Candidates.
    let bracketed = concat_all(&[&pair_set([&open]), &target, &pair_set([&close])]);
    let base = algebra::repeat_star(&algebra::disjunct(&pair_set(alphabet), &bracketed));

    // 2. A bracket is misplaced unless both contexts surround it.
    let (left_side, right_side) = kind_of_rule.sides();
    let lift_side = |graph: &TransitionGraph, side: Side| {
        let mut free = silent_on(side, &content);
        free.extend([open, close]);
        lift(graph, side, &content, &free)
    };
    let left = lift_side(context.0.graph(), left_side);
    let right = lift_side(context.1.graph(), right_side);

    let focused = concat_all(&[
        &any,
        &pair_set([&focus_open]),
        &target,
        &pair_set([&focus_close]),
        &any,
    ]);
    let allowed = concat_all(&[
        &any,
        &left,
        &pair_set([&focus_open]),
        &target,
        &pair_set([&focus_close]),
        &right,
        &any,
    ]);
    let mut misplaced = algebra::subtract(&focused, &allowed)?;
    misplaced.substitute_pair(focus_open, open);
    misplaced.substitute_pair(focus_close, close);
    let mut rule = algebra::subtract(&base, &misplaced)?;
    log::debug!("replace: {} states after context check", rule.state_count());

    // 3. No unreplaced match inside the contexts.
    if !optional {
        let domain = algebra::input_project(&target);
        let unreplaced = lift(&domain, Side::Input, alphabet, &silent_on(Side::Input, alphabet));
        let unreplaced = algebra::subtract(&unreplaced, &algebra::epsilon_graph())?;
        let missed = concat_all(&[&any, &left, &unreplaced, &right, &any]);
        rule = algebra::subtract(&rule, &missed)?;
        log::debug!("replace: {} states after obligatory check", rule.state_count());
    }

    // 4. Erase the brackets.
    let epsilon = (Symbol::EPSILON, Symbol::EPSILON);
    rule.substitute_pair(open, epsilon);
    rule.substitute_pair(close, epsilon);
    for name in [OPEN, CLOSE, FOCUS_OPEN, FOCUS_CLOSE] {
        rule.remove_symbol_from_alphabet(Symbol::intern(name));
    }
    let mut rule = algebra::remove_epsilons(&rule)?;
    topology::connect(&mut rule);
    Ok(into_rule(rule, kind))
}

/// Replace rule with both contexts matched on the input side.
///
/// With contexts `c` and `c`, mapping `aa:bb` and alphabet `{a, b, c}`, the
/// string `caacac` becomes `cbbcac`.
pub fn replace_up(
    context: &Context,
    mapping: &Transducer,
    optional: bool,
    alphabet: &BTreeSet<SymbolPair>,
) -> Result<Transducer, RuleError> {
    replace(ReplaceType::Up, context, mapping, optional, alphabet)
}

/// Replace rule with both contexts matched on the output side.
pub fn replace_down(
    context: &Context,
    mapping: &Transducer,
    optional: bool,
    alphabet: &BTreeSet<SymbolPair>,
) -> Result<Transducer, RuleError> {
    replace(ReplaceType::Down, context, mapping, optional, alphabet)
}

/// Replace rule with the left context on the output side and the right
/// context on the input side.
pub fn replace_left(
    context: &Context,
    mapping: &Transducer,
    optional: bool,
    alphabet: &BTreeSet<SymbolPair>,
) -> Result<Transducer, RuleError> {
    replace(ReplaceType::Left, context, mapping, optional, alphabet)
}

/// Replace rule with the left context on the input side and the right
/// context on the output side.
pub fn replace_right(
    context: &Context,
    mapping: &Transducer,
    optional: bool,
    alphabet: &BTreeSet<SymbolPair>,
) -> Result<Transducer, RuleError> {
    replace(ReplaceType::Right, context, mapping, optional, alphabet)
}

/// Replace rule without contexts.
pub fn replace_everywhere(
    mapping: &Transducer,
    optional: bool,
    alphabet: &BTreeSet<SymbolPair>,
) -> Result<Transducer, RuleError> {
    let empty = Transducer::epsilon(mapping.kind());
    replace(ReplaceType::Up, &(empty.clone(), empty), mapping, optional, alphabet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_per_type() {
        assert_eq!(ReplaceType::Up.sides(), (Side::Input, Side::Input));
        assert_eq!(ReplaceType::Left.sides(), (Side::Output, Side::Input));
        assert_eq!(ReplaceType::Right.sides(), (Side::Input, Side::Output));
    }

    #[test]
    fn mapping_must_consume_input() {
        let mut deletion_only = TransitionGraph::new();
        deletion_only.set_final_weight(0, 0.0);
        assert!(matches!(check_mapping(&deletion_only), Err(RuleError::EmptyMapping)));
        assert!(matches!(check_mapping(&TransitionGraph::new()), Err(RuleError::EmptyMapping)));
        assert!(check_mapping(Transducer::fst([("a", "b")]).graph()).is_ok());
    }
}
