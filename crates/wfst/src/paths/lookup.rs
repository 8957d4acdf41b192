use hashbrown::HashMap;
use wfst_core::flags::FlagDiacriticTable;
use wfst_core::weight::{self, Weight};
use wfst_core::{FstError, StateId, Symbol, SymbolPair};

use super::ambiguity::has_input_epsilon_cycle;
use super::{FlagStack, Path, PathOptions, ResultSet, strip_flags};
use crate::graph::{Alphabet, INITIAL_STATE, Transition, TransitionGraph};

/// Lookup limits and matching mode.
#[derive(Debug, Clone, Copy)]
struct Query {
    obey_flags: bool,
    filter_flags: bool,
    max_number: i32,
    cycles: i32,
    max_weight: Option<Weight>,
}

struct Frame {
    state: StateId,
    next: usize,
    position: usize,
    weight: Weight,
    pairs_len: usize,
    flag_depth: usize,
}

/// Paths whose input side is exactly `input`, matching symbols literally.
///
/// `limit <= 0` returns every result; otherwise the `limit` lightest.
pub fn lookup(graph: &TransitionGraph, input: &[Symbol], limit: i32) -> Result<Vec<Path>, FstError> {
    run(
        graph,
        input,
        Query {
            obey_flags: false,
            filter_flags: false,
            max_number: limit,
            cycles: -1,
            max_weight: None,
        },
    )
}

/// Flag-aware lookup. Flags are epsilons that must satisfy their
/// constraints, and identity or unknown transitions match input symbols
/// missing from the alphabet. Results heavier than `max_weight` are dropped.
pub fn lookup_fd(
    graph: &TransitionGraph,
    input: &[Symbol],
    limit: i32,
    max_weight: Option<Weight>,
) -> Result<Vec<Path>, FstError> {
    run(
        graph,
        input,
        Query {
            obey_flags: true,
            filter_flags: true,
            max_number: limit,
            cycles: -1,
            max_weight,
        },
    )
}

/// Lookup driven by [`PathOptions`]; `max_cycles` bounds how often an input
/// epsilon cycle may be traversed.
pub fn lookup_with(
    graph: &TransitionGraph,
    input: &[Symbol],
    options: &PathOptions,
) -> Result<Vec<Path>, FstError> {
    run(
        graph,
        input,
        Query {
            obey_flags: options.obey_flags,
            filter_flags: options.filter_flags,
            max_number: options.max_number,
            cycles: options.max_cycles,
            max_weight: options.max_weight,
        },
    )
}

/// How transition `t` reads `input` at `position`: the label it contributes
/// and whether it consumes a symbol.
fn step(
    t: &Transition,
    input: &[Symbol],
    position: usize,
    wildcards: Option<&Alphabet>,
    is_flag: bool,
) -> Option<(SymbolPair, bool)> {
    if t.input.is_epsilon() || is_flag {
        return Some((t.pair(), false));
    }
    let &symbol = input.get(position)?;
    if t.input == symbol {
        return Some(((symbol, t.output), true));
    }
    let alphabet = wildcards?;
    if alphabet.contains(&symbol) {
        return None;
    }
    match (t.input, t.output) {
        (Symbol::IDENTITY, Symbol::IDENTITY) => Some(((symbol, symbol), true)),
        (Symbol::UNKNOWN, output) if !output.is_identity() => Some(((symbol, output), true)),
        _ => None,
    }
}

fn run(graph: &TransitionGraph, input: &[Symbol], query: Query) -> Result<Vec<Path>, FstError> {
    let table = if query.obey_flags {
        Some(FlagDiacriticTable::from_symbols(graph.alphabet().iter().copied())?)
    } else {
        None
    };
    let ambiguous = has_input_epsilon_cycle(graph, query.obey_flags);
    if ambiguous && query.max_number <= 0 && query.cycles < 0 {
        return Err(FstError::CyclicTransducer);
    }
    // Entries of one state at one input position; only input epsilon cycles
    // can push this above one. A bounded lookup without a cycle bound takes
    // each such cycle once.
    let entries_allowed = match (ambiguous, query.cycles) {
        (false, _) => None,
        (true, c) if c >= 0 => Some(c as u32 + 1),
        (true, _) => Some(2),
    };

    let strip_table = if query.filter_flags { table.clone() } else { None };
    let mut flag_stack = table.map(FlagStack::new);
    let wildcards = query.obey_flags.then(|| graph.alphabet());

    let mut results = ResultSet::default();
    let mut pairs: Vec<SymbolPair> = Vec::new();
    let mut entries: HashMap<(StateId, usize), u32> = HashMap::new();
    let accept = |pairs: &[SymbolPair], w: Weight, results: &mut ResultSet| {
        if query.max_weight.is_some_and(|max| w > max) {
            return;
        }
        let pairs = match &strip_table {
            Some(t) => strip_flags(pairs, t),
            None => pairs.to_vec(),
        };
        results.insert(Path { pairs, weight: w });
    };

    entries.insert((INITIAL_STATE, 0), 1);
    if input.is_empty() {
        if let Ok(fw) = graph.final_weight(INITIAL_STATE) {
            accept(&pairs, fw, &mut results);
        }
    }
    let mut stack = vec![Frame {
        state: INITIAL_STATE,
        next: 0,
        position: 0,
        weight: weight::ONE,
        pairs_len: 0,
        flag_depth: 1,
    }];

    while let Some(top) = stack.last_mut() {
        let arcs = graph.arcs(top.state);
        if top.next >= arcs.len() {
            if let Some(count) = entries.get_mut(&(top.state, top.position)) {
                *count -= 1;
            }
            if let Some(frame) = stack.pop() {
                pairs.truncate(frame.pairs_len);
                if let Some(fs) = flag_stack.as_mut() {
                    fs.truncate(frame.flag_depth);
                }
            }
            continue;
        }
        let t = arcs[top.next];
        top.next += 1;
        let (position, weight_here, pairs_len) = (top.position, top.weight, pairs.len());

        let flag = flag_stack.as_ref().and_then(|fs| fs.flag_of(&t));
        let Some((label, consumes)) = step(&t, input, position, wildcards, flag.is_some()) else {
            continue;
        };
        let next_position = position + usize::from(consumes);
        let count = entries.entry((t.target, next_position)).or_insert(0);
        if entries_allowed.is_some_and(|allowed| *count >= allowed) {
            continue;
        }
        let flag_depth = match (flag_stack.as_mut(), flag) {
            (Some(fs), Some(flag)) => {
                let before = fs.depth();
                if !fs.push(flag) {
                    continue;
                }
                before
            }
            (Some(fs), None) => fs.depth(),
            (None, _) => 1,
        };
        *count += 1;

        pairs.push(label);
        let w = weight::times(weight_here, t.weight);
        if next_position == input.len() {
            if let Ok(fw) = graph.final_weight(t.target) {
                accept(&pairs, weight::times(w, fw), &mut results);
            }
        }
        stack.push(Frame {
            state: t.target,
            next: 0,
            position: next_position,
            weight: w,
            pairs_len,
            flag_depth,
        });
    }

    let mut found = results.into_sorted();
    if query.max_number > 0 {
        found.truncate(query.max_number as usize);
    }
    log::trace!("lookup: {} results for {} input symbols", found.len(), input.len());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syms(word: &str) -> Vec<Symbol> {
        word.chars().map(|c| Symbol::intern(&c.to_string())).collect()
    }

    fn outputs(paths: &[Path]) -> Vec<String> {
        paths.iter().map(Path::output_string).collect()
    }

    fn analyzer() -> TransitionGraph {
        // cat -> cat+N::1 | cat -> cat+V::2
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::from_strs(1, "c", "c", 0.0));
        g.add_transition(1, Transition::from_strs(2, "a", "a", 0.0));
        g.add_transition(2, Transition::from_strs(3, "t", "t", 0.0));
        g.add_transition(3, Transition::from_strs(4, wfst_core::symbol::EPSILON_STRING, "+N", 1.0));
        g.add_transition(3, Transition::from_strs(4, wfst_core::symbol::EPSILON_STRING, "+V", 2.0));
        g.set_final_weight(4, 0.0);
        g
    }

    #[test]
    fn plain_lookup() {
        let found = lookup(&analyzer(), &syms("cat"), -1).unwrap();
        assert_eq!(outputs(&found), vec!["cat+N", "cat+V"]);
        assert_eq!(found[1].weight, 2.0);
        assert!(lookup(&analyzer(), &syms("ca"), -1).unwrap().is_empty());
        assert!(lookup(&analyzer(), &syms("cats"), -1).unwrap().is_empty());
    }

    #[test]
    fn limit_keeps_lightest() {
        let found = lookup(&analyzer(), &syms("cat"), 1).unwrap();
        assert_eq!(outputs(&found), vec!["cat+N"]);
    }

    #[test]
    fn max_weight_drops_heavy_results() {
        let found = lookup_fd(&analyzer(), &syms("cat"), -1, Some(1.5)).unwrap();
        assert_eq!(outputs(&found), vec!["cat+N"]);
    }

    #[test]
    fn identity_matches_unknown_input_in_fd_mode() {
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::new(0, Symbol::IDENTITY, Symbol::IDENTITY, 0.0));
        g.add_transition(0, Transition::from_strs(0, "a", "b", 0.0));
        g.set_final_weight(0, 0.0);
        let found = lookup_fd(&g, &syms("xa"), -1, None).unwrap();
        assert_eq!(outputs(&found), vec!["xb"]);
        // plain mode only matches literally
        assert!(lookup(&g, &syms("xa"), -1).unwrap().is_empty());
    }

    #[test]
    fn flags_constrain_fd_lookup() {
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::from_strs(1, "@P.F.ON@", "@P.F.ON@", 0.0));
        g.add_transition(0, Transition::from_strs(1, "@P.F.OFF@", "@P.F.OFF@", 0.0));
        g.add_transition(1, Transition::from_strs(2, "a", "a", 0.0));
        g.add_transition(2, Transition::from_strs(3, "@R.F.ON@", "@R.F.ON@", 0.0));
        g.add_transition(3, Transition::from_strs(4, wfst_core::symbol::EPSILON_STRING, "!", 0.0));
        g.add_transition(2, Transition::from_strs(4, "@D.F.ON@", "@D.F.ON@", 0.0));
        g.set_final_weight(4, 0.0);
        let found = lookup_fd(&g, &syms("a"), -1, None).unwrap();
        assert_eq!(outputs(&found), vec!["a", "a!"]);
        assert!(found.iter().all(|p| p.pairs.iter().all(|&(i, _)| !i.is_flag_diacritic())));
    }

    #[test]
    fn epsilon_cycle_needs_a_bound() {
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::from_strs(1, "a", "a", 0.0));
        g.add_transition(1, Transition::from_strs(1, wfst_core::symbol::EPSILON_STRING, "x", 1.0));
        g.set_final_weight(1, 0.0);
        assert!(matches!(
            lookup(&g, &syms("a"), -1),
            Err(FstError::CyclicTransducer)
        ));
        let bounded = lookup(&g, &syms("a"), 5).unwrap();
        assert_eq!(outputs(&bounded), vec!["a", "ax"]);

        let options = PathOptions {
            max_cycles: 2,
            obey_flags: false,
            ..PathOptions::default()
        };
        let deeper = lookup_with(&g, &syms("a"), &options).unwrap();
        assert_eq!(outputs(&deeper), vec!["a", "ax", "axx"]);
    }
}
