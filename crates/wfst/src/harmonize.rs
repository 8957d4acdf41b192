// Alphabet harmonization of two graphs about to be combined.
//
// An unknown or identity transition stands for "any symbol this graph does
// not know". Once the other operand brings new symbols, those symbols become
// known, so the implicit meaning is spelled out with explicit transitions:
//
//   ?      (identity)  -> x:x          for every new x
//   ?:o                -> x:o
//   i:?                -> i:x
//   ?:?                -> x:y (x != y), ?:x, x:?

use wfst_core::{StateId, Symbol};

use crate::graph::{Alphabet, Transition, TransitionGraph};

/// Harmonize `a` and `b` against each other in place.
///
/// Afterwards both graphs share the union alphabet and each still defines the
/// same relation it did over its own alphabet.
pub fn harmonize(a: &mut TransitionGraph, b: &mut TransitionGraph) {
    let new_for_a = unknown_to(a.alphabet(), b.alphabet());
    let new_for_b = unknown_to(b.alphabet(), a.alphabet());

    let added_a = expand(a, &new_for_a);
    let added_b = expand(b, &new_for_b);

    a.add_symbols_to_alphabet(new_for_a.iter().copied());
    b.add_symbols_to_alphabet(new_for_b.iter().copied());

    log::debug!(
        "harmonize: {} + {} new symbols, {} + {} transitions added",
        new_for_a.len(),
        new_for_b.len(),
        added_a,
        added_b
    );
}

/// Symbols of `other` that `own` does not know, reserved symbols excluded.
fn unknown_to(own: &Alphabet, other: &Alphabet) -> Vec<Symbol> {
    other
        .iter()
        .copied()
        .filter(|s| !s.is_reserved() && !own.contains(s))
        .collect()
}

/// Expand the unknown and identity transitions of `graph` with `symbols`.
/// Returns the number of transitions added.
pub(crate) fn expand(graph: &mut TransitionGraph, symbols: &[Symbol]) -> usize {
    if symbols.is_empty() {
        return 0;
    }
    let mut added = 0;
    let states: Vec<StateId> = graph.states().collect();
    for state in states {
        let mut extra = Vec::new();
        for t in graph.arcs(state) {
            expansions(t, symbols, &mut extra);
        }
        added += extra.len();
        for t in extra {
            graph.add_transition(state, t);
        }
    }
    added
}

fn expansions(t: &Transition, symbols: &[Symbol], out: &mut Vec<Transition>) {
    let with = |input: Symbol, output: Symbol| Transition::new(t.target, input, output, t.weight);
    match (t.input, t.output) {
        (Symbol::IDENTITY, Symbol::IDENTITY) => {
            out.extend(symbols.iter().map(|&x| with(x, x)));
        }
        (Symbol::UNKNOWN, Symbol::UNKNOWN) => {
            for &x in symbols {
                for &y in symbols {
                    if x != y {
                        out.push(with(x, y));
                    }
                }
                out.push(with(Symbol::UNKNOWN, x));
                out.push(with(x, Symbol::UNKNOWN));
            }
        }
        (Symbol::UNKNOWN, output) if !output.is_identity() => {
            out.extend(symbols.iter().map(|&x| with(x, output)));
        }
        (input, Symbol::UNKNOWN) if !input.is_identity() => {
            out.extend(symbols.iter().map(|&x| with(input, x)));
        }
        _ => {}
    }
}
