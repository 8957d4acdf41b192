// In-place editing of a transition graph: path insertion, free insertion,
// symbol substitution, completion and flag diacritic handling.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use wfst_core::flags::{FlagDiacriticTable, FlagState, split_flag};
use wfst_core::weight::{self, Weight};
use wfst_core::{FstError, StateId, Symbol, SymbolPair};

use crate::graph::{INITIAL_STATE, Transition, TransitionGraph};
use crate::topology;

impl TransitionGraph {
    /// Insert the path `pairs` from the initial state, reusing existing
    /// transitions with the same labels. If the path is already accepted, its
    /// final weight becomes the smaller of the two.
    pub fn disjunct_path(&mut self, pairs: &[SymbolPair], weight: Weight) {
        let mut state = INITIAL_STATE;
        for &(input, output) in pairs {
            let existing = self
                .arcs(state)
                .iter()
                .find(|t| t.input == input && t.output == output)
                .map(|t| t.target);
            state = match existing {
                Some(target) => target,
                None => {
                    let next = self.add_state();
                    self.add_transition(state, Transition::new(next, input, output, weight::ONE));
                    next
                }
            };
        }
        let best = weight::plus(self.final_or_zero(state), weight);
        self.set_final_weight(state, best);
    }

    /// Add a `pair` self-loop with `weight` on every state.
    pub fn insert_freely(&mut self, pair: SymbolPair, weight: Weight) {
        for state in self.states() {
            self.add_transition(state, Transition::new(state, pair.0, pair.1, weight));
        }
    }

    /// Allow any path of `other` to be inserted at any state: each state gets
    /// its own copy of `other`, entered and left through epsilon transitions.
    pub fn insert_freely_transducer(&mut self, other: &TransitionGraph) {
        let states: Vec<StateId> = self.states().collect();
        for state in states {
            self.splice(state, state, other, weight::ONE);
        }
    }

    /// Append a copy of `other` entered from `from` with `weight` and leaving
    /// into `to` through each of its final states.
    fn splice(&mut self, from: StateId, to: StateId, other: &TransitionGraph, weight: Weight) {
        let offset = self.append_graph(other);
        self.add_transition(
            from,
            Transition::new(offset, Symbol::EPSILON, Symbol::EPSILON, weight),
        );
        let finals: Vec<(StateId, Weight)> = other.final_states().collect();
        for (state, w) in finals {
            let copy = state + offset;
            self.clear_final(copy);
            self.add_transition(copy, Transition::new(to, Symbol::EPSILON, Symbol::EPSILON, w));
        }
    }

    /// Replace `old` with `new` on the chosen sides of every transition.
    pub fn substitute_symbol(&mut self, old: Symbol, new: Symbol, input_side: bool, output_side: bool) {
        let mut touched = false;
        self.for_each_transition_mut(|_, t| {
            if input_side && t.input == old {
                t.input = new;
                touched = true;
            }
            if output_side && t.output == old {
                t.output = new;
                touched = true;
            }
        });
        if touched || self.alphabet().contains(&old) {
            self.add_symbol_to_alphabet(new);
        }
        if !self.symbols_used().contains(&old) {
            self.remove_symbol_from_alphabet(old);
        }
    }

    /// Replace symbols on both sides according to `map`.
    pub fn substitute_symbols(&mut self, map: &HashMap<Symbol, Symbol>) {
        self.for_each_transition_mut(|_, t| {
            if let Some(&s) = map.get(&t.input) {
                t.input = s;
            }
            if let Some(&s) = map.get(&t.output) {
                t.output = s;
            }
        });
        self.add_symbols_to_alphabet(map.values().copied());
        let used = self.symbols_used();
        for old in map.keys() {
            if !used.contains(old) {
                self.remove_symbol_from_alphabet(*old);
            }
        }
    }

    /// Relabel every `old` transition as `new`.
    pub fn substitute_pair(&mut self, old: SymbolPair, new: SymbolPair) {
        self.substitute_pair_with_pairs(old, &[new]);
    }

    /// Replace every `old` transition by one parallel transition per pair in
    /// `new`, keeping target and weight. An empty `new` deletes them.
    pub fn substitute_pair_with_pairs(&mut self, old: SymbolPair, new: &[SymbolPair]) {
        for state in self.states() {
            let arcs = self.arcs_mut(state);
            let mut replaced = Vec::with_capacity(arcs.len());
            for t in arcs.drain(..) {
                if t.pair() == old {
                    replaced.extend(
                        new.iter()
                            .map(|&(input, output)| Transition { input, output, ..t }),
                    );
                } else {
                    replaced.push(t);
                }
            }
            *arcs = replaced;
        }
        for &(input, output) in new {
            self.add_symbol_to_alphabet(input);
            self.add_symbol_to_alphabet(output);
        }
    }

    /// Replace every `old` transition by a copy of `other`, carrying the
    /// transition's weight on the way in.
    pub fn substitute_pair_with_transducer(&mut self, old: SymbolPair, other: &TransitionGraph) {
        let mut sites: Vec<(StateId, Transition)> = Vec::new();
        for state in self.states() {
            let arcs = self.arcs_mut(state);
            arcs.retain(|t| {
                if t.pair() == old {
                    sites.push((state, *t));
                    false
                } else {
                    true
                }
            });
        }
        for (state, t) in sites {
            self.splice(state, t.target, other, t.weight);
        }
    }

    /// Make the graph complete: every state gets a transition for every
    /// symbol of the alphabet, missing ones leading to a new non-final sink.
    /// Epsilon and unknown are skipped; identity stands for unseen symbols.
    pub fn complete(&mut self) -> Result<(), FstError> {
        if !self.is_automaton() {
            return Err(FstError::NotAutomata("complete"));
        }
        let symbols: Vec<Symbol> = self
            .alphabet()
            .iter()
            .copied()
            .filter(|s| !s.is_epsilon() && !s.is_unknown())
            .collect();
        let sink = self.add_state();
        for state in self.states() {
            let present: BTreeSet<Symbol> = self.arcs(state).iter().map(|t| t.input).collect();
            let missing: Vec<Transition> = symbols
                .iter()
                .filter(|s| !present.contains(s))
                .map(|&s| Transition::new(sink, s, s, weight::ONE))
                .collect();
            self.arcs_mut(state).extend(missing);
        }
        Ok(())
    }

    /// Flag diacritic symbols of the alphabet.
    pub fn get_flags(&self) -> BTreeSet<Symbol> {
        self.alphabet()
            .iter()
            .copied()
            .filter(|s| s.is_flag_diacritic())
            .collect()
    }

    /// Turn the flag diacritics of `feature` into epsilons and drop them from
    /// the alphabet.
    pub fn flag_purge(&mut self, feature: &str) {
        let purged: BTreeSet<Symbol> = self
            .get_flags()
            .into_iter()
            .filter(|s| split_flag(s.as_str()).is_some_and(|(_, f, _)| f == feature))
            .collect();
        self.epsilonize(&purged);
    }

    /// Compile the flag diacritics out of the graph.
    ///
    /// States are split by the feature values reached on the way there, flag
    /// transitions become epsilons, and those whose check fails are dropped.
    /// The accepted relation is the one flag-aware lookup sees.
    pub fn eliminate_flags(&mut self) -> Result<(), FstError> {
        let flags = self.get_flags();
        if flags.is_empty() {
            return Ok(());
        }
        let table = FlagDiacriticTable::from_symbols(flags.iter().copied())?;
        let mut result = TransitionGraph::new().with_alphabet_of(self);
        let start = (INITIAL_STATE, table.initial_state());
        let mut ids: HashMap<(StateId, FlagState), StateId> = HashMap::new();
        ids.insert(start.clone(), INITIAL_STATE);
        let mut worklist = vec![start];

        while let Some(key) = worklist.pop() {
            let source = ids[&key];
            let (state, values) = key;
            if self.is_final_state(state) {
                result.set_final_weight(source, self.final_or_zero(state));
            }
            for t in self.arcs(state) {
                let mut next = values.clone();
                let passes = [t.input, t.output]
                    .into_iter()
                    .filter_map(|s| table.get(s))
                    .take(1)
                    .all(|fd| next.apply(fd));
                if !passes {
                    continue;
                }
                let strip = |s: Symbol| if table.is_flag(s) { Symbol::EPSILON } else { s };
                let key = (t.target, next);
                let len = ids.len() as StateId;
                let target = *ids.entry(key.clone()).or_insert_with(|| {
                    worklist.push(key);
                    len
                });
                result.add_transition_with(
                    source,
                    Transition::new(target, strip(t.input), strip(t.output), t.weight),
                    false,
                );
            }
        }
        result.ensure_state(ids.len() as StateId - 1);
        for &s in &flags {
            result.remove_symbol_from_alphabet(s);
        }
        topology::connect(&mut result);
        log::debug!(
            "eliminate_flags: {} -> {} states",
            self.state_count(),
            result.state_count()
        );
        *self = result;
        Ok(())
    }

    fn epsilonize(&mut self, symbols: &BTreeSet<Symbol>) {
        if symbols.is_empty() {
            return;
        }
        self.for_each_transition_mut(|_, t| {
            if symbols.contains(&t.input) {
                t.input = Symbol::EPSILON;
            }
            if symbols.contains(&t.output) {
                t.output = Symbol::EPSILON;
            }
        });
        for &s in symbols {
            self.remove_symbol_from_alphabet(s);
        }
        log::trace!("epsilonized {} flag symbols", symbols.len());
    }

    /// Set the final weight of every final state to `weight`.
    pub fn set_final_weights(&mut self, weight: Weight) {
        self.for_each_final_weight_mut(|_, w| *w = weight);
    }
}
