// Transition graph: the mutable, explicit state/transition representation
// every algorithm in this crate reads and produces.

use std::collections::BTreeSet;
use std::ops::Range;

use wfst_core::weight::{self, Weight};
use wfst_core::{FstError, StateId, Symbol, SymbolPair};

/// The set of symbols known to a graph.
pub type Alphabet = BTreeSet<Symbol>;

/// The initial state of every graph.
pub const INITIAL_STATE: StateId = 0;

/// One outgoing transition. The source state is implied by where it is stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub target: StateId,
    pub input: Symbol,
    pub output: Symbol,
    pub weight: Weight,
}

impl Transition {
    pub fn new(target: StateId, input: Symbol, output: Symbol, weight: Weight) -> Self {
        Self {
            target,
            input,
            output,
            weight,
        }
    }

    /// A transition from symbol strings, interning them as needed.
    pub fn from_strs(target: StateId, input: &str, output: &str, weight: Weight) -> Self {
        Self::new(target, Symbol::intern(input), Symbol::intern(output), weight)
    }

    pub fn pair(&self) -> SymbolPair {
        (self.input, self.output)
    }

    /// Both sides are epsilon.
    pub fn is_epsilon(&self) -> bool {
        self.input.is_epsilon() && self.output.is_epsilon()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct StateData {
    transitions: Vec<Transition>,
    final_weight: Option<Weight>,
}

/// A weighted transducer as an explicit graph.
///
/// States are dense from zero; state 0 is the unique initial state and always
/// exists. The alphabet always contains epsilon, unknown and identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionGraph {
    states: Vec<StateData>,
    alphabet: Alphabet,
}

impl Default for TransitionGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionGraph {
    /// A graph with the single non-final state 0.
    pub fn new() -> Self {
        let mut alphabet = Alphabet::new();
        alphabet.insert(Symbol::EPSILON);
        alphabet.insert(Symbol::UNKNOWN);
        alphabet.insert(Symbol::IDENTITY);
        Self {
            states: vec![StateData::default()],
            alphabet,
        }
    }

    /// Add a new state and return its handle.
    pub fn add_state(&mut self) -> StateId {
        self.states.push(StateData::default());
        (self.states.len() - 1) as StateId
    }

    /// Make sure states `0..=state` exist. Idempotent.
    pub fn ensure_state(&mut self, state: StateId) -> StateId {
        let needed = state as usize + 1;
        if self.states.len() < needed {
            self.states.resize_with(needed, StateData::default);
        }
        state
    }

    /// Add a transition leaving `state`, registering its symbols in the alphabet.
    ///
    /// Missing source and target states are created.
    pub fn add_transition(&mut self, state: StateId, transition: Transition) {
        self.add_transition_with(state, transition, true);
    }

    /// Add a transition, registering its symbols only when `register_symbols` is set.
    pub fn add_transition_with(
        &mut self,
        state: StateId,
        transition: Transition,
        register_symbols: bool,
    ) {
        self.ensure_state(state.max(transition.target));
        if register_symbols {
            self.alphabet.insert(transition.input);
            self.alphabet.insert(transition.output);
        }
        self.states[state as usize].transitions.push(transition);
    }

    /// Set the final weight of `state`, creating the state if absent.
    pub fn set_final_weight(&mut self, state: StateId, weight: Weight) {
        self.ensure_state(state);
        self.states[state as usize].final_weight = Some(weight);
    }

    /// Make `state` non-final.
    pub fn remove_final_weight(&mut self, state: StateId) -> Result<(), FstError> {
        self.check_state(state)?;
        self.states[state as usize].final_weight = None;
        Ok(())
    }

    /// Make `state` non-final if it exists.
    pub(crate) fn clear_final(&mut self, state: StateId) {
        if let Some(data) = self.states.get_mut(state as usize) {
            data.final_weight = None;
        }
    }

    pub fn is_final_state(&self, state: StateId) -> bool {
        self.states
            .get(state as usize)
            .is_some_and(|s| s.final_weight.is_some())
    }

    /// Final weight of `state`, or `NotFinalState` if it has none.
    pub fn final_weight(&self, state: StateId) -> Result<Weight, FstError> {
        self.check_state(state)?;
        self.states[state as usize]
            .final_weight
            .ok_or(FstError::NotFinalState(state))
    }

    /// Final weight or [`weight::ZERO`] for non-final states.
    pub(crate) fn final_or_zero(&self, state: StateId) -> Weight {
        self.states
            .get(state as usize)
            .and_then(|s| s.final_weight)
            .unwrap_or(weight::ZERO)
    }

    /// All final states with their weights, ascending.
    pub fn final_states(&self) -> impl Iterator<Item = (StateId, Weight)> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.final_weight.map(|w| (i as StateId, w)))
    }

    /// All states, ascending.
    pub fn states(&self) -> Range<StateId> {
        0..self.states.len() as StateId
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    /// Transitions leaving `state`, in insertion order.
    pub fn transitions(&self, state: StateId) -> Result<&[Transition], FstError> {
        self.check_state(state)?;
        Ok(&self.states[state as usize].transitions)
    }

    pub fn transitions_mut(&mut self, state: StateId) -> Result<&mut Vec<Transition>, FstError> {
        self.check_state(state)?;
        Ok(&mut self.states[state as usize].transitions)
    }

    /// Unchecked access for states taken from [`states`](Self::states).
    pub(crate) fn arcs(&self, state: StateId) -> &[Transition] {
        &self.states[state as usize].transitions
    }

    pub(crate) fn arcs_mut(&mut self, state: StateId) -> &mut Vec<Transition> {
        &mut self.states[state as usize].transitions
    }

    /// Iterate `(source, transition)` over the whole graph.
    pub fn iter_transitions(&self) -> impl Iterator<Item = (StateId, &Transition)> + '_ {
        self.states
            .iter()
            .enumerate()
            .flat_map(|(i, s)| s.transitions.iter().map(move |t| (i as StateId, t)))
    }

    /// Apply `f` to every transition in place.
    pub fn for_each_transition_mut<F: FnMut(StateId, &mut Transition)>(&mut self, mut f: F) {
        for (i, state) in self.states.iter_mut().enumerate() {
            for t in &mut state.transitions {
                f(i as StateId, t);
            }
        }
    }

    /// Apply `f` to every final weight in place.
    pub fn for_each_final_weight_mut<F: FnMut(StateId, &mut Weight)>(&mut self, mut f: F) {
        for (i, state) in self.states.iter_mut().enumerate() {
            if let Some(w) = state.final_weight.as_mut() {
                f(i as StateId, w);
            }
        }
    }

    fn check_state(&self, state: StateId) -> Result<(), FstError> {
        if (state as usize) < self.states.len() {
            Ok(())
        } else {
            Err(FstError::StateIndexOutOfBounds {
                state,
                count: self.states.len(),
            })
        }
    }

    // --- alphabet ---

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn add_symbol_to_alphabet(&mut self, symbol: Symbol) {
        self.alphabet.insert(symbol);
    }

    pub fn add_symbols_to_alphabet<I: IntoIterator<Item = Symbol>>(&mut self, symbols: I) {
        self.alphabet.extend(symbols);
    }

    /// Remove `symbol` from the alphabet.
    ///
    /// Nothing checks whether the symbol still occurs in a transition; doing
    /// so leaves alphabet-dependent operations (harmonization, complement,
    /// identity matching) working from an incomplete alphabet. Reserved
    /// symbols are never removed.
    pub fn remove_symbol_from_alphabet(&mut self, symbol: Symbol) {
        if !symbol.is_reserved() {
            self.alphabet.remove(&symbol);
        }
    }

    /// Symbols that occur in some transition.
    pub fn symbols_used(&self) -> Alphabet {
        let mut used = Alphabet::new();
        for (_, t) in self.iter_transitions() {
            used.insert(t.input);
            used.insert(t.output);
        }
        used
    }

    /// Drop every non-reserved alphabet symbol that no transition uses.
    pub fn prune_alphabet(&mut self) {
        let used = self.symbols_used();
        self.alphabet
            .retain(|s| s.is_reserved() || used.contains(s));
    }

    /// Whether every transition maps a symbol onto itself.
    pub fn is_automaton(&self) -> bool {
        self.iter_transitions().all(|(_, t)| t.input == t.output)
    }

    /// Sort the transitions of every state by (input, output, target, weight).
    pub fn sort_arcs(&mut self) {
        for state in &mut self.states {
            state.transitions.sort_by(|a, b| {
                (a.input, a.output, a.target)
                    .cmp(&(b.input, b.output, b.target))
                    .then(weight::compare(a.weight, b.weight))
            });
        }
    }

    /// Add `other`'s alphabet to this graph's alphabet.
    pub(crate) fn with_alphabet_of(mut self, other: &TransitionGraph) -> Self {
        self.alphabet.extend(other.alphabet.iter().copied());
        self
    }

    /// Append a copy of `other`'s states, returning the offset added to its state ids.
    pub(crate) fn append_graph(&mut self, other: &TransitionGraph) -> StateId {
        let offset = self.states.len() as StateId;
        for state in &other.states {
            let mut copy = state.clone();
            for t in &mut copy.transitions {
                t.target += offset;
            }
            self.states.push(copy);
        }
        self.alphabet.extend(other.alphabet.iter().copied());
        offset
    }

    /// Keep only the states for which `keep` is true, renumbering the rest
    /// densely. State 0 is always kept.
    pub(crate) fn retain_states(&mut self, keep: &[bool]) {
        let mut mapping = vec![None; self.states.len()];
        let mut next: StateId = 0;
        for (i, slot) in mapping.iter_mut().enumerate() {
            if i == 0 || keep.get(i).copied().unwrap_or(false) {
                *slot = Some(next);
                next += 1;
            }
        }
        let old = std::mem::take(&mut self.states);
        for (i, mut state) in old.into_iter().enumerate() {
            if mapping[i].is_none() {
                continue;
            }
            state.transitions.retain_mut(|t| match mapping[t.target as usize] {
                Some(target) => {
                    t.target = target;
                    true
                }
                None => false,
            });
            self.states.push(state);
        }
    }
}
