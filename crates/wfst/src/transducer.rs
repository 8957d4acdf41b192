// Transducer facade: a graph tagged with its implementation type.
//
// Unary operations mutate in place and hand back `&mut Self` for chaining.
// Binary operations check that both operands share an implementation type,
// harmonize copies of the two graphs and only then replace `self`, so a
// failing operation leaves both operands untouched.

use std::io::{BufRead, Write};

use wfst_core::weight::{self, Weight};
use wfst_core::{FstError, ImplementationType, StateId, Symbol, SymbolPair};

use crate::algebra;
use crate::graph::{Transition, TransitionGraph};
use crate::harmonize::harmonize;
use crate::io::{self, AttReadOptions, AttReader, AttWriteOptions, BinaryReader};
use crate::paths::{self, Path, PathOptions};
use crate::push::{PushType, push_weights};
use crate::tokenizer::Tokenizer;
use crate::topology;

/// A weighted transducer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transducer {
    graph: TransitionGraph,
    kind: ImplementationType,
}

impl Default for Transducer {
    fn default() -> Self {
        Self::empty(ImplementationType::default())
    }
}

impl Transducer {
    // --- construction ---

    /// The empty language.
    pub fn empty(kind: ImplementationType) -> Self {
        Self::from_graph(TransitionGraph::new(), kind)
    }

    /// Accepts only the empty string.
    pub fn epsilon(kind: ImplementationType) -> Self {
        Self::from_graph(algebra::epsilon_graph(), kind)
    }

    /// Wrap an explicit graph. An unweighted kind zeroes every weight.
    pub fn from_graph(graph: TransitionGraph, kind: ImplementationType) -> Self {
        let mut t = Self { graph, kind };
        t.clear_weights_if_unweighted();
        t
    }

    /// Accepts the single symbol `symbol` mapped to itself.
    pub fn from_symbol(symbol: &str, kind: ImplementationType) -> Self {
        Self::from_symbol_pair(symbol, symbol, kind)
    }

    pub fn from_symbol_pair(input: &str, output: &str, kind: ImplementationType) -> Self {
        let mut graph = TransitionGraph::new();
        graph.add_transition(0, Transition::from_strs(1, input, output, weight::ONE));
        graph.set_final_weight(1, weight::ONE);
        Self::from_graph(graph, kind)
    }

    /// Accepts `text` as tokenized by `tokenizer`.
    pub fn from_string(text: &str, tokenizer: &Tokenizer, kind: ImplementationType) -> Self {
        Self::from_pairs(&tokenizer.tokenize(text), kind)
    }

    /// Maps `input` to `output`, aligning tokens left to right.
    pub fn from_string_pair(input: &str, output: &str, tokenizer: &Tokenizer, kind: ImplementationType) -> Self {
        Self::from_pairs(&tokenizer.tokenize_pair(input, output), kind)
    }

    /// A single path over `pairs`.
    pub fn from_pairs(pairs: &[SymbolPair], kind: ImplementationType) -> Self {
        let mut graph = TransitionGraph::new();
        graph.disjunct_path(pairs, weight::ONE);
        Self::from_graph(graph, kind)
    }

    /// Union of the given words, each split into characters. Unweighted.
    pub fn fsa<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokenizer = Tokenizer::new();
        let mut graph = TransitionGraph::new();
        for word in words {
            graph.disjunct_path(&tokenizer.tokenize(word.as_ref()), weight::ONE);
        }
        Self::from_graph(graph, ImplementationType::Unweighted)
    }

    /// Union of the given input/output string pairs. Unweighted.
    pub fn fst<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let tokenizer = Tokenizer::new();
        let mut graph = TransitionGraph::new();
        for (input, output) in pairs {
            graph.disjunct_path(&tokenizer.tokenize_pair(input.as_ref(), output.as_ref()), weight::ONE);
        }
        Self::from_graph(graph, ImplementationType::Unweighted)
    }

    // --- accessors ---

    pub fn graph(&self) -> &TransitionGraph {
        &self.graph
    }

    /// Mutable access to the graph. Weights written into an unweighted
    /// transducer are kept until the next operation on it.
    pub fn graph_mut(&mut self) -> &mut TransitionGraph {
        &mut self.graph
    }

    pub fn into_graph(self) -> TransitionGraph {
        self.graph
    }

    pub fn kind(&self) -> ImplementationType {
        self.kind
    }

    /// Change the implementation type. Converting to unweighted drops weights.
    pub fn convert(&mut self, kind: ImplementationType) -> &mut Self {
        self.kind = kind;
        self.clear_weights_if_unweighted();
        self
    }

    pub fn final_weights(&self) -> Vec<(StateId, Weight)> {
        self.graph.final_states().collect()
    }

    pub fn state_count(&self) -> usize {
        self.graph.state_count()
    }

    pub fn is_cyclic(&self) -> bool {
        topology::is_cyclic(&self.graph)
    }

    pub fn is_automaton(&self) -> bool {
        self.graph.is_automaton()
    }

    pub fn is_infinitely_ambiguous(&self) -> bool {
        paths::is_infinitely_ambiguous(&self.graph)
    }

    pub fn is_lookup_infinitely_ambiguous(&self, input: &[Symbol]) -> bool {
        paths::is_lookup_infinitely_ambiguous(&self.graph, input)
    }

    fn clear_weights_if_unweighted(&mut self) {
        if self.kind.is_weighted() {
            return;
        }
        self.graph.for_each_transition_mut(|_, t| t.weight = weight::ONE);
        self.graph.for_each_final_weight_mut(|_, w| *w = weight::ONE);
    }

    fn replace(&mut self, graph: TransitionGraph) -> &mut Self {
        self.graph = graph;
        self.clear_weights_if_unweighted();
        self
    }

    // --- unary operations ---

    pub fn remove_epsilons(&mut self) -> Result<&mut Self, FstError> {
        let graph = algebra::remove_epsilons(&self.graph)?;
        Ok(self.replace(graph))
    }

    pub fn determinize(&mut self) -> Result<&mut Self, FstError> {
        let graph = algebra::determinize(&self.graph)?;
        Ok(self.replace(graph))
    }

    pub fn minimize(&mut self) -> Result<&mut Self, FstError> {
        let graph = algebra::minimize(&self.graph)?;
        Ok(self.replace(graph))
    }

    /// Keep the `n` lightest paths.
    pub fn n_best(&mut self, n: usize) -> Result<&mut Self, FstError> {
        let graph = algebra::n_best(&self.graph, n)?;
        Ok(self.replace(graph))
    }

    /// Redistribute weights without changing any path's total weight.
    /// A no-op on unweighted transducers.
    pub fn push_weights(&mut self, push: PushType) -> Result<&mut Self, FstError> {
        if self.kind.is_weighted() {
            push_weights(&mut self.graph, push)?;
        }
        Ok(self)
    }

    pub fn invert(&mut self) -> &mut Self {
        let graph = algebra::invert(&self.graph);
        self.replace(graph)
    }

    pub fn reverse(&mut self) -> &mut Self {
        let graph = algebra::reverse(&self.graph);
        self.replace(graph)
    }

    pub fn input_project(&mut self) -> &mut Self {
        let graph = algebra::input_project(&self.graph);
        self.replace(graph)
    }

    pub fn output_project(&mut self) -> &mut Self {
        let graph = algebra::output_project(&self.graph);
        self.replace(graph)
    }

    pub fn repeat_star(&mut self) -> &mut Self {
        let graph = algebra::repeat_star(&self.graph);
        self.replace(graph)
    }

    pub fn repeat_plus(&mut self) -> &mut Self {
        let graph = algebra::repeat_plus(&self.graph);
        self.replace(graph)
    }

    pub fn repeat_n(&mut self, n: usize) -> &mut Self {
        let graph = algebra::repeat_n(&self.graph, n);
        self.replace(graph)
    }

    /// Zero to `n` repetitions.
    pub fn repeat_n_minus(&mut self, n: usize) -> &mut Self {
        let graph = algebra::repeat_n_minus(&self.graph, n);
        self.replace(graph)
    }

    /// `n` or more repetitions.
    pub fn repeat_n_plus(&mut self, n: usize) -> &mut Self {
        let graph = algebra::repeat_n_plus(&self.graph, n);
        self.replace(graph)
    }

    pub fn repeat_n_to_k(&mut self, n: usize, k: usize) -> &mut Self {
        let graph = algebra::repeat_n_to_k(&self.graph, n, k);
        self.replace(graph)
    }

    pub fn optionalize(&mut self) -> &mut Self {
        let graph = algebra::optionalize(&self.graph);
        self.replace(graph)
    }

    /// Compile flag diacritic constraints into the graph and drop the flags.
    pub fn eliminate_flags(&mut self) -> Result<&mut Self, FstError> {
        self.graph.eliminate_flags()?;
        Ok(self)
    }

    pub fn set_final_weights(&mut self, w: Weight) -> &mut Self {
        self.graph.set_final_weights(w);
        self.clear_weights_if_unweighted();
        self
    }

    // --- binary operations ---

    fn check_kind(&self, other: &Transducer) -> Result<(), FstError> {
        if self.kind != other.kind {
            return Err(FstError::TypeMismatch {
                expected: self.kind,
                actual: other.kind,
            });
        }
        Ok(())
    }

    /// Harmonized copies of both operands.
    fn harmonized(&self, other: &Transducer) -> Result<(TransitionGraph, TransitionGraph), FstError> {
        self.check_kind(other)?;
        let mut a = self.graph.clone();
        let mut b = other.graph.clone();
        harmonize(&mut a, &mut b);
        Ok((a, b))
    }

    fn combine<F>(&mut self, other: &Transducer, op: F) -> Result<&mut Self, FstError>
    where
        F: FnOnce(&TransitionGraph, &TransitionGraph) -> Result<TransitionGraph, FstError>,
    {
        let (a, b) = self.harmonized(other)?;
        let graph = op(&a, &b)?;
        Ok(self.replace(graph))
    }

    pub fn compose(&mut self, other: &Transducer) -> Result<&mut Self, FstError> {
        self.combine(other, algebra::compose)
    }

    /// Compose with the intersection of `rules`. See
    /// [`algebra::compose_intersect`].
    pub fn compose_intersect(&mut self, rules: &[Transducer], invert: bool) -> Result<&mut Self, FstError> {
        for rule in rules {
            self.check_kind(rule)?;
        }
        let mut a = self.graph.clone();
        let mut graphs: Vec<TransitionGraph> = rules.iter().map(|r| r.graph.clone()).collect();
        // Two rounds: the first collects every rule's symbols into `a`, the
        // second hands the full set back to each rule.
        for _ in 0..2 {
            for g in &mut graphs {
                harmonize(&mut a, g);
            }
        }
        let graph = algebra::compose_intersect(&a, &graphs, invert)?;
        Ok(self.replace(graph))
    }

    pub fn disjunct(&mut self, other: &Transducer) -> Result<&mut Self, FstError> {
        self.combine(other, |a, b| Ok(algebra::disjunct(a, b)))
    }

    pub fn concatenate(&mut self, other: &Transducer) -> Result<&mut Self, FstError> {
        self.combine(other, |a, b| Ok(algebra::concatenate(a, b)))
    }

    pub fn intersect(&mut self, other: &Transducer) -> Result<&mut Self, FstError> {
        self.combine(other, algebra::intersect)
    }

    pub fn subtract(&mut self, other: &Transducer) -> Result<&mut Self, FstError> {
        self.combine(other, algebra::subtract)
    }

    /// Union in which `self` wins on every input it accepts.
    pub fn priority_union(&mut self, other: &Transducer) -> Result<&mut Self, FstError> {
        self.combine(other, algebra::priority_union)
    }

    /// Pair every string of `self` with every string of `other`. Both must be
    /// automata.
    pub fn cross_product(&mut self, other: &Transducer) -> Result<&mut Self, FstError> {
        self.combine(other, algebra::cross_product)
    }

    pub fn shuffle(&mut self, other: &Transducer) -> Result<&mut Self, FstError> {
        self.combine(other, algebra::shuffle)
    }

    /// Whether both transducers define the same weighted relation.
    pub fn compare(&self, other: &Transducer) -> Result<bool, FstError> {
        let (a, b) = self.harmonized(other)?;
        algebra::compare(&a, &b)
    }

    // --- queries ---

    pub fn lookup(&self, input: &[Symbol], limit: i32) -> Result<Vec<Path>, FstError> {
        paths::lookup(&self.graph, input, limit)
    }

    pub fn lookup_fd(&self, input: &[Symbol], limit: i32, max_weight: Option<Weight>) -> Result<Vec<Path>, FstError> {
        paths::lookup_fd(&self.graph, input, limit, max_weight)
    }

    pub fn lookup_with(&self, input: &[Symbol], options: &PathOptions) -> Result<Vec<Path>, FstError> {
        paths::lookup_with(&self.graph, input, options)
    }

    pub fn extract_paths(&self, max_num: i32, cycles: i32) -> Result<Vec<Path>, FstError> {
        paths::extract_paths(&self.graph, max_num, cycles)
    }

    pub fn extract_paths_fd(&self, max_num: i32, cycles: i32, filter_flags: bool) -> Result<Vec<Path>, FstError> {
        paths::extract_paths_fd(&self.graph, max_num, cycles, filter_flags)
    }

    pub fn extract_paths_with(&self, options: &PathOptions) -> Result<Vec<Path>, FstError> {
        paths::extract_paths_with(&self.graph, options)
    }

    // --- interchange ---

    pub fn write_att<W: Write>(&self, out: &mut W, options: AttWriteOptions) -> Result<(), FstError> {
        io::write_att(out, &self.graph, options)
    }

    /// Read every automaton from a text stream.
    pub fn read_att<R: BufRead>(
        reader: R,
        options: AttReadOptions,
        kind: ImplementationType,
    ) -> Result<Vec<Transducer>, FstError> {
        let mut reader = AttReader::new(reader, options);
        let mut result = Vec::new();
        loop {
            match reader.read_next() {
                Ok(graph) => result.push(Self::from_graph(graph, kind)),
                Err(FstError::EndOfStream) => return Ok(result),
                Err(e) => return Err(e),
            }
        }
    }

    pub fn write_binary<W: Write>(&self, out: &mut W) -> Result<(), FstError> {
        io::write_binary(out, &self.graph, self.kind)
    }

    /// Read every record from a binary stream.
    pub fn read_binary(data: &[u8]) -> Result<Vec<Transducer>, FstError> {
        let mut reader = BinaryReader::new(data);
        let mut result = Vec::new();
        loop {
            match reader.read_next() {
                Ok((graph, kind)) => result.push(Self { graph, kind }),
                Err(FstError::EndOfStream) => return Ok(result),
                Err(e) => return Err(e),
            }
        }
    }
}
