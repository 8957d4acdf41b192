//! Weighted finite-state transducer algebra.
//!
//! Transducers are explicit graphs over interned symbols with tropical
//! weights. Everything is built from those graphs: the algebra returns fresh
//! graphs, weight pushing and the editing helpers rewrite a graph in place,
//! and the path engine walks one to enumerate the string pairs it accepts.
//!
//! # Architecture
//!
//! - [`graph`] -- States, transitions, final weights and the alphabet
//! - [`topology`] -- Reachability, trimming, cycle detection, topological order
//! - [`harmonize`] -- Making unknown/identity transitions explicit before a binary operation
//! - [`algebra`] -- Epsilon removal, determinization, minimization, composition and the rational operations
//! - [`push`] -- Shortest distance and weight pushing
//! - [`paths`] -- Path extraction and lookup, with flag diacritic constraints
//! - [`io`] -- Tab-separated text format and the binary record stream
//! - [`tokenizer`] -- Longest-match tokenization of strings into symbols
//! - [`transducer`] -- The [`Transducer`] facade: implementation type, harmonization, in-place chaining

pub mod algebra;
mod edit;
pub mod graph;
pub mod harmonize;
pub mod io;
pub mod paths;
pub mod push;
pub mod tokenizer;
pub mod topology;
pub mod transducer;

pub use graph::{Alphabet, INITIAL_STATE, Transition, TransitionGraph};
pub use paths::{Path, PathOptions};
pub use push::PushType;
pub use tokenizer::Tokenizer;
pub use transducer::Transducer;
pub use wfst_core::{FstError, ImplementationType, StateId, Symbol, SymbolPair, Weight};
