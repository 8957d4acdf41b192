//! Rule compiler for the wfst algebra.
//!
//! Rules are built as ordinary [`Transducer`]s from a context pair, a mapping
//! and an alphabet of symbol pairs. Nothing here touches graph internals: the
//! constructions are unions, concatenations, closures and differences of
//! small pair automata, so the result can be composed with a lexicon like any
//! other transducer.
//!
//! - [`two_level`] -- Two-level constraints over symbol pairs (`=>`, `<=`, `<=>`)
//! - [`replace`] -- Bracketed replace rules matching contexts above or below the mapping

mod context;
pub mod replace;
pub mod two_level;

use wfst::Transducer;
use wfst_core::FstError;

pub use replace::{
    ReplaceType, replace, replace_down, replace_everywhere, replace_left, replace_right, replace_up,
};
pub use two_level::{two_level_if, two_level_if_and_only_if, two_level_only_if};

/// Errors raised while compiling a rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error(transparent)]
    Fst(#[from] FstError),

    #[error("context transducer is not an automaton")]
    ContextNotAutomata,

    #[error("mapping accepts no non-empty input string")]
    EmptyMapping,
}

/// Left and right context of a rule.
pub type Context = (Transducer, Transducer);
