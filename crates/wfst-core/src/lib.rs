//! Shared building blocks for the wfst transducer crates.
//!
//! # Architecture
//!
//! - [`symbol`] -- Process-wide symbol interning and the reserved symbols
//! - [`weight`] -- Tropical semiring arithmetic
//! - [`flags`] -- Flag diacritic parsing and constraint checking (P, N, R, D, C, U)
//!
//! The error taxonomy used by every crate in the workspace lives here as well,
//! so that the rule compiler and the algebra report failures the same way.

pub mod flags;
pub mod symbol;
pub mod weight;

pub use symbol::{Symbol, SymbolPair};
pub use weight::Weight;

/// Handle of a state inside one transducer. State 0 is always the initial state.
pub type StateId = u32;

/// The implementation variants a transducer can be tagged with.
///
/// Both variants share one in-memory representation; the tag only decides
/// whether weights are tracked and is written into binary stream records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImplementationType {
    /// Tropical semiring weights (min, +).
    #[default]
    Tropical,
    /// Every weight is fixed to zero.
    Unweighted,
}

impl ImplementationType {
    /// Tag byte used in binary stream records.
    pub fn tag(self) -> u8 {
        match self {
            ImplementationType::Tropical => 1,
            ImplementationType::Unweighted => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ImplementationType::Tropical),
            2 => Some(ImplementationType::Unweighted),
            _ => None,
        }
    }

    pub fn is_weighted(self) -> bool {
        self == ImplementationType::Tropical
    }
}

/// Error type shared by all transducer operations.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    #[error("state {0} is not final")]
    NotFinalState(StateId),
    #[error("state {state} is out of bounds (state count {count})")]
    StateIndexOutOfBounds { state: StateId, count: usize },
    #[error("transducer is cyclic and neither max_num nor cycles bounds the extraction")]
    CyclicTransducer,
    #[error("invalid text format on line {line}: {message}")]
    NotValidFormat { line: usize, message: String },
    #[error("implementation type mismatch: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        expected: ImplementationType,
        actual: ImplementationType,
    },
    #[error("end of transducer stream")]
    EndOfStream,
    #[error("not a transducer stream: {0}")]
    NotTransducerStream(String),
    #[error("{0} requires automata (input equal to output on every transition)")]
    NotAutomata(&'static str),
    #[error("invalid flag diacritic: {0}")]
    InvalidFlagDiacritic(String),
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("incorrect UTF-8 coding in symbol data")]
    IncorrectUtf8Coding,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Broken invariant or violated input contract. Never retryable.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl FstError {
    /// Whether the error signals an invariant violation rather than a
    /// recoverable condition such as end of stream or malformed input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FstError::Fatal(_))
    }
}
