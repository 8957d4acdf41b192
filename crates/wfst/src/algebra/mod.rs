// Algebra over transition graphs.
//
// Every operation here takes graphs that already share an alphabet (see
// `harmonize`) and returns a fresh graph; the `Transducer` facade takes care
// of harmonizing, kind checks and in-place chaining.

mod compose;
mod determinize;
mod epsilon;
mod equivalence;
mod minimize;
mod nbest;
mod product;
mod rational;
mod transform;

pub use compose::{compose, compose_intersect};
pub use determinize::{determinize, is_deterministic};
pub use epsilon::remove_epsilons;
pub use equivalence::compare;
pub use minimize::minimize;
pub use nbest::n_best;
pub use product::{complement_over, intersect, priority_union, subtract};
pub use rational::{
    concatenate, disjunct, epsilon_graph, optionalize, repeat_n, repeat_n_minus, repeat_n_plus,
    repeat_n_to_k, repeat_plus, repeat_star,
};
pub use transform::{cross_product, input_project, invert, output_project, reverse, shuffle};

use wfst_core::weight::Weight;

/// Quantize a weight for use as a hash key. Two weights within
/// [`wfst_core::weight::DELTA`] of each other usually share a key.
pub(crate) fn quantize(w: Weight) -> i64 {
    if w.is_infinite() {
        if w > 0.0 { i64::MAX } else { i64::MIN }
    } else {
        (w / wfst_core::weight::DELTA).round() as i64
    }
}
