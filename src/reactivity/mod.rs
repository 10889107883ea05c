// ============================================================================
// spark-observables - Reactivity Module
// Validation policies and the combinators that build derived nodes
// ============================================================================

pub mod caching;
pub mod logic;
pub mod stream_ops;
pub mod validation;
pub mod value_ops;

pub use validation::{
    always_notify, not_equal, sequence_differs, OptionLike, Sequence, ValidateFn, Validation,
    ValidationKind,
};
