// ============================================================================
// spark-observables - Primitives Module
// Node types: observable values, variables, event streams
// ============================================================================

pub mod either;
pub mod observable;
pub mod stream;
pub mod variable;

pub use either::Either;
pub use observable::{Observable, WeakObservable};
pub use stream::{Emitter, Stream, WeakStream};
pub use variable::{
    mutable_variable, optional_variable, sequence_variable, variable, variable_with, Variable,
};
