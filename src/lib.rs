// ============================================================================
// spark-observables - Reactive Values and Event Streams for Rust
// ============================================================================
//
// Push-based observables with weak-reference wiring: derived nodes never
// keep their upstreams alive, subscriptions are RAII handles, and every
// notification is a synchronous pass in registration order.
// ============================================================================

pub mod core;
pub mod primitives;
pub mod reactivity;

mod macros;

// Re-export core items at crate root
pub use crate::core::context::{
    is_notifying, notification_depth, pass_count, with_context, NotifyContext,
};
pub use crate::core::error::{ObserveError, Result};
pub use crate::core::registry::{HandlerId, HandlerRegistry};
pub use crate::core::subscription::{RemovalFn, Subscription, SubscriptionSet};
pub use crate::core::traits::{Observe, ReadValue};

// Re-export node types and constructors
pub use primitives::either::Either;
pub use primitives::observable::{Observable, WeakObservable};
pub use primitives::stream::{Emitter, Stream, WeakStream};
pub use primitives::variable::{
    mutable_variable, optional_variable, sequence_variable, variable, variable_with, Variable,
};

// Re-export validation policies
pub use reactivity::validation::{OptionLike, Sequence, Validation, ValidationKind};

// =============================================================================
// TESTS
// =============================================================================
