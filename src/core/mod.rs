// ============================================================================
// spark-observables - Core Module
// Registry, subscriptions, capability traits, errors and notification context
// ============================================================================

pub mod context;
pub mod error;
pub mod registry;
pub mod subscription;
pub mod traits;

pub use context::{is_notifying, notification_depth, pass_count, with_context, NotifyContext};
pub use error::{ObserveError, Result};
pub use registry::{HandlerId, HandlerRegistry};
pub use subscription::{RemovalFn, Subscription, SubscriptionSet};
pub use traits::{Observe, ReadValue};
