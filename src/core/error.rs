// ============================================================================
// spark-observables - Errors
// Failure modes of the fallible convenience APIs
// ============================================================================
//
// Propagation itself never fails: double disposal, observing an inert node
// and reentrant sets are all defined behavior. Only the `try_*` accessors
// surface a condition to the caller instead of returning a fallback.
// ============================================================================

/// Error returned by the fallible accessors of value nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ObserveError {
    /// An upstream node of this derived value has been dropped, so the node
    /// only reports its last snapshot.
    #[error("an upstream node of this derived value has been dropped")]
    UpstreamDropped,

    /// The stored value is borrowed by an in-progress `with` call.
    #[error("the stored value is currently borrowed and cannot be replaced")]
    ValueBorrowed,
}

/// Result alias used throughout the crate.
pub type Result<T, E = ObserveError> = std::result::Result<T, E>;
