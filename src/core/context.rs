// ============================================================================
// spark-observables - Notification Context
// Thread-local bookkeeping for synchronous notification passes
// ============================================================================

use std::cell::Cell;

// =============================================================================
// NOTIFICATION CONTEXT
// =============================================================================

/// Thread-local state describing the notification passes currently running.
///
/// Passes nest: a handler that sets another variable starts a second pass
/// before the first one returns. The depth is informational only, nothing in
/// the crate limits it.
pub struct NotifyContext {
    /// Number of passes currently on the call stack
    depth: Cell<u32>,

    /// Total number of passes started on this thread
    passes: Cell<u64>,
}

impl NotifyContext {
    /// Create a new context with no active pass
    pub fn new() -> Self {
        Self {
            depth: Cell::new(0),
            passes: Cell::new(0),
        }
    }

    /// Enter a pass, returning the new depth
    pub fn enter_pass(&self) -> u32 {
        let depth = self.depth.get() + 1;
        self.depth.set(depth);
        self.passes.set(self.passes.get().wrapping_add(1));
        depth
    }

    /// Leave a pass, returning the new depth
    pub fn exit_pass(&self) -> u32 {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        depth
    }

    /// Current nesting depth
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    /// Passes started since the thread began
    pub fn passes(&self) -> u64 {
        self.passes.get()
    }
}

impl Default for NotifyContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    static CONTEXT: NotifyContext = NotifyContext::new();
}

/// Access the thread-local notification context.
pub fn with_context<R>(f: impl FnOnce(&NotifyContext) -> R) -> R {
    CONTEXT.with(f)
}

/// Guard that keeps a pass open until dropped.
///
/// Dropping on unwind keeps the depth balanced when a handler panics.
pub(crate) struct PassGuard {
    depth: u32,
}

impl PassGuard {
    pub(crate) fn enter() -> Self {
        Self {
            depth: with_context(|ctx| ctx.enter_pass()),
        }
    }

    pub(crate) fn depth(&self) -> u32 {
        self.depth
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        with_context(|ctx| ctx.exit_pass());
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Nesting depth of the notification pass running on this thread (0 = none).
pub fn notification_depth() -> u32 {
    with_context(|ctx| ctx.depth())
}

/// Check if a handler is currently being invoked on this thread.
pub fn is_notifying() -> bool {
    notification_depth() > 0
}

/// Number of notification passes started on this thread.
pub fn pass_count() -> u64 {
    with_context(|ctx| ctx.passes())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_creation() {
        let ctx = NotifyContext::new();
        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.passes(), 0);
    }

    #[test]
    fn pass_depth() {
        let ctx = NotifyContext::default();
        assert_eq!(ctx.enter_pass(), 1);
        assert_eq!(ctx.enter_pass(), 2);
        assert_eq!(ctx.exit_pass(), 1);
        assert_eq!(ctx.exit_pass(), 0);
        // Unbalanced exit saturates
        assert_eq!(ctx.exit_pass(), 0);
        assert_eq!(ctx.passes(), 2);
    }

    #[test]
    fn guard_balances_depth() {
        assert!(!is_notifying());
        let before = pass_count();
        {
            let outer = PassGuard::enter();
            assert_eq!(outer.depth(), 1);
            {
                let inner = PassGuard::enter();
                assert_eq!(inner.depth(), 2);
                assert_eq!(notification_depth(), 2);
            }
            assert_eq!(notification_depth(), 1);
            assert!(is_notifying());
        }
        assert_eq!(notification_depth(), 0);
        assert_eq!(pass_count(), before + 2);
    }

    #[test]
    fn guard_survives_panic() {
        let result = std::panic::catch_unwind(|| {
            let _guard = PassGuard::enter();
            panic!("handler failed");
        });
        assert!(result.is_err());
        assert_eq!(notification_depth(), 0);
    }
}
