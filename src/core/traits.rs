// ============================================================================
// spark-observables - Capability Traits
// The read-side surface shared by every node type
// ============================================================================
//
// Two capability sets:
// - Observe<T>: something that delivers `&T` to subscribers (streams, values)
// - ReadValue<T>: an Observe<T> that also has a current value
//
// Mutation (Variable::set, Emitter::push) is not part of either trait.
// ============================================================================

use std::rc::Weak;

use super::subscription::Subscription;

/// Nodes that deliver events to subscribers.
pub trait Observe<T> {
    /// Register a callback for future events.
    ///
    /// The callback stays registered until the returned handle is disposed
    /// or dropped. The current value (if any) is not replayed.
    fn observe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + 'static;

    /// Register a callback that ignores the payload.
    fn observe_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.observe(move |_| handler())
    }
}

/// Nodes that hold a current value in addition to delivering changes.
pub trait ReadValue<T>: Observe<T> {
    /// The current value.
    fn value(&self) -> T;
}

// =============================================================================
// LIVENESS (internal)
// =============================================================================

/// Type-erased view of a node used to decide whether a derived node is inert.
pub(crate) trait Liveness {
    /// True once this node, or any node it derives from, is gone.
    fn is_inert(&self) -> bool;
}

/// Check a weak dependency link: dropped or inert both count as inert.
pub(crate) fn link_is_inert(link: &Weak<dyn Liveness>) -> bool {
    link.upgrade().is_none_or(|node| node.is_inert())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct Fixed(bool);

    impl Liveness for Fixed {
        fn is_inert(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn dropped_link_is_inert() {
        let node: Rc<dyn Liveness> = Rc::new(Fixed(false));
        let link = Rc::downgrade(&node);
        assert!(!link_is_inert(&link));
        drop(node);
        assert!(link_is_inert(&link));
    }

    #[test]
    fn inert_upstream_propagates() {
        let node: Rc<dyn Liveness> = Rc::new(Fixed(true));
        assert!(link_is_inert(&Rc::downgrade(&node)));
    }
}
