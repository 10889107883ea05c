// ============================================================================
// spark-observables - Handler Registry
// Ordered identity -> callback storage with pass-safe removal
// ============================================================================
//
// Every node owns exactly one registry. Handlers are called in insertion
// order. A pass works on a snapshot of the entry list, and every entry
// carries an `active` flag that removal clears, so:
// - a handler removed mid-pass is skipped if it has not run yet
// - a handler added mid-pass waits for the next pass
// - no RefCell borrow is held while user code runs
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::context::PassGuard;
use super::subscription::Subscription;

/// Identity of a registered handler, unique within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Raw numeric value of the identity
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct HandlerEntry<T> {
    id: HandlerId,
    active: Cell<bool>,
    callback: Box<dyn Fn(&T)>,
}

/// Ordered collection of callbacks receiving `&T`.
pub struct HandlerRegistry<T> {
    entries: RefCell<Vec<Rc<HandlerEntry<T>>>>,
    next_id: Cell<u64>,
    label: Cell<Option<&'static str>>,
}

impl<T> HandlerRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            label: Cell::new(None),
        }
    }

    /// Register a callback, returning its identity
    pub fn add(&self, callback: impl Fn(&T) + 'static) -> HandlerId {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push(Rc::new(HandlerEntry {
            id,
            active: Cell::new(true),
            callback: Box::new(callback),
        }));
        id
    }

    /// Remove a callback. Returns false if the identity is not registered.
    pub fn remove(&self, id: HandlerId) -> bool {
        let removed = {
            let mut entries = self.entries.borrow_mut();
            entries
                .iter()
                .position(|entry| entry.id == id)
                .map(|index| entries.remove(index))
        };
        match removed {
            Some(entry) => {
                entry.active.set(false);
                true
            }
            None => false,
        }
        // `entry` (and its callback) may drop here, after the borrow ended
    }

    /// Check if an identity is registered
    pub fn contains(&self, id: HandlerId) -> bool {
        self.entries.borrow().iter().any(|entry| entry.id == id)
    }

    /// Number of registered callbacks
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check if no callback is registered
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Remove every callback
    pub fn clear(&self) {
        let drained: Vec<_> = self.entries.borrow_mut().drain(..).collect();
        for entry in &drained {
            entry.active.set(false);
        }
    }

    /// Label used in log output
    pub fn label(&self) -> Option<&'static str> {
        self.label.get()
    }

    /// Set the label used in log output
    pub fn set_label(&self, label: Option<&'static str>) {
        self.label.set(label);
    }

    /// Walk the registry once with a lazily produced value.
    ///
    /// `produce` is not called when no callback is registered. Returns the
    /// number of callbacks invoked.
    pub fn notify(&self, produce: impl FnOnce() -> T) -> usize {
        let snapshot: Vec<Rc<HandlerEntry<T>>> = {
            let entries = self.entries.borrow();
            if entries.is_empty() {
                return 0;
            }
            entries.clone()
        };

        let value = produce();
        let pass = PassGuard::enter();
        tracing::trace!(
            label = self.label.get().unwrap_or("-"),
            handlers = snapshot.len(),
            depth = pass.depth(),
            "notification pass"
        );

        let mut invoked = 0;
        for entry in &snapshot {
            if entry.active.get() {
                (entry.callback)(&value);
                invoked += 1;
            }
        }
        invoked
    }
}

impl<T: 'static> HandlerRegistry<T> {
    /// Register a callback and wrap the registration in a [`Subscription`].
    ///
    /// The subscription only holds the registry weakly. `keep_alive` is held
    /// until the subscription is disposed.
    pub fn subscribe(
        self: &Rc<Self>,
        keep_alive: Option<Rc<dyn Any>>,
        callback: impl Fn(&T) + 'static,
    ) -> Subscription {
        let id = self.add(callback);
        let registry = Rc::downgrade(self);
        Subscription::new(keep_alive, move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        })
    }
}

impl<T> Default for HandlerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HandlerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("label", &self.label.get())
            .field("handlers", &self.len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn Fn(&i32)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();
        let make = move |name: &'static str| -> Box<dyn Fn(&i32)> {
            let log = log_clone.clone();
            Box::new(move |_: &i32| log.borrow_mut().push(name))
        };
        (log, make)
    }

    #[test]
    fn add_assigns_unique_ids() {
        let registry = HandlerRegistry::<i32>::new();
        let a = registry.add(|_| {});
        let b = registry.add(|_| {});
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(a));
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let registry = HandlerRegistry::<i32>::new();
        let a = registry.add(|_| {});
        registry.remove(a);
        let b = registry.add(|_| {});
        assert_ne!(a, b);
        assert!(!registry.contains(a));
    }

    #[test]
    fn notify_in_insertion_order() {
        let (log, make) = recorder();
        let registry = HandlerRegistry::<i32>::new();
        registry.add(make("a"));
        registry.add(make("b"));
        registry.add(make("c"));

        assert_eq!(registry.notify(|| 1), 3);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_registry_never_produces() {
        let registry = HandlerRegistry::<i32>::new();
        let produced = Cell::new(false);
        let invoked = registry.notify(|| {
            produced.set(true);
            1
        });
        assert_eq!(invoked, 0);
        assert!(!produced.get());
    }

    #[test]
    fn remove_missing_id_is_noop() {
        let registry = HandlerRegistry::<i32>::new();
        let id = registry.add(|_| {});
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn removal_during_pass_skips_pending_entry() {
        let registry = Rc::new(HandlerRegistry::<i32>::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let victim = Rc::new(Cell::new(None::<HandlerId>));

        let first = {
            let registry = Rc::downgrade(&registry);
            let victim = victim.clone();
            let log = log.clone();
            move |_: &i32| {
                log.borrow_mut().push("first");
                if let (Some(registry), Some(id)) = (registry.upgrade(), victim.get()) {
                    registry.remove(id);
                }
            }
        };
        registry.add(first);
        let second = registry.add({
            let log = log.clone();
            move |_| log.borrow_mut().push("second")
        });
        registry.add({
            let log = log.clone();
            move |_| log.borrow_mut().push("third")
        });
        victim.set(Some(second));

        assert_eq!(registry.notify(|| 0), 2);
        assert_eq!(*log.borrow(), vec!["first", "third"]);
    }

    #[test]
    fn removal_of_current_entry_does_not_skip_others() {
        let registry = Rc::new(HandlerRegistry::<i32>::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let own_id = Rc::new(Cell::new(None::<HandlerId>));

        registry.add({
            let log = log.clone();
            move |_| log.borrow_mut().push("before")
        });
        let id = registry.add({
            let registry = Rc::downgrade(&registry);
            let own_id = own_id.clone();
            let log = log.clone();
            move |_: &i32| {
                log.borrow_mut().push("self-removing");
                if let (Some(registry), Some(id)) = (registry.upgrade(), own_id.get()) {
                    registry.remove(id);
                }
            }
        });
        own_id.set(Some(id));
        registry.add({
            let log = log.clone();
            move |_| log.borrow_mut().push("after")
        });

        registry.notify(|| 0);
        registry.notify(|| 0);
        assert_eq!(
            *log.borrow(),
            vec!["before", "self-removing", "after", "before", "after"]
        );
    }

    #[test]
    fn handler_added_during_pass_waits_for_next_pass() {
        let registry = Rc::new(HandlerRegistry::<i32>::new());
        let late_calls = Rc::new(Cell::new(0));

        registry.add({
            let registry = Rc::downgrade(&registry);
            let late_calls = late_calls.clone();
            move |_: &i32| {
                if let Some(registry) = registry.upgrade() {
                    let late_calls = late_calls.clone();
                    registry.add(move |_| late_calls.set(late_calls.get() + 1));
                }
            }
        });

        registry.notify(|| 0);
        assert_eq!(late_calls.get(), 0);
        registry.notify(|| 0);
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn clear_removes_everything() {
        let (log, make) = recorder();
        let registry = HandlerRegistry::<i32>::new();
        registry.add(make("a"));
        registry.add(make("b"));
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.notify(|| 0), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn subscription_removes_registration() {
        let registry = Rc::new(HandlerRegistry::<i32>::new());
        let sub = registry.subscribe(None, |_| {});
        assert_eq!(registry.len(), 1);
        sub.dispose();
        assert!(registry.is_empty());
    }

    #[test]
    fn subscription_outliving_registry_is_harmless() {
        let registry = Rc::new(HandlerRegistry::<i32>::new());
        let sub = registry.subscribe(None, |_| {});
        drop(registry);
        sub.dispose();
        assert!(!sub.is_active());
    }

    #[test]
    fn handler_id_display() {
        let registry = HandlerRegistry::<()>::new();
        let id = registry.add(|_| {});
        assert_eq!(id.to_string(), "#0");
        assert_eq!(id.as_u64(), 0);
    }
}
