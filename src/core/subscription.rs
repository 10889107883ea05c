// ============================================================================
// spark-observables - Subscriptions
// Cancellable registration tokens and the sets that own them
// ============================================================================
//
// A Subscription pairs a removal action with an optional keep-alive value.
// Public `observe` calls pass the observed node as keep-alive, so a derived
// node lives exactly as long as somebody holds one of its subscriptions.
// Wiring created by combinators passes no keep-alive: downstream owns the
// upstream *registration*, never the upstream node.
//
// Disposal is idempotent and RAII-driven: dropping the last clone of a
// handle disposes it.
// ============================================================================

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Removal action run once on disposal
pub type RemovalFn = Box<dyn FnOnce()>;

struct SubscriptionInner {
    removal: RefCell<Option<RemovalFn>>,
    keep_alive: RefCell<Option<Rc<dyn Any>>>,
}

impl SubscriptionInner {
    fn dispose(&self) {
        let removal = self.removal.borrow_mut().take();
        let Some(removal) = removal else {
            return;
        };
        removal();
        // Released after detaching: this may drop the observed node
        let keep_alive = self.keep_alive.borrow_mut().take();
        drop(keep_alive);
        tracing::debug!("subscription disposed");
    }
}

impl Drop for SubscriptionInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Handle to a registered callback.
///
/// Clones refer to the same registration. [`dispose`](Subscription::dispose)
/// through any clone detaches the callback; later calls are no-ops. When the
/// last clone is dropped the registration is disposed automatically.
///
/// # Example
///
/// ```
/// use spark_observables::variable;
///
/// let count = variable(0);
/// let sub = count.observe(|n| println!("count = {n}"));
/// count.set(1); // prints
/// sub.dispose();
/// count.set(2); // silent
/// ```
#[derive(Clone)]
#[must_use = "dropping a Subscription immediately cancels it"]
pub struct Subscription {
    inner: Rc<SubscriptionInner>,
}

impl Subscription {
    /// Create a handle from a removal action and an optional keep-alive value.
    pub fn new(keep_alive: Option<Rc<dyn Any>>, removal: impl FnOnce() + 'static) -> Self {
        Self {
            inner: Rc::new(SubscriptionInner {
                removal: RefCell::new(Some(Box::new(removal))),
                keep_alive: RefCell::new(keep_alive),
            }),
        }
    }

    /// A handle that is already disposed.
    pub fn empty() -> Self {
        Self {
            inner: Rc::new(SubscriptionInner {
                removal: RefCell::new(None),
                keep_alive: RefCell::new(None),
            }),
        }
    }

    /// Detach the callback and release the keep-alive value.
    ///
    /// Returns only after the callback is detached. Safe to call any number
    /// of times, from any clone, including from inside the callback itself.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the callback is still registered through this handle
    pub fn is_active(&self) -> bool {
        self.inner.removal.borrow().is_some()
    }

    /// Check if two handles refer to the same registration
    pub fn ptr_eq(&self, other: &Subscription) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// SUBSCRIPTION SET
// =============================================================================

/// An owned group of subscriptions, disposed together.
///
/// Derived nodes keep their upstream wiring in a `SubscriptionSet`; callers
/// can use one the same way to tie many observations to one owner.
#[derive(Default)]
pub struct SubscriptionSet {
    subscriptions: RefCell<Vec<Subscription>>,
}

impl SubscriptionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a subscription
    pub fn insert(&self, subscription: Subscription) {
        self.subscriptions.borrow_mut().push(subscription);
    }

    /// Number of subscriptions held, disposed or not
    pub fn len(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Check if the set holds nothing
    pub fn is_empty(&self) -> bool {
        self.subscriptions.borrow().is_empty()
    }

    /// Number of subscriptions still active
    pub fn active_count(&self) -> usize {
        self.subscriptions
            .borrow()
            .iter()
            .filter(|s| s.is_active())
            .count()
    }

    /// Dispose and drop every subscription, in insertion order
    pub fn clear(&self) {
        let drained: Vec<_> = self.subscriptions.borrow_mut().drain(..).collect();
        for subscription in &drained {
            subscription.dispose();
        }
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.clear();
    }
}

impl Extend<Subscription> for SubscriptionSet {
    fn extend<I: IntoIterator<Item = Subscription>>(&mut self, iter: I) {
        self.subscriptions.get_mut().extend(iter);
    }
}

impl FromIterator<Subscription> for SubscriptionSet {
    fn from_iter<I: IntoIterator<Item = Subscription>>(iter: I) -> Self {
        Self {
            subscriptions: RefCell::new(iter.into_iter().collect()),
        }
    }
}

impl fmt::Debug for SubscriptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionSet")
            .field("len", &self.len())
            .field("active", &self.active_count())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
