// ============================================================================
// spark-observables - Observable
// The read-only value node
// ============================================================================
//
// An Observable is backed by a cell (variables, constants), by a snapshot
// cell that wiring writes into (caches, stream holders), or derived from
// other nodes through a pull function. Derived values are never
// cached: every read re-runs the pull function. The one stored copy is the
// "last snapshot", returned once the node has become inert because one of
// the nodes it derives from was dropped.
//
// Ownership:
// - `upstream` holds the wiring subscriptions into the nodes this one
//   derives from (downstream owns the registration, not the node)
// - `dependencies` holds those nodes weakly, only to answer `is_inert`
// - `anchors` keeps combinator-internal helpers alive for this node's life
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::error::{ObserveError, Result};
use crate::core::registry::HandlerRegistry;
use crate::core::subscription::{Subscription, SubscriptionSet};
use crate::core::traits::{link_is_inert, Liveness, Observe, ReadValue};

/// Pull function of a derived node: `None` when an upstream is gone
pub(crate) type PullFn<T> = Box<dyn Fn() -> Option<T>>;

pub(crate) enum ValueSource<T> {
    Cell(Rc<RefCell<T>>),
    Snapshot(Rc<RefCell<T>>),
    Derived { pull: PullFn<T>, last: RefCell<T> },
}

/// Overwrite a snapshot cell from wiring code.
///
/// Snapshot cells are never lent out, so the write only fails if a `Clone`
/// impl re-enters the node; the previous value is kept then.
pub(crate) fn store_snapshot<T>(cell: &RefCell<T>, value: T) {
    match cell.try_borrow_mut() {
        Ok(mut slot) => *slot = value,
        Err(_) => tracing::debug!("snapshot busy, keeping previous value"),
    }
}

pub(crate) struct ObservableInner<T> {
    source: ValueSource<T>,
    registry: Rc<HandlerRegistry<T>>,
    upstream: SubscriptionSet,
    dependencies: RefCell<Vec<Weak<dyn Liveness>>>,
    inert: Cell<bool>,
    anchors: RefCell<Vec<Box<dyn Any>>>,
}

impl<T: Clone + 'static> ObservableInner<T> {
    fn current(&self) -> T {
        match &self.source {
            ValueSource::Cell(cell) | ValueSource::Snapshot(cell) => cell.borrow().clone(),
            ValueSource::Derived { pull, last } => {
                if self.is_inert() {
                    return last.borrow().clone();
                }
                match pull() {
                    Some(value) => {
                        *last.borrow_mut() = value.clone();
                        value
                    }
                    None => last.borrow().clone(),
                }
            }
        }
    }

    pub(crate) fn propagate(&self) -> usize {
        if self.is_inert() {
            tracing::debug!(
                label = self.registry.label().unwrap_or("-"),
                "inert node skipped notification"
            );
            return 0;
        }
        self.registry.notify(|| self.current())
    }
}

// Inertness never reverts, so the first positive answer is remembered
impl<T> Liveness for ObservableInner<T> {
    fn is_inert(&self) -> bool {
        if self.inert.get() {
            return true;
        }
        let inert = self.dependencies.borrow().iter().any(link_is_inert);
        if inert {
            self.inert.set(true);
        }
        inert
    }
}

// =============================================================================
// OBSERVABLE<T> - The public handle
// =============================================================================

/// A read-only value node.
///
/// Cloning an `Observable` creates another handle to the same node.
///
/// # Example
///
/// ```
/// use spark_observables::variable;
///
/// let celsius = variable(20.0_f64);
/// let fahrenheit = celsius.map(|c| c * 9.0 / 5.0 + 32.0);
/// assert_eq!(fahrenheit.value(), 68.0);
///
/// celsius.set(100.0);
/// assert_eq!(fahrenheit.value(), 212.0);
/// ```
pub struct Observable<T> {
    pub(crate) inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Observable<T> {
    /// True once a node this one derives from has been dropped.
    ///
    /// An inert node keeps its last value and never notifies again.
    pub fn is_inert(&self) -> bool {
        self.inner.is_inert()
    }

    /// Number of callbacks currently registered on this node
    pub fn observer_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of wiring subscriptions this node holds into its upstreams
    pub fn upstream_count(&self) -> usize {
        self.inner.upstream.active_count()
    }

    /// Label shown in log output and `Debug`
    pub fn label(&self) -> Option<&'static str> {
        self.inner.registry.label()
    }

    /// Attach a label shown in log output and `Debug`.
    pub fn with_label(self, label: &'static str) -> Self {
        self.inner.registry.set_label(Some(label));
        self
    }

    /// Keep `value` alive for as long as this node lives.
    ///
    /// Combinators hold their upstreams weakly; anchoring an intermediate node
    /// here keeps a chain such as `a.map(f).map(g)` connected.
    pub fn retain<A: 'static>(&self, value: A) {
        self.inner.anchors.borrow_mut().push(Box::new(value));
    }

    /// Create a weak handle that does not keep the node alive.
    pub fn downgrade(&self) -> WeakObservable<T> {
        WeakObservable {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Check if two handles refer to the same node
    pub fn ptr_eq(&self, other: &Observable<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Store a wiring subscription for this node's lifetime
    pub(crate) fn track(&self, subscription: Subscription) {
        self.inner.upstream.insert(subscription);
    }

    /// Record a node this one derives from
    pub(crate) fn depend_on(&self, node: Weak<dyn Liveness>) {
        self.inner.dependencies.borrow_mut().push(node);
    }
}

impl<T: Clone + 'static> Observable<T> {
    fn with_source(source: ValueSource<T>) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                source,
                registry: Rc::new(HandlerRegistry::new()),
                upstream: SubscriptionSet::new(),
                dependencies: RefCell::new(Vec::new()),
                inert: Cell::new(false),
                anchors: RefCell::new(Vec::new()),
            }),
        }
    }

    /// A node whose value never changes.
    pub fn constant(value: T) -> Self {
        Self::with_source(ValueSource::Cell(Rc::new(RefCell::new(value))))
    }

    pub(crate) fn from_cell(cell: Rc<RefCell<T>>) -> Self {
        Self::with_source(ValueSource::Cell(cell))
    }

    /// A cell-backed node whose cell is written by wiring callbacks.
    pub(crate) fn from_snapshot(cell: Rc<RefCell<T>>) -> Self {
        Self::with_source(ValueSource::Snapshot(cell))
    }

    pub(crate) fn derived(initial: T, pull: impl Fn() -> Option<T> + 'static) -> Self {
        Self::with_source(ValueSource::Derived {
            pull: Box::new(pull),
            last: RefCell::new(initial),
        })
    }

    /// The current value.
    ///
    /// Derived nodes recompute from their upstreams on every call. An inert
    /// node returns the last value it computed.
    pub fn value(&self) -> T {
        self.inner.current()
    }

    /// Like [`value`](Self::value), but fails on an inert node instead of
    /// returning the last snapshot.
    pub fn try_value(&self) -> Result<T> {
        if self.inner.is_inert() {
            return Err(ObserveError::UpstreamDropped);
        }
        Ok(self.inner.current())
    }

    /// Access the current value with a closure.
    ///
    /// Variables and constants lend their stored value without cloning, so
    /// `f` must not set the same variable (see [`Variable::try_set`]). Every
    /// other node lends a copy, and `f` may write to any of its upstreams.
    ///
    /// [`Variable::try_set`]: crate::Variable::try_set
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match &self.inner.source {
            ValueSource::Cell(cell) => f(&*cell.borrow()),
            ValueSource::Snapshot(_) | ValueSource::Derived { .. } => f(&self.inner.current()),
        }
    }

    /// Register a callback for future changes.
    ///
    /// The handle keeps this node alive; the current value is not replayed.
    pub fn observe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let keep_alive: Rc<dyn Any> = self.inner.clone();
        self.inner.registry.subscribe(Some(keep_alive), handler)
    }

    /// Register a callback that ignores the new value.
    pub fn observe_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.observe(move |_| handler())
    }

    // =========================================================================
    // WIRING (crate-internal)
    // =========================================================================

    /// Register a callback that does not keep this node alive.
    pub(crate) fn link(&self, handler: impl Fn(&T) + 'static) -> Subscription {
        self.inner.registry.subscribe(None, handler)
    }

    /// Payload-free variant of [`link`](Self::link).
    pub(crate) fn on_change(&self, handler: impl Fn() + 'static) -> Subscription {
        self.link(move |_| handler())
    }

    pub(crate) fn as_dependency(&self) -> Weak<dyn Liveness> {
        let strong: Rc<dyn Liveness> = self.inner.clone();
        Rc::downgrade(&strong)
    }

    /// Walk this node's registry with its current value.
    pub(crate) fn propagate(&self) -> usize {
        self.inner.propagate()
    }

    /// Callback that re-notifies this node, holding it weakly.
    pub(crate) fn propagator(&self) -> impl Fn() + 'static {
        let node = Rc::downgrade(&self.inner);
        move || {
            if let Some(node) = node.upgrade() {
                node.propagate();
            }
        }
    }
}

impl<T: Clone + 'static> Observe<T> for Observable<T> {
    fn observe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        Observable::observe(self, handler)
    }
}

impl<T: Clone + 'static> ReadValue<T> for Observable<T> {
    fn value(&self) -> T {
        Observable::value(self)
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("label", &self.label())
            .field("value", &self.value())
            .field("observers", &self.observer_count())
            .field("inert", &self.is_inert())
            .finish()
    }
}

// =============================================================================
// WEAK HANDLE
// =============================================================================

/// A handle that does not keep its [`Observable`] alive.
pub struct WeakObservable<T> {
    inner: Weak<ObservableInner<T>>,
}

impl<T> WeakObservable<T> {
    /// Get a strong handle if the node is still alive
    pub fn upgrade(&self) -> Option<Observable<T>> {
        self.inner.upgrade().map(|inner| Observable { inner })
    }

    /// Check if the node is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<T> Clone for WeakObservable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for WeakObservable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakObservable")
            .field("alive", &self.is_alive())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn constant_value() {
        let c = Observable::constant(7);
        assert_eq!(c.value(), 7);
        assert_eq!(c.try_value(), Ok(7));
        assert!(!c.is_inert());
    }

    #[test]
    fn with_borrows_cell() {
        let c = Observable::constant(vec![1, 2, 3]);
        assert_eq!(c.with(|v| v.len()), 3);
    }

    #[test]
    fn observe_registers_and_dispose_removes() {
        let c = Observable::constant(1);
        let sub = c.observe(|_| {});
        assert_eq!(c.observer_count(), 1);
        sub.dispose();
        assert_eq!(c.observer_count(), 0);
    }

    #[test]
    fn subscription_keeps_node_alive() {
        let c = Observable::constant(1);
        let weak = c.downgrade();
        let sub = c.observe(|_| {});
        drop(c);
        assert!(weak.is_alive());
        drop(sub);
        assert!(!weak.is_alive());
    }

    #[test]
    fn link_does_not_keep_node_alive() {
        let c = Observable::constant(1);
        let weak = c.downgrade();
        let _link = c.link(|_| {});
        drop(c);
        assert!(!weak.is_alive());
    }

    #[test]
    fn derived_pull_runs_on_every_read() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let d = Observable::derived(0, move || {
            calls_clone.set(calls_clone.get() + 1);
            Some(calls_clone.get())
        });
        assert_eq!(d.value(), 1);
        assert_eq!(d.value(), 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn derived_falls_back_to_last_value() {
        let source = Observable::constant(5);
        let upstream = source.downgrade();
        let d = Observable::derived(0, move || upstream.upgrade().map(|s| s.value() * 2));
        d.depend_on(source.as_dependency());
        assert_eq!(d.value(), 10);

        drop(source);
        assert!(d.is_inert());
        assert_eq!(d.value(), 10);
        assert_eq!(d.try_value(), Err(ObserveError::UpstreamDropped));
    }

    #[test]
    fn propagate_skips_inert_nodes() {
        let source = Observable::constant(1);
        let d = Observable::derived(1, || Some(1));
        d.depend_on(source.as_dependency());
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let _sub = d.observe(move |_| calls_clone.set(calls_clone.get() + 1));

        assert_eq!(d.propagate(), 1);
        drop(source);
        assert_eq!(d.propagate(), 0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retain_anchors_value() {
        let c = Observable::constant(0);
        let anchored = Observable::constant(1);
        let weak = anchored.downgrade();
        c.retain(anchored);
        assert!(weak.is_alive());
        drop(c);
        assert!(!weak.is_alive());
    }

    #[test]
    fn label_and_debug() {
        let c = Observable::constant(3).with_label("three");
        assert_eq!(c.label(), Some("three"));
        let text = format!("{c:?}");
        assert!(text.contains("three"));
        assert!(text.contains('3'));
    }

    #[test]
    fn accessors_need_no_clone_bound() {
        fn describe<T>(node: &Observable<T>) -> (Option<&'static str>, usize, usize, bool) {
            (node.label(), node.observer_count(), node.upstream_count(), node.is_inert())
        }
        let c = Observable::constant(1).with_label("one");
        let _sub = c.observe(|_| {});
        assert_eq!(describe(&c), (Some("one"), 1, 0, false));
    }

    #[test]
    fn inertness_is_remembered() {
        let source = Observable::constant(1);
        let middle = Observable::derived(1, || Some(1));
        middle.depend_on(source.as_dependency());
        let tail = Observable::derived(1, || Some(1));
        tail.depend_on(middle.as_dependency());
        assert!(!tail.inner.inert.get());

        drop(source);
        assert!(tail.is_inert());
        assert!(tail.inner.inert.get());
        assert!(middle.inner.inert.get());
    }

    #[test]
    fn snapshot_lends_a_copy() {
        let cell = Rc::new(RefCell::new(1));
        let node = Observable::from_snapshot(cell.clone());
        node.with(|n| store_snapshot(&cell, n + 1));
        assert_eq!(node.value(), 2);
    }

    #[test]
    fn ptr_eq_and_clone() {
        let a = Observable::constant(1);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Observable::constant(1)));
    }
}
