// ============================================================================
// spark-observables - Event Stream
// Value-less nodes that deliver discrete events
// ============================================================================
//
// A Stream is read-only; only its Emitter can push. Pushing with nobody
// listening does no work at all: the payload producer is never run.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use crate::core::registry::HandlerRegistry;
use crate::core::subscription::{Subscription, SubscriptionSet};
use crate::core::traits::{link_is_inert, Liveness, Observe};

pub(crate) struct StreamInner<T> {
    registry: Rc<HandlerRegistry<T>>,
    upstream: SubscriptionSet,
    dependencies: RefCell<Vec<Weak<dyn Liveness>>>,
    inert: Cell<bool>,
    anchors: RefCell<Vec<Box<dyn Any>>>,
}

impl<T> Liveness for StreamInner<T> {
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
// STREAM<T>
// =============================================================================

/// A node that delivers discrete events of type `T`.
pub struct Stream<T> {
    inner: Rc<StreamInner<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Stream<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(StreamInner {
                registry: Rc::new(HandlerRegistry::new()),
                upstream: SubscriptionSet::new(),
                dependencies: RefCell::new(Vec::new()),
                inert: Cell::new(false),
                anchors: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register a callback for future events.
    ///
    /// The handle keeps this stream alive.
    pub fn observe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let keep_alive: Rc<dyn Any> = self.inner.clone();
        self.inner.registry.subscribe(Some(keep_alive), handler)
    }

    /// Register a callback that ignores the payload.
    pub fn observe_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.observe(move |_| handler())
    }

    /// True once a node this stream derives from has been dropped.
    pub fn is_inert(&self) -> bool {
        self.inner.is_inert()
    }

    /// Number of callbacks currently registered on this stream
    pub fn observer_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of wiring subscriptions this stream holds into its upstreams
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

    /// Keep `value` alive for as long as this stream lives.
    pub fn retain<A: 'static>(&self, value: A) {
        self.inner.anchors.borrow_mut().push(Box::new(value));
    }

    /// Create a weak handle that does not keep the stream alive.
    pub fn downgrade(&self) -> WeakStream<T> {
        WeakStream {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Check if two handles refer to the same stream
    pub fn ptr_eq(&self, other: &Stream<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // WIRING (crate-internal)
    // =========================================================================

    /// Register a callback that does not keep this stream alive.
    pub(crate) fn link(&self, handler: impl Fn(&T) + 'static) -> Subscription {
        self.inner.registry.subscribe(None, handler)
    }

    pub(crate) fn track(&self, subscription: Subscription) {
        self.inner.upstream.insert(subscription);
    }

    pub(crate) fn depend_on(&self, node: Weak<dyn Liveness>) {
        self.inner.dependencies.borrow_mut().push(node);
    }

    pub(crate) fn as_dependency(&self) -> Weak<dyn Liveness> {
        let strong: Rc<dyn Liveness> = self.inner.clone();
        Rc::downgrade(&strong)
    }

    /// Deliver a lazily produced event. Returns the number of callbacks run.
    pub(crate) fn emit_with(&self, produce: impl FnOnce() -> T) -> usize {
        if self.inner.is_inert() {
            tracing::debug!(
                label = self.label().unwrap_or("-"),
                "inert stream dropped event"
            );
            return 0;
        }
        self.inner.registry.notify(produce)
    }
}

impl<T: 'static> Observe<T> for Stream<T> {
    fn observe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        Stream::observe(self, handler)
    }
}

impl<T: 'static> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("label", &self.label())
            .field("observers", &self.observer_count())
            .field("inert", &self.is_inert())
            .finish()
    }
}

/// A handle that does not keep its [`Stream`] alive.
pub struct WeakStream<T> {
    inner: Weak<StreamInner<T>>,
}

impl<T> WeakStream<T> {
    /// Get a strong handle if the stream is still alive
    pub fn upgrade(&self) -> Option<Stream<T>> {
        self.inner.upgrade().map(|inner| Stream { inner })
    }

    /// Check if the stream is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<T> Clone for WeakStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for WeakStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStream")
            .field("alive", &self.is_alive())
            .finish()
    }
}

// =============================================================================
// EMITTER<T> - The push side
// =============================================================================

/// The push-capable side of a [`Stream`].
///
/// # Example
///
/// ```
/// use spark_observables::Emitter;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let clicks = Emitter::<(i32, i32)>::new();
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let log_clone = log.clone();
/// let _sub = clicks.observe(move |pos| log_clone.borrow_mut().push(*pos));
///
/// clicks.push((1, 2));
/// clicks.push((3, 4));
/// assert_eq!(*log.borrow(), vec![(1, 2), (3, 4)]);
/// ```
pub struct Emitter<T> {
    stream: Stream<T>,
}

impl<T: 'static> Emitter<T> {
    /// Create an emitter with a fresh stream and no subscribers.
    pub fn new() -> Self {
        Self {
            stream: Stream::new(),
        }
    }

    /// Deliver `value` to every subscriber, in registration order.
    ///
    /// Returns the number of callbacks run.
    pub fn push(&self, value: T) -> usize {
        self.stream.emit_with(move || value)
    }

    /// Deliver an event built only if somebody is listening.
    pub fn push_with(&self, produce: impl FnOnce() -> T) -> usize {
        self.stream.emit_with(produce)
    }

    /// Read-only handle to the stream.
    pub fn stream(&self) -> Stream<T> {
        self.stream.clone()
    }

    /// Attach a label shown in log output and `Debug`.
    pub fn with_label(self, label: &'static str) -> Self {
        Self {
            stream: self.stream.with_label(label),
        }
    }
}

impl Emitter<()> {
    /// Push a payload-free event.
    pub fn emit(&self) -> usize {
        self.push(())
    }
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            stream: self.stream.clone(),
        }
    }
}

impl<T> Deref for Emitter<T> {
    type Target = Stream<T>;

    fn deref(&self) -> &Stream<T> {
        &self.stream
    }
}

impl<T> From<Emitter<T>> for Stream<T> {
    fn from(emitter: Emitter<T>) -> Self {
        emitter.stream
    }
}

impl<T> From<&Emitter<T>> for Stream<T> {
    fn from(emitter: &Emitter<T>) -> Self {
        emitter.stream.clone()
    }
}

impl<T: 'static> Observe<T> for Emitter<T> {
    fn observe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.stream.observe(handler)
    }
}

impl<T: 'static> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Emitter").field(&self.stream).finish()
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
    fn push_reaches_subscribers_in_order() {
        let emitter = Emitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let _a = emitter.observe({
            let log = log.clone();
            move |n: &i32| log.borrow_mut().push(("a", *n))
        });
        let _b = emitter.observe({
            let log = log.clone();
            move |n: &i32| log.borrow_mut().push(("b", *n))
        });

        assert_eq!(emitter.push(1), 2);
        assert_eq!(*log.borrow(), vec![("a", 1), ("b", 1)]);
    }

    #[test]
    fn push_without_subscribers_never_produces() {
        let emitter = Emitter::<String>::new();
        let produced = Rc::new(Cell::new(false));
        let produced_clone = produced.clone();
        let invoked = emitter.push_with(move || {
            produced_clone.set(true);
            String::from("payload")
        });
        assert_eq!(invoked, 0);
        assert!(!produced.get());
    }

    #[test]
    fn unit_emit() {
        let emitter = Emitter::<()>::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let _sub = emitter.observe_change(move || count_clone.set(count_clone.get() + 1));
        emitter.emit();
        emitter.emit();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn disposal_stops_delivery() {
        let emitter = Emitter::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let sub = emitter.observe(move |_: &u8| count_clone.set(count_clone.get() + 1));
        emitter.push(1);
        sub.dispose();
        emitter.push(2);
        assert_eq!(count.get(), 1);
        assert_eq!(emitter.observer_count(), 0);
    }

    #[test]
    fn stream_handle_shares_registry() {
        let emitter = Emitter::<i32>::new();
        let stream = emitter.stream();
        let _sub = stream.observe(|_| {});
        assert_eq!(emitter.observer_count(), 1);
        assert!(stream.ptr_eq(&emitter));
    }

    #[test]
    fn weak_handle_tracks_lifetime() {
        let emitter = Emitter::<i32>::new();
        let weak = emitter.downgrade();
        assert!(weak.upgrade().is_some());
        drop(emitter);
        assert!(!weak.is_alive());
    }

    #[test]
    fn inert_stream_drops_events() {
        let source = Emitter::<i32>::new();
        let derived = Stream::<i32>::new();
        derived.depend_on(source.as_dependency());
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let _sub = derived.observe(move |_| count_clone.set(count_clone.get() + 1));

        derived.emit_with(|| 1);
        drop(source);
        assert!(derived.is_inert());
        derived.emit_with(|| 2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn inertness_is_remembered() {
        let source = Emitter::<i32>::new();
        let derived = Stream::<i32>::new();
        derived.depend_on(source.as_dependency());
        assert!(!derived.inner.inert.get());

        drop(source);
        assert!(derived.is_inert());
        assert!(derived.inner.inert.get());
        assert!(derived.is_inert());
    }
}
