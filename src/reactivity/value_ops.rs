// ============================================================================
// spark-observables - Value Combinators
// map, combine, flat_map, reduce, filter, to_stream on Observable<T>
// ============================================================================
//
// Every combinator builds a fresh derived node and wires it the same way:
// - the pull function holds upstreams through WeakObservable
// - the upstream registration is a `link` (no keep-alive) owned by the
//   derived node's upstream set
// - the registered callback holds the derived node weakly
//
// So dropping the derived node removes its callbacks from the upstreams, and
// dropping an upstream leaves the derived node inert.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::subscription::Subscription;
use crate::primitives::observable::{Observable, WeakObservable};
use crate::primitives::stream::Stream;
use crate::primitives::variable::mutable_variable;

impl<T: Clone + 'static> Observable<T> {
    // =========================================================================
    // MAP
    // =========================================================================

    /// Derive a node whose value is `f(upstream)`.
    ///
    /// `f` runs on every read and on every upstream change that has a
    /// subscriber downstream; it should be pure.
    ///
    /// ```
    /// use spark_observables::variable;
    ///
    /// let count = variable(2);
    /// let label = count.map(|n| format!("{n} items"));
    /// count.set(3);
    /// assert_eq!(label.value(), "3 items");
    /// ```
    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let initial = self.with(&f);
        let upstream = self.downgrade();
        let node = Observable::derived(initial, move || upstream.upgrade().map(|up| up.with(&f)));
        node.depend_on(self.as_dependency());
        node.track(self.on_change(node.propagator()));
        node
    }

    // =========================================================================
    // COMBINE
    // =========================================================================

    /// Pair this node with `other`.
    ///
    /// Each upstream change is its own notification; setting both upstreams
    /// notifies twice.
    pub fn combine<U>(&self, other: &Observable<U>) -> Observable<(T, U)>
    where
        U: Clone + 'static,
    {
        self.combine_with(other, |a, b| (a.clone(), b.clone()))
    }

    /// Derive a node from this node and `other` through `f`.
    ///
    /// ```
    /// use spark_observables::variable;
    ///
    /// let width = variable(2);
    /// let height = variable(3);
    /// let area = width.combine_with(&height, |w, h| w * h);
    /// assert_eq!(area.value(), 6);
    ///
    /// height.set(10);
    /// assert_eq!(area.value(), 20);
    /// ```
    pub fn combine_with<U, V, F>(&self, other: &Observable<U>, f: F) -> Observable<V>
    where
        U: Clone + 'static,
        V: Clone + 'static,
        F: Fn(&T, &U) -> V + 'static,
    {
        let initial = self.with(|a| other.with(|b| f(a, b)));
        let (left, right) = (self.downgrade(), other.downgrade());
        let node = Observable::derived(initial, move || {
            let (left, right) = (left.upgrade()?, right.upgrade()?);
            Some(left.with(|a| right.with(|b| f(a, b))))
        });
        node.depend_on(self.as_dependency());
        node.depend_on(other.as_dependency());
        node.track(self.on_change(node.propagator()));
        node.track(other.on_change(node.propagator()));
        node
    }

    // =========================================================================
    // FLAT MAP
    // =========================================================================

    /// Follow the node selected by `f` from this node's value.
    ///
    /// When this node changes, the previously selected node is unsubscribed,
    /// `f` selects a new one, and the result notifies. Changes of the selected
    /// node notify for as long as it stays selected. The selected node is
    /// kept alive by the result.
    ///
    /// ```
    /// use spark_observables::{variable, Observable};
    ///
    /// let use_metric = variable(true);
    /// let km = variable(1.0_f64);
    /// let miles = variable(0.62_f64);
    ///
    /// let distance = use_metric.flat_map({
    ///     let (km, miles) = (km.clone(), miles.clone());
    ///     move |metric| -> Observable<f64> {
    ///         if *metric { (&km).into() } else { (&miles).into() }
    ///     }
    /// });
    /// assert_eq!(distance.value(), 1.0);
    /// use_metric.set(false);
    /// assert_eq!(distance.value(), 0.62);
    /// ```
    pub fn flat_map<U, O, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + 'static,
        O: Into<Observable<U>>,
        F: Fn(&T) -> O + 'static,
    {
        let selected: Observable<U> = self.with(|value| f(value).into());
        let current = Rc::new(RefCell::new(selected.clone()));
        let generation = Rc::new(Cell::new(0u64));
        let inner_link: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let node = Observable::derived(selected.value(), {
            let current = current.clone();
            move || {
                let inner = current.borrow().clone();
                Some(inner.value())
            }
        });
        node.depend_on(self.as_dependency());
        let first_link = follow_selection(&node.downgrade(), &selected, 0, &generation);
        *inner_link.borrow_mut() = Some(first_link);

        let out = node.downgrade();
        node.track(self.link(move |value| {
            let next: Observable<U> = f(value).into();
            let selection = generation.get().wrapping_add(1);
            generation.set(selection);

            let previous = inner_link.borrow_mut().take();
            if let Some(previous) = previous {
                previous.dispose();
            }
            *current.borrow_mut() = next.clone();

            let Some(out) = out.upgrade() else {
                return;
            };
            let link = follow_selection(&out.downgrade(), &next, selection, &generation);
            *inner_link.borrow_mut() = Some(link);
            tracing::trace!(
                label = out.label().unwrap_or("-"),
                selection,
                "flat_map switched inner node"
            );
            out.propagate();
        }));
        node
    }

    // =========================================================================
    // REDUCE
    // =========================================================================

    /// Fold every upstream notification into an accumulator.
    ///
    /// The accumulator starts at `initial` and is not fed the current value,
    /// only later changes.
    ///
    /// ```
    /// use spark_observables::variable;
    ///
    /// let clicks = variable(0);
    /// let total = clicks.reduce(0, |sum, n| sum + n);
    /// clicks.set(2);
    /// clicks.set(5);
    /// assert_eq!(total.value(), 7);
    /// ```
    pub fn reduce<U, F>(&self, initial: U, f: F) -> Observable<U>
    where
        U: Clone + 'static,
        F: Fn(&U, &T) -> U + 'static,
    {
        let accumulator = mutable_variable(initial);
        let node = accumulator.map(U::clone);
        node.depend_on(self.as_dependency());
        node.track(self.link({
            let accumulator = accumulator.clone();
            move |value| {
                let next = f(&accumulator.value(), value);
                accumulator.set(next);
            }
        }));
        node.retain(accumulator);
        node
    }

    // =========================================================================
    // FILTER
    // =========================================================================

    /// Forward only the changes for which `is_included(previous, new)` holds.
    ///
    /// The previous value is updated on every upstream change, included or
    /// not. Reads always see the upstream's current value.
    pub fn filter<F>(&self, is_included: F) -> Observable<T>
    where
        F: Fn(&T, &T) -> bool + 'static,
    {
        let previous = RefCell::new(self.value());
        let upstream = self.downgrade();
        let node =
            Observable::derived(self.value(), move || upstream.upgrade().map(|up| up.value()));
        node.depend_on(self.as_dependency());

        let out = node.downgrade();
        node.track(self.link(move |new| {
            let prior = previous.replace(new.clone());
            let included = is_included(&prior, new);
            if included {
                if let Some(out) = out.upgrade() {
                    out.propagate();
                }
            }
        }));
        node
    }

    /// Forward only changes that produce a different value.
    ///
    /// ```
    /// use spark_observables::mutable_variable;
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    ///
    /// let raw = mutable_variable(1);
    /// let distinct = raw.distinct();
    /// let hits = Rc::new(Cell::new(0));
    /// let hits_clone = hits.clone();
    /// let _sub = distinct.observe(move |_| hits_clone.set(hits_clone.get() + 1));
    ///
    /// raw.set(1);
    /// raw.set(2);
    /// raw.set(2);
    /// assert_eq!(hits.get(), 1);
    /// ```
    pub fn distinct(&self) -> Observable<T>
    where
        T: PartialEq,
    {
        self.filter(|previous, new| previous != new)
    }

    // =========================================================================
    // TO STREAM
    // =========================================================================

    /// Re-emit every change of this node as a stream event.
    pub fn to_stream(&self) -> Stream<T> {
        let stream = Stream::new();
        stream.depend_on(self.as_dependency());
        let out = stream.downgrade();
        stream.track(self.link(move |value| {
            if let Some(out) = out.upgrade() {
                out.emit_with(|| value.clone());
            }
        }));
        stream
    }
}

/// Subscribe `node` to the selected inner node, ignoring notifications that
/// arrive after a newer selection replaced it.
fn follow_selection<U: Clone + 'static>(
    node: &WeakObservable<U>,
    inner: &Observable<U>,
    selection: u64,
    generation: &Rc<Cell<u64>>,
) -> Subscription {
    let node = node.clone();
    let generation = generation.clone();
    inner.on_change(move || {
        if generation.get() != selection {
            tracing::trace!(selection, "stale flat_map selection ignored");
            return;
        }
        if let Some(node) = node.upgrade() {
            node.propagate();
        }
    })
}

// =============================================================================
// TESTS
// =============================================================================
