// ============================================================================
// spark-observables - Stream Combinators
// map, combine, flat_map, reduce, to_observable on Stream<T>
// ============================================================================
//
// Wired like the value combinators: derived streams hold their upstreams only
// through `link` registrations they own, and the registered callbacks hold
// the derived stream weakly.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::subscription::Subscription;
use crate::primitives::either::Either;
use crate::primitives::observable::{store_snapshot, Observable};
use crate::primitives::stream::{Stream, WeakStream};

impl<T: 'static> Stream<T> {
    /// Transform every event with `f`.
    ///
    /// `f` is not called for events nobody downstream listens to.
    ///
    /// ```
    /// use spark_observables::Emitter;
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    ///
    /// let keys = Emitter::<char>::new();
    /// let upper = keys.map(|c| c.to_ascii_uppercase());
    /// let typed = Rc::new(RefCell::new(String::new()));
    /// let typed_clone = typed.clone();
    /// let _sub = upper.observe(move |c| typed_clone.borrow_mut().push(*c));
    ///
    /// keys.push('o');
    /// keys.push('k');
    /// assert_eq!(*typed.borrow(), "OK");
    /// ```
    pub fn map<U, F>(&self, f: F) -> Stream<U>
    where
        U: 'static,
        F: Fn(&T) -> U + 'static,
    {
        let stream = Stream::new();
        stream.depend_on(self.as_dependency());
        let out = stream.downgrade();
        stream.track(self.link(move |event| {
            if let Some(out) = out.upgrade() {
                out.emit_with(|| f(event));
            }
        }));
        stream
    }

    /// Merge this stream with `other`, tagging events by origin.
    pub fn combine<U>(&self, other: &Stream<U>) -> Stream<Either<T, U>>
    where
        T: Clone,
        U: Clone + 'static,
    {
        self.combine_with(other, |event| event.cloned())
    }

    /// Merge this stream with `other` through `f`.
    pub fn combine_with<U, V, F>(&self, other: &Stream<U>, f: F) -> Stream<V>
    where
        U: 'static,
        V: 'static,
        F: Fn(Either<&T, &U>) -> V + 'static,
    {
        let f = Rc::new(f);
        let stream = Stream::new();
        stream.depend_on(self.as_dependency());
        stream.depend_on(other.as_dependency());

        let out = stream.downgrade();
        let left = f.clone();
        stream.track(self.link(move |event| {
            if let Some(out) = out.upgrade() {
                out.emit_with(|| left(Either::Left(event)));
            }
        }));
        let out = stream.downgrade();
        stream.track(other.link(move |event| {
            if let Some(out) = out.upgrade() {
                out.emit_with(|| f(Either::Right(event)));
            }
        }));
        stream
    }

    /// Forward the events of the stream selected by the latest event.
    ///
    /// Nothing is forwarded until the first event selects a stream. Each new
    /// selection unsubscribes the previous one.
    pub fn flat_map<U, S, F>(&self, f: F) -> Stream<U>
    where
        U: Clone + 'static,
        S: Into<Stream<U>>,
        F: Fn(&T) -> S + 'static,
    {
        let stream = Stream::new();
        stream.depend_on(self.as_dependency());

        let current: RefCell<Option<Stream<U>>> = RefCell::new(None);
        let generation = Rc::new(Cell::new(0u64));
        let inner_link: RefCell<Option<Subscription>> = RefCell::new(None);

        let out = stream.downgrade();
        stream.track(self.link(move |event| {
            let next: Stream<U> = f(event).into();
            let selection = generation.get().wrapping_add(1);
            generation.set(selection);

            let previous = inner_link.borrow_mut().take();
            if let Some(previous) = previous {
                previous.dispose();
            }
            let link = forward_selection(&out, &next, selection, &generation);
            *inner_link.borrow_mut() = Some(link);
            *current.borrow_mut() = Some(next);
        }));
        stream
    }

    /// Emit the running accumulator after folding in each event.
    ///
    /// The accumulator is updated even when nobody listens.
    pub fn reduce<U, F>(&self, initial: U, f: F) -> Stream<U>
    where
        U: Clone + 'static,
        F: Fn(&U, &T) -> U + 'static,
    {
        let stream = Stream::new();
        stream.depend_on(self.as_dependency());
        let accumulator = RefCell::new(initial);
        let out = stream.downgrade();
        stream.track(self.link(move |event| {
            let acc = accumulator.borrow().clone();
            let next = f(&acc, event);
            *accumulator.borrow_mut() = next.clone();
            if let Some(out) = out.upgrade() {
                out.emit_with(move || next);
            }
        }));
        stream
    }

    /// A value node holding the latest event, starting at `initial`.
    ///
    /// ```
    /// use spark_observables::Emitter;
    ///
    /// let temperature = Emitter::<i32>::new();
    /// let latest = temperature.to_observable(18);
    /// temperature.push(21);
    /// assert_eq!(latest.value(), 21);
    /// ```
    pub fn to_observable(&self, initial: T) -> Observable<T>
    where
        T: Clone,
    {
        let cell = Rc::new(RefCell::new(initial));
        let node = Observable::from_snapshot(cell.clone());
        node.depend_on(self.as_dependency());
        let out = node.downgrade();
        node.track(self.link(move |event: &T| {
            store_snapshot(&cell, event.clone());
            if let Some(out) = out.upgrade() {
                out.propagate();
            }
        }));
        node
    }
}

fn forward_selection<U: Clone + 'static>(
    out: &WeakStream<U>,
    inner: &Stream<U>,
    selection: u64,
    generation: &Rc<Cell<u64>>,
) -> Subscription {
    let out = out.clone();
    let generation = generation.clone();
    inner.link(move |event| {
        if generation.get() != selection {
            tracing::trace!(selection, "stale stream selection ignored");
            return;
        }
        if let Some(out) = out.upgrade() {
            out.emit_with(|| event.clone());
        }
    })
}

// =============================================================================
// TESTS
// =============================================================================
