// ============================================================================
// spark-observables - Caching
// Stored snapshots of a source that outlive it
// ============================================================================
//
// A cache is cell-backed: reads never reach the source, and the stored value
// is refreshed on every source notification. Caches do not count the source
// as a dependency, so they never turn inert; once the source is gone they
// simply stop changing.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::primitives::observable::{store_snapshot, Observable};

impl<T: Clone + 'static> Observable<T> {
    /// Store this node's value, refreshing it on every change.
    ///
    /// ```
    /// use spark_observables::variable;
    ///
    /// let source = variable(1);
    /// let cache = source.cached();
    /// source.set(2);
    /// drop(source);
    /// assert_eq!(cache.value(), 2);
    /// assert!(!cache.is_inert());
    /// ```
    pub fn cached(&self) -> Observable<T> {
        self.cached_map(T::clone)
    }

    /// Store `f(value)`, recomputing it once per change of this node.
    ///
    /// Unlike [`map`](Self::map), `f` does not run on reads.
    pub fn cached_map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let cell = Rc::new(RefCell::new(self.with(&f)));
        let node = Observable::from_snapshot(cell.clone());
        let out = node.downgrade();
        node.track(self.link(move |value| {
            store_snapshot(&cell, f(value));
            if let Some(out) = out.upgrade() {
                out.propagate();
            }
        }));
        node
    }
}
