// ============================================================================
// spark-observables - Boolean Logic
// and / or / not on Observable<bool>, with de-duplicated notifications
// ============================================================================

use std::ops::{BitAnd, BitOr, Not};

use crate::primitives::observable::Observable;

impl Observable<bool> {
    /// Logical AND of two nodes.
    ///
    /// Subscribers are notified only when the result flips.
    ///
    /// ```
    /// use spark_observables::variable;
    ///
    /// let signed_in = variable(true);
    /// let verified = variable(false);
    /// let can_post = signed_in.and(&verified);
    /// assert!(!can_post.value());
    ///
    /// verified.set(true);
    /// assert!(can_post.value());
    /// ```
    pub fn and(&self, other: &Observable<bool>) -> Observable<bool> {
        deduplicated(self.combine_with(other, |a, b| *a && *b))
    }

    /// Logical OR of two nodes.
    pub fn or(&self, other: &Observable<bool>) -> Observable<bool> {
        deduplicated(self.combine_with(other, |a, b| *a || *b))
    }

    /// Logical negation.
    ///
    /// With `std::ops::Not` in scope, `variable.not()` on a `Variable<bool>`
    /// picks the by-value operator through `Deref` and fails to compile.
    /// Write `Observable::not(&variable)` or `!&*variable` instead.
    pub fn not(&self) -> Observable<bool> {
        deduplicated(self.map(|value| !value))
    }
}

// The raw combination is only reachable through the filter's weak link, so
// the result anchors it.
fn deduplicated(raw: Observable<bool>) -> Observable<bool> {
    let result = raw.distinct();
    result.retain(raw);
    result
}

impl BitAnd for &Observable<bool> {
    type Output = Observable<bool>;

    fn bitand(self, rhs: Self) -> Observable<bool> {
        self.and(rhs)
    }
}

impl BitAnd for Observable<bool> {
    type Output = Observable<bool>;

    fn bitand(self, rhs: Self) -> Observable<bool> {
        self.and(&rhs)
    }
}

impl BitOr for &Observable<bool> {
    type Output = Observable<bool>;

    fn bitor(self, rhs: Self) -> Observable<bool> {
        self.or(rhs)
    }
}

impl BitOr for Observable<bool> {
    type Output = Observable<bool>;

    fn bitor(self, rhs: Self) -> Observable<bool> {
        self.or(&rhs)
    }
}

impl Not for &Observable<bool> {
    type Output = Observable<bool>;

    fn not(self) -> Observable<bool> {
        Observable::not(self)
    }
}

impl Not for Observable<bool> {
    type Output = Observable<bool>;

    fn not(self) -> Observable<bool> {
        Observable::not(&self)
    }
}
