// ============================================================================
// spark-observables - Validation Policies
// Decide, per set, whether subscribers of a Variable hear about it
// ============================================================================
//
// A policy is a predicate `(old, new) -> should_notify`. It never rejects a
// write: the new value is always stored, the policy only decides whether the
// registry is walked.
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Predicate signature for validation policies
pub type ValidateFn<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Which built-in policy a [`Validation`] was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    /// Every set notifies
    AlwaysNotify,
    /// Notify when `old != new`
    NotifyIfChanged,
    /// Notify unless old and new are both `None`
    NotifyUnlessBothAbsent,
    /// Notify when lengths differ or any element differs
    NotifyIfSequenceDiffers,
    /// User-supplied predicate
    Custom,
}

/// A validation policy for [`Variable`](crate::Variable) writes.
///
/// # Example
///
/// ```
/// use spark_observables::{Validation, Variable};
///
/// let name = Variable::new(String::from("a"), Validation::notify_if_changed());
/// assert!(!name.set(String::from("a")));
/// assert!(name.set(String::from("b")));
/// ```
pub struct Validation<T> {
    kind: ValidationKind,
    check: ValidateFn<T>,
}

impl<T: 'static> Validation<T> {
    /// Notify on every write.
    pub fn always_notify() -> Self {
        Self {
            kind: ValidationKind::AlwaysNotify,
            check: Rc::new(always_notify::<T>),
        }
    }

    /// Notify only when the new value differs from the old one.
    pub fn notify_if_changed() -> Self
    where
        T: PartialEq,
    {
        Self {
            kind: ValidationKind::NotifyIfChanged,
            check: Rc::new(not_equal::<T>),
        }
    }

    /// Notify on every write except `None -> None`.
    pub fn notify_unless_both_absent() -> Self
    where
        T: OptionLike,
    {
        Self {
            kind: ValidationKind::NotifyUnlessBothAbsent,
            check: Rc::new(|old: &T, new: &T| old.is_present() || new.is_present()),
        }
    }

    /// Notify when the sequences differ in length or in any element.
    pub fn notify_if_sequence_differs() -> Self
    where
        T: Sequence,
    {
        Self {
            kind: ValidationKind::NotifyIfSequenceDiffers,
            check: Rc::new(sequence_differs::<T>),
        }
    }

    /// Notify when `check(old, new)` returns true.
    pub fn custom(check: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            kind: ValidationKind::Custom,
            check: Rc::new(check),
        }
    }
}

impl<T> Validation<T> {
    /// Run the policy
    pub fn should_notify(&self, old: &T, new: &T) -> bool {
        (self.check)(old, new)
    }

    /// Which policy this is
    pub fn kind(&self) -> ValidationKind {
        self.kind
    }
}

impl<T> Clone for Validation<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            check: self.check.clone(),
        }
    }
}

impl<T> fmt::Debug for Validation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Validation").field(&self.kind).finish()
    }
}

// =============================================================================
// OPTION-LIKE VALUES
// =============================================================================

/// Values that may be absent, used by
/// [`Validation::notify_unless_both_absent`].
pub trait OptionLike {
    /// Wrapped type
    type Item;

    /// True when a value is present
    fn is_present(&self) -> bool;
}

impl<U> OptionLike for Option<U> {
    type Item = U;

    fn is_present(&self) -> bool {
        self.is_some()
    }
}

// =============================================================================
// SEQUENCES
// =============================================================================

/// Ordered collections, used by [`Validation::notify_if_sequence_differs`].
pub trait Sequence {
    /// Element type
    type Element: PartialEq;

    /// Number of elements
    fn length(&self) -> usize;

    /// Elements in order
    fn elements(&self) -> impl Iterator<Item = &Self::Element>;
}

impl<E: PartialEq> Sequence for Vec<E> {
    type Element = E;

    fn length(&self) -> usize {
        self.len()
    }

    fn elements(&self) -> impl Iterator<Item = &E> {
        self.iter()
    }
}

impl<E: PartialEq> Sequence for VecDeque<E> {
    type Element = E;

    fn length(&self) -> usize {
        self.len()
    }

    fn elements(&self) -> impl Iterator<Item = &E> {
        self.iter()
    }
}

impl<E: PartialEq> Sequence for Box<[E]> {
    type Element = E;

    fn length(&self) -> usize {
        self.len()
    }

    fn elements(&self) -> impl Iterator<Item = &E> {
        self.iter()
    }
}

impl<E: PartialEq, const N: usize> Sequence for [E; N] {
    type Element = E;

    fn length(&self) -> usize {
        N
    }

    fn elements(&self) -> impl Iterator<Item = &E> {
        self.iter()
    }
}

// =============================================================================
// PREDICATES
// =============================================================================

/// Always true.
pub fn always_notify<T>(_old: &T, _new: &T) -> bool {
    true
}

/// `old != new`
pub fn not_equal<T: PartialEq>(old: &T, new: &T) -> bool {
    old != new
}

/// Length first, then element-wise comparison.
///
/// ```
/// use spark_observables::reactivity::validation::sequence_differs;
///
/// assert!(!sequence_differs(&vec![1, 2, 3], &vec![1, 2, 3]));
/// assert!(sequence_differs(&vec![1, 2, 3], &vec![1, 2, 4]));
/// assert!(sequence_differs(&vec![1, 2], &vec![1, 2, 3]));
/// ```
pub fn sequence_differs<S: Sequence>(old: &S, new: &S) -> bool {
    if old.length() != new.length() {
        return true;
    }
    old.elements().zip(new.elements()).any(|(a, b)| a != b)
}

// =============================================================================
// TESTS
// =============================================================================
