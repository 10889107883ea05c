// ============================================================================
// spark-observables - Variable
// The settable value node
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::core::error::{ObserveError, Result};
use crate::core::subscription::Subscription;
use crate::core::traits::{Observe, ReadValue};
use crate::reactivity::validation::{Sequence, Validation};

use super::observable::Observable;

// =============================================================================
// VARIABLE<T>
// =============================================================================

/// A value node that can be set.
///
/// Every write is committed. The [`Validation`] policy chosen at construction
/// only decides whether subscribers are notified of it.
///
/// `Variable<T>` dereferences to [`Observable<T>`], so every combinator is
/// available on it directly.
///
/// # Example
///
/// ```
/// use spark_observables::variable;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let name = variable(String::from("Ada"));
/// let seen = Rc::new(Cell::new(0));
/// let seen_clone = seen.clone();
/// let _sub = name.observe(move |_| seen_clone.set(seen_clone.get() + 1));
///
/// assert!(!name.set(String::from("Ada"))); // unchanged, silent
/// assert!(name.set(String::from("Grace")));
/// assert_eq!(seen.get(), 1);
/// assert_eq!(name.value(), "Grace");
/// ```
pub struct Variable<T> {
    cell: Rc<RefCell<T>>,
    node: Observable<T>,
    validation: Validation<T>,
}

impl<T: Clone + 'static> Variable<T> {
    /// Create a variable with an explicit validation policy.
    pub fn new(value: T, validation: Validation<T>) -> Self {
        let cell = Rc::new(RefCell::new(value));
        Self {
            node: Observable::from_cell(cell.clone()),
            cell,
            validation,
        }
    }

    /// Store `value`, notifying subscribers if the policy allows it.
    ///
    /// Returns whether a notification pass ran.
    ///
    /// # Panics
    ///
    /// Panics if called from inside [`with`](Observable::with) on the same
    /// variable. Use [`try_set`](Self::try_set) where that can happen.
    pub fn set(&self, value: T) -> bool {
        let notify = self.validation.should_notify(&self.cell.borrow(), &value);
        *self.cell.borrow_mut() = value;
        self.finish_write(notify)
    }

    /// Fallible [`set`](Self::set).
    pub fn try_set(&self, value: T) -> Result<bool> {
        self.try_replace_inner(value).map(|(_, notify)| notify)
    }

    /// Store `value` and return the previous one.
    pub fn replace(&self, value: T) -> T {
        let notify = self.validation.should_notify(&self.cell.borrow(), &value);
        let previous = self.cell.replace(value);
        self.finish_write(notify);
        previous
    }

    /// Fallible [`replace`](Self::replace).
    pub fn try_replace(&self, value: T) -> Result<T> {
        self.try_replace_inner(value).map(|(previous, _)| previous)
    }

    /// Modify a copy of the current value and [`set`](Self::set) it.
    ///
    /// ```
    /// use spark_observables::variable;
    ///
    /// let items = variable(vec![1, 2]);
    /// items.update(|v| v.push(3));
    /// assert_eq!(items.value(), vec![1, 2, 3]);
    /// ```
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.cell.borrow().clone();
        f(&mut next);
        self.set(next)
    }

    /// Read-only handle to this variable's node.
    pub fn as_observable(&self) -> Observable<T> {
        self.node.clone()
    }

    /// Policy used by [`set`](Self::set)
    pub fn validation(&self) -> &Validation<T> {
        &self.validation
    }

    /// Attach a label shown in log output and `Debug`.
    pub fn with_label(self, label: &'static str) -> Self {
        let Self {
            cell,
            node,
            validation,
        } = self;
        Self {
            cell,
            node: node.with_label(label),
            validation,
        }
    }

    fn try_replace_inner(&self, value: T) -> Result<(T, bool)> {
        let notify = {
            let current = self
                .cell
                .try_borrow()
                .map_err(|_| ObserveError::ValueBorrowed)?;
            self.validation.should_notify(&current, &value)
        };
        let previous = {
            let mut current = self
                .cell
                .try_borrow_mut()
                .map_err(|_| ObserveError::ValueBorrowed)?;
            std::mem::replace(&mut *current, value)
        };
        Ok((previous, self.finish_write(notify)))
    }

    fn finish_write(&self, notify: bool) -> bool {
        if notify {
            self.node.propagate();
        } else {
            tracing::trace!(
                label = self.node.label().unwrap_or("-"),
                "write suppressed by validation"
            );
        }
        notify
    }
}

impl<T> Deref for Variable<T> {
    type Target = Observable<T>;

    fn deref(&self) -> &Observable<T> {
        &self.node
    }
}

impl<T> Clone for Variable<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            node: self.node.clone(),
            validation: self.validation.clone(),
        }
    }
}

impl<T> From<Variable<T>> for Observable<T> {
    fn from(variable: Variable<T>) -> Self {
        variable.node
    }
}

impl<T> From<&Variable<T>> for Observable<T> {
    fn from(variable: &Variable<T>) -> Self {
        variable.node.clone()
    }
}

impl<T: Clone + 'static> Observe<T> for Variable<T> {
    fn observe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.node.observe(handler)
    }
}

impl<T: Clone + 'static> ReadValue<T> for Variable<T> {
    fn value(&self) -> T {
        self.node.value()
    }
}

impl<T: fmt::Debug> fmt::Debug for Variable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Variable");
        debug.field("label", &self.node.label());
        match self.cell.try_borrow() {
            Ok(value) => debug.field("value", &*value),
            Err(_) => debug.field("value", &"<borrowed>"),
        };
        debug.field("validation", &self.validation).finish()
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// A variable that notifies only when the value changes.
pub fn variable<T>(value: T) -> Variable<T>
where
    T: PartialEq + Clone + 'static,
{
    Variable::new(value, Validation::notify_if_changed())
}

/// A variable that notifies on every write, for types without equality.
pub fn mutable_variable<T: Clone + 'static>(value: T) -> Variable<T> {
    Variable::new(value, Validation::always_notify())
}

/// An optional variable that stays silent on `None -> None` writes.
pub fn optional_variable<U: Clone + 'static>(value: Option<U>) -> Variable<Option<U>> {
    Variable::new(value, Validation::notify_unless_both_absent())
}

/// A sequence variable that notifies when length or any element changes.
pub fn sequence_variable<S>(value: S) -> Variable<S>
where
    S: Sequence + Clone + 'static,
{
    Variable::new(value, Validation::notify_if_sequence_differs())
}

/// A variable with a caller-supplied `(old, new) -> should_notify` policy.
pub fn variable_with<T, F>(value: T, should_notify: F) -> Variable<T>
where
    T: Clone + 'static,
    F: Fn(&T, &T) -> bool + 'static,
{
    Variable::new(value, Validation::custom(should_notify))
}

// =============================================================================
// TESTS
// =============================================================================
