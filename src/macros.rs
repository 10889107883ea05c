// ============================================================================
// spark-observables - Ergonomic Macros
// ============================================================================

/// Clone handles into a `move` closure.
///
/// Node handles are cheap `Rc` clones, but writing the clones out before
/// every closure gets noisy.
///
/// # Usage
///
/// ```rust
/// use spark_observables::{cloned, variable};
///
/// let first = variable(String::from("Ada"));
/// let last = variable(String::from("Lovelace"));
///
/// let full = first.flat_map(cloned!(last => move |first| {
///     let first = first.clone();
///     last.map(move |last| format!("{first} {last}"))
/// }));
/// assert_eq!(full.value(), "Ada Lovelace");
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Observe a node with a handler that captures clones of other handles.
///
/// Wraps `node.observe(cloned!(... => move |value| ...))`.
///
/// # Usage
///
/// ```rust
/// use spark_observables::{observe, variable};
///
/// let source = variable(1);
/// let mirror = variable(0);
///
/// let _sub = observe!(source, mirror => |n| {
///     mirror.set(*n);
/// });
/// source.set(5);
/// assert_eq!(mirror.value(), 5);
/// ```
#[macro_export]
macro_rules! observe {
    // Case 1: With captured handles
    ($node:expr, $($deps:ident),+ => |$arg:pat_param| $body:expr) => {
        $node.observe($crate::cloned!($($deps),+ => move |$arg| $body))
    };
    // Case 2: Nothing to capture
    ($node:expr => |$arg:pat_param| $body:expr) => {
        $node.observe(move |$arg| $body)
    };
}
