use spark_observables::{
    cloned, mutable_variable, optional_variable, sequence_variable, variable, Either, Emitter,
    Observable, Subscription,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

// Set RUST_LOG=spark_observables=trace to see notification passes
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn record<T: Clone + 'static>(node: &Observable<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sub = node.observe(cloned!(log => move |value: &T| log.borrow_mut().push(value.clone())));
    (log, sub)
}

#[test]
fn form_validation_pipeline() {
    init_tracing();

    let email = variable(String::new()).with_label("email");
    let password = variable(String::new()).with_label("password");

    let email_ok = email.map(|e| e.contains('@'));
    let password_ok = password.map(|p| p.len() >= 8);
    let can_submit = email_ok.and(&password_ok);
    let (log, _sub) = record(&can_submit);

    email.set("ada@example.com".into());
    password.set("short".into());
    password.set("long enough".into());
    password.set("still long enough".into());
    email.set("nope".into());

    assert_eq!(*log.borrow(), vec![true, false]);
}

#[test]
fn diamond_notifies_once_per_path() {
    init_tracing();

    let base = variable(1);
    let left = base.map(|n| n + 1);
    let right = base.map(|n| n * 10);
    let joined = left.combine(&right);
    let (log, _sub) = record(&joined);

    base.set(2);
    // One pass per upstream path; both already see the new base value
    assert_eq!(*log.borrow(), vec![(3, 20), (3, 20)]);
}

#[test]
fn reduce_over_distinct_changes() {
    let reading = mutable_variable(0);
    let changes = reading.distinct().reduce(0u32, |count, _| count + 1);

    for value in [1, 1, 2, 2, 2, 3] {
        reading.set(value);
    }
    assert_eq!(changes.value(), 0, "the distinct intermediate was dropped");

    let distinct = reading.distinct();
    let changes = distinct.reduce(0u32, |count, _| count + 1);
    for value in [4, 4, 5] {
        reading.set(value);
    }
    assert_eq!(changes.value(), 2);
}

#[test]
fn flat_map_over_optional_selection() {
    let selected = optional_variable::<usize>(None);
    let rows = [variable("alpha"), variable("beta")];
    let title = selected.flat_map({
        let rows = rows.clone();
        move |index| match index {
            Some(i) => rows[*i].map(|name| name.to_uppercase()),
            None => Observable::constant(String::from("(none)")),
        }
    });
    let (log, _sub) = record(&title);

    selected.set(Some(1));
    rows[1].set("gamma");
    selected.set(None);
    selected.set(None);
    rows[1].set("delta");

    assert_eq!(*log.borrow(), vec!["BETA", "GAMMA", "(none)"]);
}

#[test]
fn sequence_variable_feeds_stream() {
    let items = sequence_variable(vec![1, 2]);
    let events = items.to_stream();
    let sizes = events.map(|v: &Vec<i32>| v.len());
    let log = Rc::new(RefCell::new(Vec::new()));
    let _sub = sizes.observe(cloned!(log => move |n| log.borrow_mut().push(*n)));

    items.set(vec![1, 2]);
    items.set(vec![1, 2, 3]);
    items.update(|v| v.clear());

    assert_eq!(*log.borrow(), vec![3, 0]);
}

#[test]
fn stream_pipeline_with_anchored_intermediates() {
    init_tracing();

    let clicks = Emitter::<(i32, i32)>::new();
    let keys = Emitter::<char>::new();

    let merged = clicks.combine(&keys);
    let summary = merged.map(|event| match event {
        Either::Left((x, y)) => format!("click {x},{y}"),
        Either::Right(key) => format!("key {key}"),
    });
    summary.retain(merged);

    let last = summary.to_observable(String::new());
    last.retain(summary);

    clicks.push((1, 2));
    keys.push('q');
    assert_eq!(last.value(), "key q");
    assert!(!last.is_inert());
}

#[test]
fn cached_map_survives_source() {
    let source = variable(vec![3, 1, 2]);
    let sorted = source.cached_map(|v| {
        let mut v = v.clone();
        v.sort();
        v
    });
    source.set(vec![9, 8]);
    drop(source);
    assert_eq!(sorted.value(), vec![8, 9]);
}
