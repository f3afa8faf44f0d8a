// ============================================================================
// scope-digest - Digest Cycle Tests
// Synchronous watch/digest/eval/apply behavior
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use scope_digest::{Phase, RemoveWatch, Scope, ScopeError, Value};

// =============================================================================
// WATCH + DIGEST
// =============================================================================

#[test]
fn listener_fires_on_first_digest() {
    let scope = Scope::new();
    let fired = Rc::new(Cell::new(false));

    let spy = fired.clone();
    scope.watch(|_| Value::from("change"), move |_, _, _| spy.set(true));
    scope.digest().unwrap();

    assert!(fired.get());
}

#[test]
fn watch_fn_receives_the_scope() {
    let scope = Scope::new();
    scope.set("marker", 7.0);
    let seen = Rc::new(Cell::new(None));

    let spy = seen.clone();
    scope.watch_silent(move |s| {
        spy.set(s.get("marker").as_number());
        Value::Undefined
    });
    scope.digest().unwrap();

    assert_eq!(seen.get(), Some(7.0));
}

#[test]
fn listener_reruns_only_when_the_value_changes() {
    let scope = Scope::new();
    scope.set("some_value", "a");
    let counter = Rc::new(Cell::new(0u32));

    let spy = counter.clone();
    scope.watch_key("some_value", move |_, _, _| spy.set(spy.get() + 1));

    assert_eq!(counter.get(), 0);

    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);

    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);

    scope.set("some_value", "b");
    assert_eq!(counter.get(), 1);

    scope.digest().unwrap();
    assert_eq!(counter.get(), 2);
}

#[test]
fn listener_fires_when_the_watched_value_starts_undefined() {
    let scope = Scope::new();
    let counter = Rc::new(Cell::new(0u32));

    let spy = counter.clone();
    scope.watch_key("some_value", move |_, _, _| spy.set(spy.get() + 1));
    scope.digest().unwrap();

    assert_eq!(counter.get(), 1);
}

#[test]
fn first_fire_passes_new_value_as_old_value() {
    let scope = Scope::new();
    scope.set("some_value", 123.0);
    let old_seen = Rc::new(Cell::new(None));

    let spy = old_seen.clone();
    scope.watch_key("some_value", move |_, old, _| spy.set(old.as_number()));
    scope.digest().unwrap();

    assert_eq!(old_seen.get(), Some(123.0));
}

#[test]
fn watchers_may_omit_the_listener() {
    let scope = Scope::new();
    let execs = Rc::new(Cell::new(0u32));

    let spy = execs.clone();
    scope.watch_silent(move |_| {
        spy.set(spy.get() + 1);
        Value::from("1")
    });
    scope.digest().unwrap();

    assert!(execs.get() > 0);
}

#[test]
fn chained_watchers_converge_in_one_digest() {
    let scope = Scope::new();
    scope.set("name", "Jane");

    // Registered first, depends on a value the second watcher derives.
    scope.watch_key("name_upper", |new, _, s| {
        if let Some(upper) = new.as_str() {
            s.set("initial", format!("{}.", &upper[..1]));
        }
    });

    scope.watch_key("name", |new, _, s| {
        if let Some(name) = new.as_str() {
            s.set("name_upper", name.to_uppercase());
        }
    });

    scope.digest().unwrap();
    assert_eq!(scope.get("initial").as_str(), Some("J."));

    scope.set("name", "Bob");
    scope.digest().unwrap();
    assert_eq!(scope.get("initial").as_str(), Some("B."));
}

#[test]
fn mutually_dirtying_watchers_are_a_runaway_digest() {
    let scope = Scope::new();
    scope.set("counter_a", 0.0);
    scope.set("counter_b", 0.0);

    scope.watch_key("counter_a", |_, _, s| {
        s.update("counter_b", |v| {
            *v = Value::from(v.as_number().unwrap_or(0.0) + 1.0);
        });
    });
    scope.watch_key("counter_b", |_, _, s| {
        s.update("counter_a", |v| {
            *v = Value::from(v.as_number().unwrap_or(0.0) + 1.0);
        });
    });

    assert_eq!(
        scope.digest(),
        Err(ScopeError::RunawayDigest { iterations: 10 })
    );
    // The failed digest released the phase marker.
    assert_eq!(scope.phase(), Phase::None);
}

#[test]
fn digest_ends_the_pass_when_the_last_dirty_watch_is_clean() {
    let scope = Scope::new();
    scope.set(
        "array",
        Value::array((0..100).map(|i| Value::from(i as f64)).collect()),
    );
    let execs = Rc::new(Cell::new(0u32));

    for i in 0..100usize {
        let spy = execs.clone();
        scope.watch_silent(move |s| {
            spy.set(spy.get() + 1);
            s.get("array")
                .as_array()
                .map(|items| items.borrow()[i].clone())
                .unwrap_or(Value::Undefined)
        });
    }

    // First digest: one dirty pass plus one confirming pass.
    scope.digest().unwrap();
    assert_eq!(execs.get(), 200);

    // Dirtying only the first watcher: one full pass plus an early-exited
    // pass of length one.
    scope.get("array").as_array().unwrap().borrow_mut()[0] = Value::from(420.0);
    scope.digest().unwrap();
    assert_eq!(execs.get(), 301);
}

#[test]
fn watcher_registered_by_a_listener_runs_in_the_same_digest() {
    let scope = Scope::new();
    scope.set("a_value", "abc");
    let counter = Rc::new(Cell::new(0u32));

    let spy = counter.clone();
    scope.watch_key("a_value", move |_, _, s| {
        let inner_spy = spy.clone();
        s.watch_key("a_value", move |_, _, _| {
            inner_spy.set(inner_spy.get() + 1);
        });
    });

    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);
}

// =============================================================================
// EQUALITY STRATEGIES
// =============================================================================

#[test]
fn value_watchers_see_in_place_mutation() {
    let scope = Scope::new();
    scope.set(
        "a_value",
        Value::array(vec![Value::from(1.0), Value::from(2.0), Value::from(3.0)]),
    );
    let counter = Rc::new(Cell::new(0u32));

    let spy = counter.clone();
    scope.watch_key_value("a_value", move |_, _, _| spy.set(spy.get() + 1));

    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);

    scope
        .get("a_value")
        .as_array()
        .unwrap()
        .borrow_mut()
        .push(Value::from(4.0));
    scope.digest().unwrap();
    assert_eq!(counter.get(), 2);
}

#[test]
fn reference_watchers_ignore_in_place_mutation() {
    let scope = Scope::new();
    scope.set("a_value", Value::array(vec![Value::from(1.0)]));
    let counter = Rc::new(Cell::new(0u32));

    let spy = counter.clone();
    scope.watch_key("a_value", move |_, _, _| spy.set(spy.get() + 1));

    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);

    scope
        .get("a_value")
        .as_array()
        .unwrap()
        .borrow_mut()
        .push(Value::from(2.0));
    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);

    // Replacing the container is a reference change.
    scope.set("a_value", Value::array(vec![Value::from(9.0)]));
    scope.digest().unwrap();
    assert_eq!(counter.get(), 2);
}

#[test]
fn nan_valued_watches_converge() {
    let scope = Scope::new();
    scope.set("number", f64::NAN);
    let counter = Rc::new(Cell::new(0u32));

    let spy = counter.clone();
    scope.watch_key("number", move |_, _, _| spy.set(spy.get() + 1));

    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);

    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);
}

// =============================================================================
// PHASE TRACKING
// =============================================================================

#[test]
fn phase_reflects_the_operation_in_flight() {
    let scope = Scope::new();
    scope.set("a_value", 1.0);

    let in_watch = Rc::new(Cell::new(Phase::None));
    let in_listener = Rc::new(Cell::new(Phase::None));
    let in_apply = Rc::new(Cell::new(Phase::None));

    let watch_spy = in_watch.clone();
    let listener_spy = in_listener.clone();
    scope.watch(
        move |s| {
            watch_spy.set(s.phase());
            s.get("a_value")
        },
        move |_, _, s| listener_spy.set(s.phase()),
    );

    let apply_spy = in_apply.clone();
    scope.apply(move |s| apply_spy.set(s.phase())).unwrap();

    assert_eq!(in_watch.get(), Phase::Digest);
    assert_eq!(in_listener.get(), Phase::Digest);
    assert_eq!(in_apply.get(), Phase::Apply);
    assert_eq!(scope.phase(), Phase::None);
}

#[test]
fn digest_inside_a_watch_fn_fails_fast() {
    let scope = Scope::new();
    let seen = Rc::new(Cell::new(None));

    let spy = seen.clone();
    scope.watch_silent(move |s| {
        spy.set(Some(s.digest()));
        Value::Undefined
    });
    scope.digest().unwrap();

    assert_eq!(
        seen.get(),
        Some(Err(ScopeError::PhaseInProgress(Phase::Digest)))
    );
}

// =============================================================================
// APPLY
// =============================================================================

#[test]
fn apply_runs_the_function_and_digests() {
    let scope = Scope::new();
    scope.set("a_value", "someValue");
    let counter = Rc::new(Cell::new(0u32));

    let spy = counter.clone();
    scope.watch_key("a_value", move |_, _, _| spy.set(spy.get() + 1));

    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);

    scope.apply(|s| s.set("a_value", "someOtherValue")).unwrap();
    assert_eq!(counter.get(), 2);
}

#[test]
fn apply_returns_the_functions_result() {
    let scope = Scope::new();
    scope.set("a_value", 42.0);
    let result = scope.apply(|s| s.get("a_value").as_number()).unwrap();
    assert_eq!(result, Some(42.0));
}

// =============================================================================
// WATCHER REMOVAL
// =============================================================================

#[test]
fn removed_watchers_no_longer_fire() {
    let scope = Scope::new();
    scope.set("a_value", "a");
    let counter = Rc::new(Cell::new(0u32));

    let spy = counter.clone();
    let remove = scope.watch_key("a_value", move |_, _, _| spy.set(spy.get() + 1));

    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);
    assert_eq!(scope.watcher_count(), 1);

    remove();
    assert_eq!(scope.watcher_count(), 0);

    scope.set("a_value", "b");
    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);
}

#[test]
fn a_listener_may_remove_its_own_watcher() {
    let scope = Scope::new();
    scope.set("a_value", "a");
    let counter = Rc::new(Cell::new(0u32));

    let spy = counter.clone();
    let remove: Rc<RefCell<Option<RemoveWatch>>> = Rc::new(RefCell::new(None));
    let remove_slot = remove.clone();
    let handle = scope.watch_key("a_value", move |_, _, _| {
        spy.set(spy.get() + 1);
        if let Some(remove) = remove_slot.borrow_mut().take() {
            remove();
        }
    });
    *remove.borrow_mut() = Some(handle);

    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);
    assert_eq!(scope.watcher_count(), 0);

    scope.set("a_value", "b");
    scope.digest().unwrap();
    assert_eq!(counter.get(), 1);
}

#[test]
fn a_listener_may_remove_another_watcher_mid_pass() {
    let scope = Scope::new();
    scope.set("a_value", "a");
    let first_fired = Rc::new(Cell::new(0u32));
    let third_fired = Rc::new(Cell::new(0u32));

    let first_spy = first_fired.clone();
    let remove_first: Rc<RefCell<Option<RemoveWatch>>> = Rc::new(RefCell::new(None));

    let handle = scope.watch_key("a_value", move |_, _, _| {
        first_spy.set(first_spy.get() + 1);
    });
    *remove_first.borrow_mut() = Some(handle);

    let remover = remove_first.clone();
    scope.watch_key("a_value", move |_, _, _| {
        if let Some(remove) = remover.borrow_mut().take() {
            remove();
        }
    });

    let third_spy = third_fired.clone();
    scope.watch_key("a_value", move |_, _, _| {
        third_spy.set(third_spy.get() + 1);
    });

    scope.digest().unwrap();

    // The first watcher fired before its removal; the third was still
    // visited even though the registry shrank mid-pass.
    assert_eq!(first_fired.get(), 1);
    assert_eq!(third_fired.get(), 1);
    assert_eq!(scope.watcher_count(), 2);

    scope.set("a_value", "b");
    scope.digest().unwrap();
    assert_eq!(first_fired.get(), 1);
    assert_eq!(third_fired.get(), 2);
}
