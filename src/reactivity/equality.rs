// ============================================================================
// scope-digest - Equality and Snapshots
// The two comparison strategies a watcher can select, plus deep cloning
// ============================================================================
//
// A watcher stores the value from its previous run and compares the fresh
// value against it. The default strategy is reference equality: cheap, and
// blind to in-place container mutation. The opt-in strategy is deep
// structural equality, which requires the stored snapshot to be a deep copy
// (a shared handle would always compare equal to the live structure).
//
// Both strategies treat NaN as equal to NaN. Plain IEEE comparison would
// make a NaN-valued watcher eternally dirty and starve convergence.
// =============================================================================

use crate::core::value::Value;

// =============================================================================
// NUMBER EQUALITY
// =============================================================================

/// IEEE 754 equality except that `NaN == NaN` is **true**.
///
/// # Example
/// ```
/// use scope_digest::reactivity::equality::number_equals;
///
/// assert!(number_equals(1.0, 1.0));
/// assert!(!number_equals(1.0, 2.0));
/// assert!(number_equals(f64::NAN, f64::NAN));
/// assert!(!number_equals(f64::NAN, 1.0));
/// ```
pub fn number_equals(a: f64, b: f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

// =============================================================================
// REFERENCE EQUALITY (Default)
// =============================================================================

/// Identity comparison: primitives by value, containers by shared pointer.
///
/// Two different variants are never equal. Numbers use [`number_equals`];
/// strings are primitives and compare by content; arrays and objects compare
/// by `Rc::ptr_eq`, so in-place mutation does not register as a change.
///
/// # Example
/// ```
/// use scope_digest::Value;
/// use scope_digest::reactivity::equality::ref_equals;
///
/// let array = Value::array(vec![Value::from(1.0)]);
/// let alias = array.clone();
/// let rebuilt = Value::array(vec![Value::from(1.0)]);
///
/// assert!(ref_equals(&array, &alias));
/// assert!(!ref_equals(&array, &rebuilt));
/// ```
pub fn ref_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => true,
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => number_equals(*a, *b),
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => std::rc::Rc::ptr_eq(a, b),
        (Value::Object(a), Value::Object(b)) => std::rc::Rc::ptr_eq(a, b),
        _ => false,
    }
}

// =============================================================================
// DEEP EQUALITY
// =============================================================================

/// Recursive structural comparison with the NaN-equals-NaN rule.
///
/// Arrays compare element-wise, objects key-wise. Shared identity is
/// irrelevant; two independently built structures with the same shape and
/// contents are equal.
pub fn deep_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(a), Value::Array(b)) => {
            if std::rc::Rc::ptr_eq(a, b) {
                return true;
            }
            let a = a.borrow();
            let b = b.borrow();
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| deep_equals(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            if std::rc::Rc::ptr_eq(a, b) {
                return true;
            }
            let a = a.borrow();
            let b = b.borrow();
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| deep_equals(x, y)))
        }
        _ => ref_equals(a, b),
    }
}

// =============================================================================
// DEEP CLONE
// =============================================================================

/// Recursive structural copy producing fresh containers at every level.
///
/// Used to snapshot deep-value watchers: the watched structure may be mutated
/// in place, so the stored "last" value must not alias it.
pub fn deep_clone(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            Value::array(items.borrow().iter().map(deep_clone).collect())
        }
        Value::Object(entries) => Value::object(
            entries
                .borrow()
                .iter()
                .map(|(key, v)| (key.clone(), deep_clone(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

// =============================================================================
// STRATEGY SELECTION
// =============================================================================

/// Compare with the strategy a watcher selected.
pub fn values_equal(a: &Value, b: &Value, value_eq: bool) -> bool {
    if value_eq {
        deep_equals(a, b)
    } else {
        ref_equals(a, b)
    }
}

/// Snapshot a freshly computed value for storage as a watcher's last value.
///
/// Deep-value watchers get a deep copy; reference watchers store the value
/// itself (container snapshots share the live structure on purpose).
pub fn snapshot(value: &Value, value_eq: bool) -> Value {
    if value_eq {
        deep_clone(value)
    } else {
        value.clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================
