// ============================================================================
// scope-digest - Dynamic Value Model
// The value type stored in a scope's property bag and seen by watchers
// ============================================================================
//
// The scope is an open-ended mapping from caller-defined names to values of
// any shape, so the engine needs one dynamic value type. Containers (arrays,
// objects) are held behind Rc<RefCell<...>>:
//
// - `clone()` is shallow: primitives copy, containers share the Rc. Reading
//   a property twice yields the *same* container, which is what the default
//   reference-equality strategy compares.
// - Callers can mutate a container in place through the shared handle; only
//   deep-value watchers observe such mutations.
// =============================================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A dynamically-typed value held by a [`Scope`](crate::Scope).
///
/// Cloning is shallow; [`Array`](Value::Array) and [`Object`](Value::Object)
/// clones share the underlying container. There is deliberately no
/// `PartialEq` impl: the engine always compares values with one of the two
/// named strategies in [`reactivity::equality`](crate::reactivity::equality).
///
/// # Example
/// ```
/// use scope_digest::Value;
///
/// let v = Value::array(vec![Value::from(1.0), Value::from(2.0)]);
/// let alias = v.clone();
///
/// // In-place mutation through one handle is visible through the other.
/// alias.as_array().unwrap().borrow_mut().push(Value::from(3.0));
/// assert_eq!(v.as_array().unwrap().borrow().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent / not-yet-set. Reading a missing property yields this.
    Undefined,
    /// An explicit null.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. Like the equality helpers, watchers treat NaN == NaN.
    Number(f64),
    /// A string, compared by content (strings are primitives here).
    Str(Rc<str>),
    /// A shared, in-place-mutable array.
    Array(Rc<RefCell<Vec<Value>>>),
    /// A shared, in-place-mutable string-keyed map.
    Object(Rc<RefCell<HashMap<String, Value>>>),
}

impl Value {
    /// Build an array value from parts.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    /// Build an object value from parts.
    pub fn object(entries: HashMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(entries)))
    }

    /// True for `Undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// The number inside, if this is a `Number`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean inside, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The string inside, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// A handle to the shared array, if this is an `Array`.
    pub fn as_array(&self) -> Option<Rc<RefCell<Vec<Value>>>> {
        match self {
            Value::Array(items) => Some(Rc::clone(items)),
            _ => None,
        }
    }

    /// A handle to the shared object, if this is an `Object`.
    pub fn as_object(&self) -> Option<Rc<RefCell<HashMap<String, Value>>>> {
        match self {
            Value::Object(entries) => Some(Rc::clone(entries)),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s.as_str()))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(entries: HashMap<String, Value>) -> Self {
        Value::object(entries)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_produce_expected_variants() {
        assert_eq!(Value::from(1.5).as_number(), Some(1.5));
        assert_eq!(Value::from(3i32).as_number(), Some(3.0));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from("hi").as_str(), Some("hi"));
        assert_eq!(Value::from(String::from("hi")).as_str(), Some("hi"));
        assert!(Value::default().is_undefined());
    }

    #[test]
    fn accessors_reject_other_variants() {
        assert_eq!(Value::from("hi").as_number(), None);
        assert_eq!(Value::Null.as_str(), None);
        assert!(Value::from(1.0).as_array().is_none());
        assert!(Value::Undefined.as_object().is_none());
    }

    #[test]
    fn array_clone_shares_storage() {
        let v = Value::array(vec![Value::from(1.0)]);
        let alias = v.clone();

        alias.as_array().unwrap().borrow_mut().push(Value::from(2.0));

        let items = v.as_array().unwrap();
        let items = items.borrow();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_number(), Some(2.0));
    }

    #[test]
    fn object_clone_shares_storage() {
        let v = Value::object(HashMap::new());
        let alias = v.clone();

        alias
            .as_object()
            .unwrap()
            .borrow_mut()
            .insert("key".to_string(), Value::from(42.0));

        let entries = v.as_object().unwrap();
        let entries = entries.borrow();
        assert_eq!(entries.get("key").and_then(Value::as_number), Some(42.0));
    }
}
