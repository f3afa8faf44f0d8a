// ============================================================================
// scope-digest - Scope and Watcher Registry
// The mutable property bag, watcher registration, and the eval/apply entries
// ============================================================================
//
// A Scope is a cheap handle over Rc'd shared state, the same handle-over-
// inner shape signals use elsewhere. Everything is single-threaded; interior
// mutability is RefCell/Cell and no borrow is ever held across a call into
// user code (watch functions, listeners and applied functions may re-enter
// the registry and the property bag freely).
// =============================================================================

mod digest;

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use crate::core::types::{Phase, ScopeError};
use crate::core::value::Value;
use crate::reactivity::schedule::{Scheduler, TaskQueue};

// =============================================================================
// FUNCTION TYPES
// =============================================================================

/// A value-producing watch function: evaluated against the scope every pass.
pub type WatchFn = Box<dyn Fn(&Scope) -> Value>;

/// A reaction callback: `(new_value, old_value, scope)`.
pub type ListenerFn = Box<dyn FnMut(&Value, &Value, &Scope)>;

/// Removes the watcher returned from registration. Safe to call at any time,
/// including from inside a digest pass, and idempotent.
pub type RemoveWatch = Box<dyn FnOnce()>;

/// A queued asynchronous task, run once with the scope as argument.
pub(crate) type AsyncTask = Box<dyn FnOnce(&Scope)>;

// =============================================================================
// WATCHER
// =============================================================================

pub(crate) struct Watcher {
    pub(crate) watch_fn: WatchFn,
    pub(crate) listener_fn: RefCell<ListenerFn>,
    pub(crate) value_eq: bool,
    /// Last seen value. `None` is the initial sentinel: distinct from every
    /// Value (including Undefined and NaN), so the first comparison is
    /// always "changed" and the listener fires at least once.
    pub(crate) last: RefCell<Option<Value>>,
    /// Cleared on removal. A pass in flight skips inactive watchers; the
    /// list is compacted once no pass is iterating it.
    pub(crate) active: Cell<bool>,
}

// =============================================================================
// SCOPE
// =============================================================================

pub(crate) struct ScopeInner {
    pub(crate) props: RefCell<HashMap<String, Value>>,
    pub(crate) watchers: RefCell<Vec<Rc<Watcher>>>,
    /// Most recently found dirty watcher in the current digest run, for the
    /// early-exit optimization. Weak: removal must not keep a watcher alive.
    pub(crate) last_dirty_watch: RefCell<Option<Weak<Watcher>>>,
    pub(crate) phase: Cell<Phase>,
    /// Tasks drained inside the current (or next) digest.
    pub(crate) async_queue: RefCell<VecDeque<AsyncTask>>,
    /// Tasks deferred to a later tick, flushed inside a single apply.
    pub(crate) apply_async_queue: RefCell<VecDeque<AsyncTask>>,
    /// Whether a deferred apply_async flush is currently scheduled. Doubles
    /// as the cancellation token a digest consumes when it absorbs the queue.
    pub(crate) apply_async_scheduled: Cell<bool>,
    pub(crate) scheduler: Rc<dyn Scheduler>,
}

/// A mutable data container with registered watchers and a digest loop that
/// propagates changes until the watchers converge.
///
/// `Scope` is a cheap clonable handle; clones observe the same state.
///
/// # Example
/// ```
/// use scope_digest::Scope;
///
/// let scope = Scope::new();
/// scope.set("name", "Jane");
///
/// scope.watch_key("name", |new, _old, s| {
///     if let Some(name) = new.as_str() {
///         s.set("greeting", format!("Hello, {name}!"));
///     }
/// });
///
/// scope.digest().unwrap();
/// assert_eq!(scope.get("greeting").as_str(), Some("Hello, Jane!"));
/// ```
#[derive(Clone)]
pub struct Scope {
    pub(crate) inner: Rc<ScopeInner>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// Create a fresh scope with an empty watcher list, empty queues and no
    /// phase active, backed by its own [`TaskQueue`].
    ///
    /// Without something pumping that queue, the deferred paths
    /// (`eval_async` outside a digest, `apply_async`) never fire; hosts that
    /// use them should construct via [`Scope::with_scheduler`] and keep a
    /// handle to the queue, or supply their own [`Scheduler`].
    pub fn new() -> Self {
        Self::with_scheduler(Rc::new(TaskQueue::new()))
    }

    /// Create a fresh scope deferring through the given host scheduler.
    pub fn with_scheduler(scheduler: Rc<dyn Scheduler>) -> Self {
        Scope {
            inner: Rc::new(ScopeInner {
                props: RefCell::new(HashMap::new()),
                watchers: RefCell::new(Vec::new()),
                last_dirty_watch: RefCell::new(None),
                phase: Cell::new(Phase::None),
                async_queue: RefCell::new(VecDeque::new()),
                apply_async_queue: RefCell::new(VecDeque::new()),
                apply_async_scheduled: Cell::new(false),
                scheduler,
            }),
        }
    }

    // =========================================================================
    // PROPERTY BAG
    // =========================================================================

    /// Set a property. Missing keys are created.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.props.borrow_mut().insert(key.into(), value.into());
    }

    /// Read a property. Missing keys read as [`Value::Undefined`].
    ///
    /// The returned value is a shallow clone: container properties come back
    /// as shared handles, so repeated reads of the same property compare
    /// reference-equal and in-place mutation is visible to all holders.
    pub fn get(&self, key: &str) -> Value {
        self.inner
            .props
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    /// True if the property has been set.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.props.borrow().contains_key(key)
    }

    /// Mutate a property in place; missing keys start as `Undefined`.
    ///
    /// The value is taken out of the bag while `f` runs, so `f` may read
    /// other properties (or the same key, which reads `Undefined`) without
    /// conflicting borrows.
    pub fn update(&self, key: &str, f: impl FnOnce(&mut Value)) {
        let mut value = self
            .inner
            .props
            .borrow_mut()
            .remove(key)
            .unwrap_or(Value::Undefined);
        f(&mut value);
        self.inner.props.borrow_mut().insert(key.to_string(), value);
    }

    // =========================================================================
    // WATCHER REGISTRY
    // =========================================================================

    /// Register a watcher with the default reference-equality strategy.
    ///
    /// `watch_fn` is evaluated every digest pass; when its result differs
    /// from the previous pass, `listener_fn` runs with `(new, old, scope)`.
    /// On the very first run the listener receives `old == new`.
    ///
    /// Returns a removal closure; see [`RemoveWatch`].
    pub fn watch(
        &self,
        watch_fn: impl Fn(&Scope) -> Value + 'static,
        listener_fn: impl FnMut(&Value, &Value, &Scope) + 'static,
    ) -> RemoveWatch {
        self.register(Box::new(watch_fn), Box::new(listener_fn), false)
    }

    /// Register a watcher comparing by deep structural equality.
    ///
    /// Detects in-place mutation of watched containers; the stored snapshot
    /// is a deep copy taken at comparison time.
    pub fn watch_value(
        &self,
        watch_fn: impl Fn(&Scope) -> Value + 'static,
        listener_fn: impl FnMut(&Value, &Value, &Scope) + 'static,
    ) -> RemoveWatch {
        self.register(Box::new(watch_fn), Box::new(listener_fn), true)
    }

    /// Register a watch function with no listener.
    ///
    /// The watch function still runs every pass and still participates in
    /// dirty tracking; useful when the watch function itself carries the
    /// side effect.
    pub fn watch_silent(&self, watch_fn: impl Fn(&Scope) -> Value + 'static) -> RemoveWatch {
        self.register(Box::new(watch_fn), Box::new(|_: &Value, _: &Value, _: &Scope| {}), false)
    }

    /// Watch a single property by name, with reference equality.
    pub fn watch_key(
        &self,
        key: impl Into<String>,
        listener_fn: impl FnMut(&Value, &Value, &Scope) + 'static,
    ) -> RemoveWatch {
        let key = key.into();
        self.watch(move |scope| scope.get(&key), listener_fn)
    }

    /// Watch a single property by name, with deep-value equality.
    pub fn watch_key_value(
        &self,
        key: impl Into<String>,
        listener_fn: impl FnMut(&Value, &Value, &Scope) + 'static,
    ) -> RemoveWatch {
        let key = key.into();
        self.watch_value(move |scope| scope.get(&key), listener_fn)
    }

    /// Number of live watchers.
    pub fn watcher_count(&self) -> usize {
        self.inner
            .watchers
            .borrow()
            .iter()
            .filter(|w| w.active.get())
            .count()
    }

    fn register(&self, watch_fn: WatchFn, listener_fn: ListenerFn, value_eq: bool) -> RemoveWatch {
        let watcher = Rc::new(Watcher {
            watch_fn,
            listener_fn: RefCell::new(listener_fn),
            value_eq,
            last: RefCell::new(None),
            active: Cell::new(true),
        });
        self.inner.watchers.borrow_mut().push(Rc::clone(&watcher));

        // A watcher registered mid-digest must not be starved by the
        // early-exit short-circuit of the pass that follows.
        *self.inner.last_dirty_watch.borrow_mut() = None;

        let inner = Rc::downgrade(&self.inner);
        let target = Rc::downgrade(&watcher);
        Box::new(move || {
            let (Some(inner), Some(watcher)) = (inner.upgrade(), target.upgrade()) else {
                return;
            };
            watcher.active.set(false);

            // An early-exit check must never reference a removed watcher.
            let points_at_removed = inner
                .last_dirty_watch
                .borrow()
                .as_ref()
                .and_then(Weak::upgrade)
                .is_some_and(|last| Rc::ptr_eq(&last, &watcher));
            if points_at_removed {
                *inner.last_dirty_watch.borrow_mut() = None;
            }

            // Compact now unless a pass is iterating the list; the digest
            // sweeps tombstones itself once it converges.
            if inner.phase.get() == Phase::None {
                inner.watchers.borrow_mut().retain(|w| w.active.get());
            }
        })
    }

    // =========================================================================
    // PHASE
    // =========================================================================

    /// The operation currently unwinding synchronously on this scope.
    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    pub(crate) fn begin_phase(&self, phase: Phase) -> Result<PhaseGuard, ScopeError> {
        let current = self.inner.phase.get();
        if current != Phase::None {
            return Err(ScopeError::PhaseInProgress(current));
        }
        self.inner.phase.set(phase);
        Ok(PhaseGuard {
            inner: Rc::clone(&self.inner),
        })
    }

    // =========================================================================
    // EVAL / APPLY
    // =========================================================================

    /// Invoke `f` with the scope and return its result. No digest runs.
    pub fn eval<R>(&self, f: impl FnOnce(&Scope) -> R) -> R {
        f(self)
    }

    /// Invoke `f` with the scope and an extra argument, passed straight
    /// through, and return its result. No digest runs.
    pub fn eval_with<A, R>(&self, f: impl FnOnce(&Scope, A) -> R, arg: A) -> R {
        f(self, arg)
    }

    /// Run `f` in the `Apply` phase, then digest.
    ///
    /// The phase is cleared on every exit path: if `f` panics the unwind
    /// leaves the scope phase-free and the digest does not run. Fails fast
    /// with [`ScopeError::PhaseInProgress`] when called while a digest or
    /// another apply is active.
    ///
    /// # Example
    /// ```
    /// use scope_digest::{Phase, Scope};
    ///
    /// let scope = Scope::new();
    /// scope.watch_key("count", |_new, _old, s| {
    ///     s.set("seen", true);
    /// });
    ///
    /// scope.apply(|s| {
    ///     assert_eq!(s.phase(), Phase::Apply);
    ///     s.set("count", 1.0);
    /// }).unwrap();
    ///
    /// assert_eq!(scope.get("seen").as_bool(), Some(true));
    /// ```
    pub fn apply<R>(&self, f: impl FnOnce(&Scope) -> R) -> Result<R, ScopeError> {
        let result = {
            let _guard = self.begin_phase(Phase::Apply)?;
            f(self)
        };
        self.digest()?;
        Ok(result)
    }
}

// =============================================================================
// PHASE GUARD
// =============================================================================

/// Releases the phase marker on every exit path, including unwinding.
pub(crate) struct PhaseGuard {
    inner: Rc<ScopeInner>,
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        self.inner.phase.set(Phase::None);
    }
}

// =============================================================================
// TESTS
// =============================================================================
