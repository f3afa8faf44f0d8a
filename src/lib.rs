// ============================================================================
// scope-digest - A Dirty-Checking Change Propagation Engine
// ============================================================================
//
// A mutable data container ("scope") lets callers register watchers - pairs
// of a value-producing function and a reaction callback - and a digest
// algorithm re-evaluates all watchers until no more changes are observed,
// invoking reactions for anything that changed. This is the dependency-free
// core a declarative binding layer builds on; it knows nothing about
// templates, scope hierarchies, or any host event loop.
// ============================================================================

pub mod core;
pub mod reactivity;
pub mod scope;

// Re-export the public surface at crate root for ergonomic access
pub use self::core::constants;
pub use self::core::types::{Phase, ScopeError};
pub use self::core::value::Value;

pub use self::reactivity::equality::{
    deep_clone, deep_equals, number_equals, ref_equals, snapshot, values_equal,
};
pub use self::reactivity::schedule::{DeferredTask, Scheduler, TaskQueue};

pub use self::scope::{ListenerFn, RemoveWatch, Scope, WatchFn};

// =============================================================================
// TESTS
// =============================================================================
