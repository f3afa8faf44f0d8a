// ============================================================================
// scope-digest - Reactivity Module
// Comparison strategies and the deferred-scheduling primitive
// ============================================================================

pub mod equality;
pub mod schedule;
