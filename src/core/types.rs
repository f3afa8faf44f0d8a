// ============================================================================
// scope-digest - Type Definitions
// Phase tracking and the engine error type
// ============================================================================

use std::fmt;

// =============================================================================
// PHASE
// =============================================================================

/// What kind of operation is currently unwinding synchronously on a scope.
///
/// Visible to watch functions, listeners and applied functions through
/// [`Scope::phase`](crate::Scope::phase): `Digest` while a digest pass is
/// running, `Apply` while an `apply`'d function runs, `None` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No digest or apply is in progress.
    #[default]
    None,
    /// A digest loop is running on this scope.
    Digest,
    /// An `apply`'d function is running on this scope.
    Apply,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::None => write!(f, "none"),
            Phase::Digest => write!(f, "digest"),
            Phase::Apply => write!(f, "apply"),
        }
    }
}

// =============================================================================
// SCOPE ERROR
// =============================================================================

/// Errors the digest engine can produce.
///
/// User-supplied callback failures are never caught by the engine; these two
/// variants are the only designed failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    /// The digest loop failed to converge within the iteration budget.
    ///
    /// Signals a caller bug: circularly-dependent watchers, or async work
    /// that keeps re-queuing itself. Not recoverable by the engine.
    RunawayDigest {
        /// The budget that was exhausted.
        iterations: u32,
    },
    /// A digest or apply was started while the given phase was already
    /// active on the same scope.
    PhaseInProgress(Phase),
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::RunawayDigest { iterations } => write!(
                f,
                "{iterations} digest iterations reached without convergence"
            ),
            ScopeError::PhaseInProgress(phase) => {
                write!(f, "{phase} already in progress")
            }
        }
    }
}

impl std::error::Error for ScopeError {}

// =============================================================================
// TESTS
// =============================================================================
