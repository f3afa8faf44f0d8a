// ============================================================================
// scope-digest - Constants
// Tunables for the digest engine
// ============================================================================

/// Maximum number of outer digest iterations before the loop is declared
/// runaway and `digest()` fails.
///
/// An iteration counts against the budget whenever a pass reported a dirty
/// watcher or async work was queued again. Exhausting it means two watchers
/// keep dirtying each other, or a task keeps re-queuing itself.
pub const MAX_DIGEST_ITERATIONS: u32 = 10;
