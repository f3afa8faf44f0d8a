// ============================================================================
// scope-digest - Core Module
// Foundational types for the digest engine
// ============================================================================

pub mod constants;
pub mod types;
pub mod value;
