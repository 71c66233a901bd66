// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Pure order types and rules. Storage, caching and messaging live in their
// own modules and depend on this one, never the other way round.
//
// ============================================================================

pub mod order;
