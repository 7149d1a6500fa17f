// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory with:
// - Model (aggregate state, drafts, patches, queries)
// - Events
// - Errors
// - Ports (storage + publication contracts)
// - Service (the orchestrator driving the ports)
//
// Infrastructure adapters live in src/storage and src/messaging.
//
// ============================================================================

pub mod account;
