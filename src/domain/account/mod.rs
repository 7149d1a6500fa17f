// ============================================================================
// Account Domain - Business Logic for the Account Aggregate
// ============================================================================
//
// This module contains ALL Account-specific code:
// - Model (Account, AccountDraft, AccountPatch, ListQuery)
// - Credential hashing
// - Events (AccountEvent: Created, Updated)
// - Errors (AccountError, StorageError, PublicationFailure)
// - Ports (AccountStore, EventPublisher)
// - Service (AccountService orchestrator)
//
// ============================================================================

pub mod credential;
pub mod errors;
pub mod events;
pub mod model;
pub mod ports;
pub mod service;

// Re-export for convenience
pub use credential::Credential;
pub use errors::*;
pub use events::AccountEvent;
pub use model::*;
pub use ports::{AccountStore, EventPublisher};
pub use service::AccountService;
