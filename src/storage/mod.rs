// ============================================================================
// Storage adapters for the AccountStore port
// ============================================================================

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgAccountStore;
