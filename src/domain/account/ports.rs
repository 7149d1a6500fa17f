use async_trait::async_trait;
use uuid::Uuid;

use super::errors::{PublicationFailure, StorageError};
use super::events::AccountEvent;
use super::model::{Account, ListQuery};

// ============================================================================
// Ports - contracts the AccountService depends on
// ============================================================================

/// Durable account storage. Email uniqueness is enforced here and reported
/// as `StorageError::UniquenessConflict`.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn insert(&self, account: &Account) -> Result<Uuid, StorageError>;

    async fn update_by_id(&self, id: Uuid, account: &Account) -> Result<(), StorageError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StorageError>;

    async fn exists_by_id(&self, id: Uuid) -> Result<bool, StorageError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Account, StorageError>;

    /// One page of accounts matching every present filter, ordered by
    /// creation time then id.
    async fn find_by_filter(&self, query: &ListQuery) -> Result<Vec<Account>, StorageError>;
}

/// Hands an encoded event to the asynchronous bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, event: &AccountEvent) -> Result<(), PublicationFailure>;
}
