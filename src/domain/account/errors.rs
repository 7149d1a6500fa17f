use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// Storage Port Errors
// ============================================================================
//
// Every adapter classifies its failures into exactly these three kinds.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("record not found")]
    NotFound,

    #[error("uniqueness constraint violated: {0}")]
    UniquenessConflict(String),

    #[error(transparent)]
    Other(BoxError),
}

impl StorageError {
    pub fn other(err: impl Into<BoxError>) -> Self {
        StorageError::Other(err.into())
    }
}

// ============================================================================
// Account Business Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("email is already in use")]
    EmailAlreadyInUse,

    #[error("storage failure: {0}")]
    StorageFailure(#[source] StorageError),

    #[error("validation failed: {0}")]
    ValidationFailure(String),

    #[error("failed to hash credential: {0}")]
    CredentialHashing(String),
}

impl AccountError {
    /// Translate a storage failure for the account `id` into the orchestrator's
    /// own vocabulary. NotFound and UniquenessConflict map 1:1, the rest is
    /// wrapped opaquely.
    pub fn from_storage(err: StorageError, id: Uuid) -> Self {
        match err {
            StorageError::NotFound => AccountError::AccountNotFound(id),
            StorageError::UniquenessConflict(_) => AccountError::EmailAlreadyInUse,
            other => AccountError::StorageFailure(other),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        AccountError::ValidationFailure(reason.into())
    }
}

// ============================================================================
// Event Publication Errors
// ============================================================================
//
// Never surfaced past the dispatcher: the write has already succeeded.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PublicationFailure {
    #[error("failed to encode event: {0}")]
    Encoding(#[from] prost::EncodeError),

    #[error("failed to construct producer for topic {topic}: {reason}")]
    ChannelConstruction { topic: String, reason: String },

    #[error("channel for topic {0} is no longer accepting messages")]
    ChannelClosed(String),

    #[error("event sink is closed")]
    Closed,

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("circuit breaker open - transport unavailable")]
    CircuitOpen,
}
