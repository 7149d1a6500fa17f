use chrono::{DateTime, Utc};
use uuid::Uuid;

// ============================================================================
// Account Domain Events
// ============================================================================
//
// Events only identify the account and when the change happened. Consumers
// that need the current state re-fetch it.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEvent {
    Created {
        account_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    Updated {
        account_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl AccountEvent {
    /// Event kind name. Doubles as the topic the event is published on.
    pub fn kind(&self) -> &'static str {
        match self {
            AccountEvent::Created { .. } => "AccountCreated",
            AccountEvent::Updated { .. } => "AccountUpdated",
        }
    }

    pub fn account_id(&self) -> Uuid {
        match self {
            AccountEvent::Created { account_id, .. } | AccountEvent::Updated { account_id, .. } => {
                *account_id
            }
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::Created { timestamp, .. } | AccountEvent::Updated { timestamp, .. } => {
                *timestamp
            }
        }
    }

    /// Partitioning key: the account id, so events for one account keep
    /// their relative order on the transport.
    pub fn key(&self) -> String {
        self.account_id().to_string()
    }
}
