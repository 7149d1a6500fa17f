use chrono::{DateTime, Utc};
use prost::Message;
use prost_types::Timestamp;

use crate::domain::account::{AccountEvent, PublicationFailure};

// ============================================================================
// Event Wire Format
// ============================================================================
//
// Protobuf payloads, one message per event kind:
//
//   message AccountCreated { string account_id = 1; google.protobuf.Timestamp created_at = 2; }
//   message AccountUpdated { string account_id = 1; google.protobuf.Timestamp updated_at = 2; }
//
// ============================================================================

#[derive(Clone, PartialEq, Message)]
pub struct AccountCreated {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(message, optional, tag = "2")]
    pub created_at: Option<Timestamp>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AccountUpdated {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(message, optional, tag = "2")]
    pub updated_at: Option<Timestamp>,
}

pub fn to_timestamp(at: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: at.timestamp(),
        nanos: at.timestamp_subsec_nanos() as i32,
    }
}

/// Serialize an event into its protobuf payload.
pub fn encode_event(event: &AccountEvent) -> Result<Vec<u8>, PublicationFailure> {
    match event {
        AccountEvent::Created { account_id, timestamp } => encode(&AccountCreated {
            account_id: account_id.to_string(),
            created_at: Some(to_timestamp(*timestamp)),
        }),
        AccountEvent::Updated { account_id, timestamp } => encode(&AccountUpdated {
            account_id: account_id.to_string(),
            updated_at: Some(to_timestamp(*timestamp)),
        }),
    }
}

fn encode<M: Message>(message: &M) -> Result<Vec<u8>, PublicationFailure> {
    let mut buf = Vec::with_capacity(message.encoded_len());
    message.encode(&mut buf)?;
    Ok(buf)
}
