use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::credential::Credential;
use super::errors::AccountError;

// ============================================================================
// Account Aggregate State
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub handle: String,
    pub country: String,
    pub credential: Credential,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields supplied at creation. Identifier, timestamps and the hashed
/// credential are assigned by the service.
#[derive(Debug, Clone)]
pub struct AccountDraft {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub handle: String,
    pub country: String,
    pub password: String,
}

// ============================================================================
// Partial Update
// ============================================================================
//
// `None` leaves the stored value untouched. `Some(v)` replaces it, even when
// `v` is empty, except for email and password which must stay non-empty.
//
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub handle: Option<String>,
    pub country: Option<String>,
    pub password: Option<String>,
}

impl AccountPatch {
    pub fn validate(&self) -> Result<(), AccountError> {
        if matches!(self.email.as_deref(), Some(email) if email.trim().is_empty()) {
            return Err(AccountError::validation("email cannot be empty"));
        }
        if matches!(self.password.as_deref(), Some("")) {
            return Err(AccountError::validation("password cannot be empty"));
        }
        Ok(())
    }

    /// Merge the present fields into `account`.
    ///
    /// The new password, if any, is handed back unhashed: hashing is async
    /// and belongs to the caller.
    pub fn apply_to(self, account: &mut Account) -> Option<String> {
        if let Some(email) = self.email {
            account.email = email;
        }
        if let Some(first_name) = self.first_name {
            account.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            account.last_name = last_name;
        }
        if let Some(handle) = self.handle {
            account.handle = handle;
        }
        if let Some(country) = self.country {
            account.country = country;
        }
        self.password
    }
}

// ============================================================================
// Listing
// ============================================================================

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Conjunctive equality filters. Absent filters are left out of the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    pub country: Option<String>,
    pub email: Option<String>,
    pub handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    page_number: u64,
    page_size: u64,
    pub filter: ListFilter,
}

impl ListQuery {
    /// `page_number` is one-based.
    pub fn new(page_number: u64, page_size: u64) -> Result<Self, AccountError> {
        if page_number < 1 {
            return Err(AccountError::validation("page number must be at least 1"));
        }
        if page_size < 1 {
            return Err(AccountError::validation("page size must be at least 1"));
        }
        Ok(Self {
            page_number,
            page_size,
            filter: ListFilter::default(),
        })
    }

    pub fn with_filter(mut self, filter: ListFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        (self.page_number - 1).saturating_mul(self.page_size)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
            filter: ListFilter::default(),
        }
    }
}
