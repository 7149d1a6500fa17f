use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::domain::account::{Account, AccountStore, ListQuery, StorageError};

/// In-process `AccountStore` for tests. Mirrors the Postgres adapter's
/// contract: unique email, `(created_at, id)` ordering, NotFound on a
/// missing row.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<Vec<Account>>,
    broken: AtomicBool,
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with an opaque storage error.
    pub fn broken() -> Self {
        let store = Self::default();
        store.broken.store(true, Ordering::SeqCst);
        store
    }

    pub fn seed(&self, account: Account) {
        self.accounts.lock().unwrap().push(account);
    }

    pub fn snapshot(&self, id: Uuid) -> Option<Account> {
        self.accounts.lock().unwrap().iter().find(|a| a.id == id).cloned()
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StorageError::other("connection refused"));
        }
        Ok(())
    }

    fn email_taken(accounts: &[Account], email: &str, except: Option<Uuid>) -> bool {
        accounts.iter().any(|a| a.email == email && Some(a.id) != except)
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn insert(&self, account: &Account) -> Result<Uuid, StorageError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        let mut accounts = self.accounts.lock().unwrap();
        if Self::email_taken(&accounts, &account.email, None) {
            return Err(StorageError::UniquenessConflict("accounts_email_key".to_string()));
        }
        accounts.push(account.clone());
        Ok(account.id)
    }

    async fn update_by_id(&self, id: Uuid, account: &Account) -> Result<(), StorageError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        let mut accounts = self.accounts.lock().unwrap();
        if Self::email_taken(&accounts, &account.email, Some(id)) {
            return Err(StorageError::UniquenessConflict("accounts_email_key".to_string()));
        }
        let stored = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StorageError::NotFound)?;
        *stored = Account {
            id,
            created_at: stored.created_at,
            ..account.clone()
        };
        Ok(())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check()?;

        self.accounts.lock().unwrap().retain(|a| a.id != id);
        Ok(())
    }

    async fn exists_by_id(&self, id: Uuid) -> Result<bool, StorageError> {
        self.check()?;
        Ok(self.accounts.lock().unwrap().iter().any(|a| a.id == id))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Account, StorageError> {
        self.check()?;
        self.snapshot(id).ok_or(StorageError::NotFound)
    }

    async fn find_by_filter(&self, query: &ListQuery) -> Result<Vec<Account>, StorageError> {
        self.check()?;

        let matches = |wanted: &Option<String>, actual: &str| wanted.as_deref().map_or(true, |w| w == actual);

        let mut found: Vec<Account> = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                matches(&query.filter.country, &a.country)
                    && matches(&query.filter.email, &a.email)
                    && matches(&query.filter.handle, &a.handle)
            })
            .cloned()
            .collect();
        found.sort_by_key(|a| (a.created_at, a.id));

        Ok(found
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size() as usize)
            .collect())
    }
}
