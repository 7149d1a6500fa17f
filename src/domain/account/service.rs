use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::credential::Credential;
use super::errors::AccountError;
use super::events::AccountEvent;
use super::model::{Account, AccountDraft, AccountPatch, ListQuery};
use super::ports::AccountStore;
use crate::messaging::EventDispatcher;

// ============================================================================
// Account Service - orchestrates storage writes and event publication
// ============================================================================
//
// The storage call is always awaited and decides the outcome the caller
// sees. The matching event is dispatched afterwards and never awaited:
// a successful write whose event is lost is still a success.
//
// ============================================================================

pub struct AccountService {
    store: Arc<dyn AccountStore>,
    events: EventDispatcher,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>, events: EventDispatcher) -> Self {
        Self { store, events }
    }

    pub async fn create(&self, draft: AccountDraft) -> Result<Uuid, AccountError> {
        if draft.email.trim().is_empty() {
            return Err(AccountError::validation("email is required"));
        }
        if draft.password.is_empty() {
            return Err(AccountError::validation("password is required"));
        }

        let credential = Credential::hash(draft.password).await?;

        let account = Account {
            id: Uuid::new_v4(),
            email: draft.email,
            first_name: draft.first_name,
            last_name: draft.last_name,
            handle: draft.handle,
            country: draft.country,
            credential,
            created_at: Utc::now(),
            updated_at: None,
        };

        let id = self
            .store
            .insert(&account)
            .await
            .map_err(|e| AccountError::from_storage(e, account.id))?;

        tracing::info!(account_id = %id, "Account created");

        self.events.dispatch(AccountEvent::Created {
            account_id: id,
            timestamp: account.created_at,
        });

        Ok(id)
    }

    /// Merge `patch` into the stored account. Concurrent updates to the same
    /// account are not serialized: the last write wins.
    pub async fn update(&self, id: Uuid, patch: AccountPatch) -> Result<(), AccountError> {
        patch.validate()?;

        let mut account = self
            .store
            .find_by_id(id)
            .await
            .map_err(|e| AccountError::from_storage(e, id))?;

        if let Some(password) = patch.apply_to(&mut account) {
            account.credential = Credential::hash(password).await?;
        }

        let updated_at = Utc::now();
        account.updated_at = Some(updated_at);

        self.store
            .update_by_id(id, &account)
            .await
            .map_err(|e| AccountError::from_storage(e, id))?;

        tracing::info!(account_id = %id, "Account updated");

        self.events.dispatch(AccountEvent::Updated {
            account_id: id,
            timestamp: updated_at,
        });

        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AccountError> {
        let exists = self
            .store
            .exists_by_id(id)
            .await
            .map_err(AccountError::StorageFailure)?;

        if !exists {
            return Err(AccountError::AccountNotFound(id));
        }

        self.store
            .delete_by_id(id)
            .await
            .map_err(|e| AccountError::from_storage(e, id))?;

        tracing::info!(account_id = %id, "Account deleted");
        Ok(())
    }

    pub async fn list(&self, query: ListQuery) -> Result<Vec<Account>, AccountError> {
        tracing::debug!(
            page_number = query.page_number(),
            page_size = query.page_size(),
            "Listing accounts"
        );

        self.store
            .find_by_filter(&query)
            .await
            .map_err(AccountError::StorageFailure)
    }

    pub async fn get(&self, id: Uuid) -> Result<Account, AccountError> {
        self.store
            .find_by_id(id)
            .await
            .map_err(|e| AccountError::from_storage(e, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{EventPublisher, ListFilter, PublicationFailure, StorageError};
    use crate::metrics::Metrics;
    use crate::storage::memory::InMemoryAccountStore;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct ChannelPublisher(mpsc::UnboundedSender<(String, String, AccountEvent)>);

    #[async_trait]
    impl EventPublisher for ChannelPublisher {
        async fn publish(&self, topic: &str, key: &str, event: &AccountEvent) -> Result<(), PublicationFailure> {
            self.0
                .send((topic.to_owned(), key.to_owned(), *event))
                .map_err(|_| PublicationFailure::Closed)
        }
    }

    struct FailingPublisher;

    #[async_trait]
    impl EventPublisher for FailingPublisher {
        async fn publish(&self, _topic: &str, _key: &str, _event: &AccountEvent) -> Result<(), PublicationFailure> {
            Err(PublicationFailure::Delivery("broker down".to_string()))
        }
    }

    struct Harness {
        service: AccountService,
        store: Arc<InMemoryAccountStore>,
        dispatcher: EventDispatcher,
        events: mpsc::UnboundedReceiver<(String, String, AccountEvent)>,
    }

    impl Harness {
        fn with_store(store: InMemoryAccountStore) -> Self {
            let (tx, events) = mpsc::unbounded_channel();
            let store = Arc::new(store);
            let dispatcher = EventDispatcher::new(
                Arc::new(ChannelPublisher(tx)),
                16,
                Arc::new(Metrics::new().unwrap()),
            );
            let service = AccountService::new(store.clone(), dispatcher.clone());
            Self {
                service,
                store,
                dispatcher,
                events,
            }
        }

        fn new() -> Self {
            Self::with_store(InMemoryAccountStore::new())
        }

        /// Events dispatched so far, once every publication has finished.
        async fn drain_events(&mut self) -> Vec<(String, String, AccountEvent)> {
            assert!(self.dispatcher.wait_idle(Duration::from_secs(2)).await);
            let mut drained = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                drained.push(event);
            }
            drained
        }
    }

    fn draft(email: &str) -> AccountDraft {
        AccountDraft {
            email: email.to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            handle: "grace".to_string(),
            country: "US".to_string(),
            password: "c0b0l-rules".to_string(),
        }
    }

    fn stored_account(email: &str, country: &str, created_at: chrono::DateTime<Utc>) -> Account {
        Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            handle: email.split('@').next().unwrap_or_default().to_string(),
            country: country.to_string(),
            credential: Credential::from_hash("$argon2id$stub"),
            created_at,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_persists_hashed_account_and_emits_created() {
        let mut h = Harness::new();

        let id = h.service.create(draft("grace@example.com")).await.unwrap();

        let stored = h.store.snapshot(id).unwrap();
        assert_eq!(stored.email, "grace@example.com");
        assert_eq!(stored.updated_at, None);
        assert_ne!(stored.credential.as_str(), "c0b0l-rules");
        assert!(stored.credential.verify("c0b0l-rules"));

        let events = h.drain_events().await;
        assert_eq!(events.len(), 1);
        let (topic, key, event) = &events[0];
        assert_eq!(topic, "AccountCreated");
        assert_eq!(key, &id.to_string());
        assert_eq!(
            *event,
            AccountEvent::Created {
                account_id: id,
                timestamp: stored.created_at
            }
        );
    }

    #[tokio::test]
    async fn test_create_with_taken_email_emits_nothing() {
        let mut h = Harness::new();
        h.service.create(draft("grace@example.com")).await.unwrap();
        h.drain_events().await;

        let result = h.service.create(draft("grace@example.com")).await;

        assert!(matches!(result, Err(AccountError::EmailAlreadyInUse)));
        assert!(h.drain_events().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_missing_email_or_password() {
        let h = Harness::new();

        let no_email = h.service.create(draft("  ")).await;
        let no_password = h
            .service
            .create(AccountDraft {
                password: String::new(),
                ..draft("grace@example.com")
            })
            .await;

        assert!(matches!(no_email, Err(AccountError::ValidationFailure(_))));
        assert!(matches!(no_password, Err(AccountError::ValidationFailure(_))));
        assert_eq!(h.store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_is_wrapped_and_emits_nothing() {
        let mut h = Harness::with_store(InMemoryAccountStore::broken());

        let result = h.service.create(draft("grace@example.com")).await;

        assert!(matches!(
            result,
            Err(AccountError::StorageFailure(StorageError::Other(_)))
        ));
        assert!(h.drain_events().await.is_empty());
    }

    #[tokio::test]
    async fn test_publication_failures_stay_invisible_to_callers() {
        let store = Arc::new(InMemoryAccountStore::new());
        let dispatcher = EventDispatcher::new(Arc::new(FailingPublisher), 16, Arc::new(Metrics::new().unwrap()));
        let service = AccountService::new(store.clone(), dispatcher.clone());

        let id = service.create(draft("grace@example.com")).await.unwrap();
        service
            .update(
                id,
                AccountPatch {
                    handle: Some("amazing-grace".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(dispatcher.wait_idle(Duration::from_secs(2)).await);
        let stored = store.snapshot(id).unwrap();
        assert_eq!(stored.handle, "amazing-grace");
        assert!(stored.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_each_create_returns_the_stored_id() {
        let mut h = Harness::new();

        let mut ids = Vec::new();
        for n in 0..5 {
            ids.push(h.service.create(draft(&format!("user{n}@example.com"))).await.unwrap());
        }

        let distinct: HashSet<Uuid> = ids.iter().copied().collect();
        assert_eq!(distinct.len(), ids.len());
        for (n, id) in ids.iter().enumerate() {
            let stored = h.store.snapshot(*id).unwrap();
            assert_eq!(stored.id, *id);
            assert_eq!(stored.email, format!("user{n}@example.com"));
        }

        let events = h.drain_events().await;
        let created: HashSet<(String, Uuid)> = events
            .iter()
            .map(|(topic, _, event)| (topic.clone(), event.account_id()))
            .collect();
        let keys: HashSet<String> = events.iter().map(|(_, key, _)| key.clone()).collect();
        assert_eq!(events.len(), ids.len());
        assert_eq!(created, ids.iter().map(|id| ("AccountCreated".to_string(), *id)).collect());
        assert_eq!(keys, ids.iter().map(Uuid::to_string).collect());
    }

    #[tokio::test]
    async fn test_update_missing_account_never_writes() {
        let mut h = Harness::new();
        let id = Uuid::new_v4();

        let result = h
            .service
            .update(
                id,
                AccountPatch {
                    handle: Some("ghost".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AccountError::AccountNotFound(got)) if got == id));
        assert_eq!(h.store.updates.load(Ordering::SeqCst), 0);
        assert!(h.drain_events().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_present_fields_and_emits_updated() {
        let mut h = Harness::new();
        let original = stored_account("ada@example.com", "GB", Utc::now());
        h.store.seed(original.clone());

        h.service
            .update(
                original.id,
                AccountPatch {
                    handle: Some("countess".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = h.store.snapshot(original.id).unwrap();
        assert_eq!(stored.handle, "countess");
        assert_eq!(stored.email, original.email);
        assert_eq!(stored.first_name, original.first_name);
        assert_eq!(stored.last_name, original.last_name);
        assert_eq!(stored.country, original.country);
        assert_eq!(stored.credential, original.credential);
        assert_eq!(stored.created_at, original.created_at);
        let updated_at = stored.updated_at.unwrap();

        let events = h.drain_events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "AccountUpdated");
        assert_eq!(
            events[0].2,
            AccountEvent::Updated {
                account_id: original.id,
                timestamp: updated_at
            }
        );
    }

    #[tokio::test]
    async fn test_update_rehashes_new_password() {
        let h = Harness::new();
        let original = stored_account("ada@example.com", "GB", Utc::now());
        h.store.seed(original.clone());

        h.service
            .update(
                original.id,
                AccountPatch {
                    password: Some("analytical-engine".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = h.store.snapshot(original.id).unwrap();
        assert_ne!(stored.credential.as_str(), "analytical-engine");
        assert!(stored.credential.verify("analytical-engine"));
    }

    #[tokio::test]
    async fn test_update_to_taken_email_is_rejected() {
        let mut h = Harness::new();
        let ada = stored_account("ada@example.com", "GB", Utc::now());
        let grace = stored_account("grace@example.com", "US", Utc::now());
        h.store.seed(ada.clone());
        h.store.seed(grace);

        let result = h
            .service
            .update(
                ada.id,
                AccountPatch {
                    email: Some("grace@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AccountError::EmailAlreadyInUse)));
        assert!(h.drain_events().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_account_never_deletes() {
        let h = Harness::new();
        let id = Uuid::new_v4();

        let result = h.service.delete(id).await;

        assert!(matches!(result, Err(AccountError::AccountNotFound(got)) if got == id));
        assert_eq!(h.store.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_account_without_event() {
        let mut h = Harness::new();
        let account = stored_account("ada@example.com", "GB", Utc::now());
        h.store.seed(account.clone());

        h.service.delete(account.id).await.unwrap();

        assert!(h.store.snapshot(account.id).is_none());
        assert!(matches!(
            h.service.get(account.id).await,
            Err(AccountError::AccountNotFound(_))
        ));
        assert!(h.drain_events().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_pages_are_disjoint() {
        let h = Harness::new();
        let start = Utc::now();
        for i in 0..15 {
            h.store.seed(stored_account(
                &format!("user{i}@example.com"),
                "FR",
                start + ChronoDuration::seconds(i),
            ));
        }

        let first = h.service.list(ListQuery::new(1, 10).unwrap()).await.unwrap();
        let second = h.service.list(ListQuery::new(2, 10).unwrap()).await.unwrap();
        let third = h.service.list(ListQuery::new(3, 10).unwrap()).await.unwrap();

        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 5);
        assert!(third.is_empty());

        let first_ids: HashSet<Uuid> = first.iter().map(|a| a.id).collect();
        assert!(second.iter().all(|a| !first_ids.contains(&a.id)));
        assert_eq!(first[0].email, "user0@example.com");
        assert_eq!(second[0].email, "user10@example.com");
    }

    #[tokio::test]
    async fn test_list_applies_filters_conjunctively() {
        let h = Harness::new();
        let now = Utc::now();
        h.store.seed(stored_account("ada@example.com", "GB", now));
        h.store.seed(stored_account("alan@example.com", "GB", now));
        h.store.seed(stored_account("grace@example.com", "US", now));

        let query = ListQuery::default().with_filter(ListFilter {
            country: Some("GB".to_string()),
            handle: Some("alan".to_string()),
            email: None,
        });
        let found = h.service.list(query).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email, "alan@example.com");
    }

    #[tokio::test]
    async fn test_list_storage_failure_is_wrapped() {
        let h = Harness::with_store(InMemoryAccountStore::broken());

        let result = h.service.list(ListQuery::default()).await;

        assert!(matches!(result, Err(AccountError::StorageFailure(_))));
    }
}
