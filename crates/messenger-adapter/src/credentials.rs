//! Page access-token resolution.
//!
//! Tokens are looked up in a [`CredentialStore`] under `"<service>:<page_id>"`,
//! falling back to a single statically configured token.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::MessengerError;
use crate::traits::CredentialStore;
use crate::types::{MessagingService, PageCredential};

/// Store key for a page's access token.
pub fn credential_key(service: MessagingService, page_id: &str) -> String {
    format!("{}:{}", service, page_id)
}

/// Process-local credential store.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from a page id → token map.
    pub fn from_pages(service: MessagingService, pages: &BTreeMap<String, String>) -> Self {
        let entries = pages
            .iter()
            .map(|(page_id, token)| (credential_key(service, page_id), token.clone()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub async fn insert(&self, service: MessagingService, page_id: &str, token: &str) {
        self.entries
            .write()
            .await
            .insert(credential_key(service, page_id), token.to_string());
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn access_token(&self, key: &str) -> Result<Option<String>, MessengerError> {
        Ok(self.entries.read().await.get(key).cloned())
    }
}

/// Resolves the access token for a page: store first, then the static fallback.
#[derive(Clone)]
pub struct CredentialResolver {
    service: MessagingService,
    store: Arc<dyn CredentialStore>,
    fallback: Option<String>,
}

impl CredentialResolver {
    pub fn new(
        service: MessagingService,
        store: Arc<dyn CredentialStore>,
        fallback: Option<String>,
    ) -> Self {
        Self {
            service,
            store,
            fallback,
        }
    }

    /// Blank tokens, stored or configured, count as absent.
    pub async fn resolve(&self, page_id: &str) -> Result<PageCredential, MessengerError> {
        let key = credential_key(self.service, page_id);
        let stored = self
            .store
            .access_token(&key)
            .await?
            .filter(|token| !token.trim().is_empty());

        let token = match stored {
            Some(token) => token,
            None => {
                tracing::debug!(page_id = %page_id, "no stored token, using configured fallback");
                self.fallback
                    .clone()
                    .filter(|token| !token.trim().is_empty())
                    .ok_or_else(|| MessengerError::MissingCredential {
                        service: self.service.to_string(),
                        page_id: page_id.to_string(),
                    })?
            }
        };

        Ok(PageCredential {
            id: page_id.to_string(),
            access_token: token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    #[async_trait]
    impl CredentialStore for FailingStore {
        async fn access_token(&self, _key: &str) -> Result<Option<String>, MessengerError> {
            Err(MessengerError::Credential("store offline".to_string()))
        }
    }

    fn resolver(store: InMemoryCredentialStore, fallback: Option<&str>) -> CredentialResolver {
        CredentialResolver::new(
            MessagingService::Facebook,
            Arc::new(store),
            fallback.map(str::to_string),
        )
    }

    #[test]
    fn key_format() {
        assert_eq!(
            credential_key(MessagingService::Facebook, "12345"),
            "facebook:12345"
        );
    }

    #[tokio::test]
    async fn store_from_pages() {
        let mut pages = BTreeMap::new();
        pages.insert("1".to_string(), "t1".to_string());
        pages.insert("2".to_string(), "t2".to_string());
        let store = InMemoryCredentialStore::from_pages(MessagingService::Facebook, &pages);
        assert_eq!(store.len().await, 2);
        assert_eq!(
            store.access_token("facebook:2").await.unwrap().as_deref(),
            Some("t2")
        );
        assert!(store.access_token("2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_token_wins_over_fallback() {
        let store = InMemoryCredentialStore::new();
        store
            .insert(MessagingService::Facebook, "PAGE", "stored-token")
            .await;
        let cred = resolver(store, Some("fallback-token"))
            .resolve("PAGE")
            .await
            .unwrap();
        assert_eq!(cred.id, "PAGE");
        assert_eq!(cred.access_token, "stored-token");
    }

    #[tokio::test]
    async fn fallback_used_when_page_unknown() {
        let cred = resolver(InMemoryCredentialStore::new(), Some("fallback-token"))
            .resolve("PAGE")
            .await
            .unwrap();
        assert_eq!(cred.access_token, "fallback-token");
    }

    #[tokio::test]
    async fn blank_stored_token_falls_back() {
        let store = InMemoryCredentialStore::new();
        store.insert(MessagingService::Facebook, "PAGE", "  ").await;
        let cred = resolver(store, Some("fallback-token"))
            .resolve("PAGE")
            .await
            .unwrap();
        assert_eq!(cred.access_token, "fallback-token");
    }

    #[tokio::test]
    async fn missing_everywhere_is_descriptive_error() {
        let err = resolver(InMemoryCredentialStore::new(), None)
            .resolve("PAGE_9")
            .await
            .unwrap_err();
        match err {
            MessengerError::MissingCredential { ref page_id, .. } => assert_eq!(page_id, "PAGE_9"),
            ref other => panic!("expected MissingCredential, got: {:?}", other),
        }
        assert!(err.to_string().contains("PAGE_9"));
    }

    #[tokio::test]
    async fn blank_fallback_is_missing() {
        let err = resolver(InMemoryCredentialStore::new(), Some(""))
            .resolve("PAGE")
            .await
            .unwrap_err();
        assert!(matches!(err, MessengerError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn store_errors_propagate() {
        let resolver = CredentialResolver::new(
            MessagingService::Facebook,
            Arc::new(FailingStore),
            Some("fallback".to_string()),
        );
        let err = resolver.resolve("PAGE").await.unwrap_err();
        assert!(matches!(err, MessengerError::Credential(_)));
    }
}
