//! Session context: the credential and theme, threaded explicitly.
//!
//! Constructed once at session start and passed to everything that talks to
//! the backend; there is no ambient global. The raw token is persisted to
//! the injected store on every change so a reload picks up where it left off.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::store::{KvStore, API_TOKEN_KEY, THEME_KEY};

/// How the credential is sent. Structured tokens (anything containing a `.`,
/// i.e. a JWT) go in the `Authorization: Bearer` header; opaque keys use
/// `X-API-Key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
    ApiKey(String),
}

impl Credential {
    pub fn from_token(token: &str) -> Self {
        if token.contains('.') {
            Credential::Bearer(token.to_string())
        } else {
            Credential::ApiKey(token.to_string())
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Credential::Bearer(t) | Credential::ApiKey(t) => t,
        }
    }
}

/// Per-session request context.
pub struct Session {
    store: Arc<dyn KvStore>,
    credential: RwLock<Option<Credential>>,
}

impl Session {
    /// Build a session, restoring any persisted credential.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        let credential = store
            .get(API_TOKEN_KEY)
            .filter(|t| !t.is_empty())
            .map(|t| Credential::from_token(&t));
        Self {
            store,
            credential: RwLock::new(credential),
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.credential.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.read().is_some()
    }

    /// Install a new credential and persist the raw token.
    pub fn set_token(&self, token: &str) {
        let cred = Credential::from_token(token);
        log::debug!(
            "session credential set ({})",
            match cred {
                Credential::Bearer(_) => "bearer",
                Credential::ApiKey(_) => "api-key",
            }
        );
        *self.credential.write() = Some(cred);
        self.store.set(API_TOKEN_KEY, token);
    }

    /// Drop the credential and clear it from durable storage.
    pub fn clear_token(&self) {
        *self.credential.write() = None;
        self.store.remove(API_TOKEN_KEY);
    }

    pub fn theme(&self) -> Option<String> {
        self.store.get(THEME_KEY)
    }

    pub fn set_theme(&self, theme: &str) {
        self.store.set(THEME_KEY, theme);
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_credential_scheme_heuristic() {
        assert_eq!(
            Credential::from_token("eyJhbGciOi.payload.sig"),
            Credential::Bearer("eyJhbGciOi.payload.sig".to_string())
        );
        assert_eq!(
            Credential::from_token("opaquekey123"),
            Credential::ApiKey("opaquekey123".to_string())
        );
    }

    #[test]
    fn test_token_persisted_and_restored() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        {
            let session = Session::new(store.clone());
            assert!(!session.is_authenticated());
            session.set_token("a.b.c");
        }
        let restored = Session::new(store.clone());
        assert_eq!(
            restored.credential(),
            Some(Credential::Bearer("a.b.c".to_string()))
        );

        restored.clear_token();
        assert!(store.get(API_TOKEN_KEY).is_none());
        assert!(Session::new(store).credential().is_none());
    }
}
