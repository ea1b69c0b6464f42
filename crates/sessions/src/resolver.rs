use std::sync::Arc;

use {async_trait::async_trait, dashmap::DashMap, tracing::debug};

use crate::{extension::SessionExtensionStore, model::Principal};

/// Looks up the principal behind a session id.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, session_id: &str) -> Option<Principal>;
}

/// Process-local session table.
///
/// Logging out drops the session's extension state along with the principal.
pub struct InMemorySessions {
    principals: DashMap<String, Principal>,
    extensions: Arc<SessionExtensionStore>,
}

impl InMemorySessions {
    pub fn new(extensions: Arc<SessionExtensionStore>) -> Self {
        Self {
            principals: DashMap::new(),
            extensions,
        }
    }

    pub fn login(&self, session_id: impl Into<String>, principal: Principal) {
        let session_id = session_id.into();
        debug!(session_id = %session_id, principal = %principal.id, "session login");
        self.principals.insert(session_id, principal);
    }

    pub fn logout(&self, session_id: &str) -> Option<Principal> {
        self.extensions.remove(session_id);
        let removed = self.principals.remove(session_id).map(|(_, p)| p);
        if removed.is_some() {
            debug!(session_id, "session logout");
        }
        removed
    }

    pub fn extensions(&self) -> &Arc<SessionExtensionStore> {
        &self.extensions
    }
}

impl Default for InMemorySessions {
    fn default() -> Self {
        Self::new(Arc::new(SessionExtensionStore::new()))
    }
}

#[async_trait]
impl SessionResolver for InMemorySessions {
    async fn resolve(&self, session_id: &str) -> Option<Principal> {
        self.principals
            .get(session_id)
            .map(|p| p.clone())
            .filter(Principal::is_authenticated)
    }
}
