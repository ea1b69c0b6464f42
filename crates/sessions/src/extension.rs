//! Transient per-session state owned by the dispatch layer.

use dashmap::DashMap;

use crate::model::WebSessionState;

/// Everything the gateway hangs off a session id.
#[derive(Debug, Clone, Default)]
pub struct SessionExtension {
    pub web: Option<WebSessionState>,
}

/// Session id → extension. Entries live until the session is logged out.
#[derive(Debug, Default)]
pub struct SessionExtensionStore {
    entries: DashMap<String, SessionExtension>,
}

impl SessionExtensionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the web-channel state for `session_id`.
    pub fn attach_web(&self, session_id: &str, state: WebSessionState) {
        self.entries.entry(session_id.to_string()).or_default().web = Some(state);
    }

    pub fn web(&self, session_id: &str) -> Option<WebSessionState> {
        self.entries.get(session_id).and_then(|e| e.web.clone())
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionExtension> {
        self.entries.remove(session_id).map(|(_, ext)| ext)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use {
        super::*,
        crate::model::{ChatProfile, Principal, ProfileSeed},
    };

    fn state(id: &str) -> WebSessionState {
        let principal = Principal::new(id, "Op", "Erator");
        WebSessionState::socket(ChatProfile::new(id, ProfileSeed::from(&principal)))
    }

    #[test]
    fn attach_replaces_previous_state() {
        let store = SessionExtensionStore::new();
        store.attach_web("s1", state("u-1"));
        store.attach_web("s1", state("u-2"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.web("s1").unwrap().profile.id, "u-2");
    }

    #[test]
    fn remove_clears_session() {
        let store = SessionExtensionStore::new();
        store.attach_web("s1", state("u-1"));
        assert!(store.remove("s1").unwrap().web.is_some());
        assert!(store.web("s1").is_none());
        assert!(store.is_empty());
    }
}
