//! The live application session.

use std::sync::Arc;

use tokio::sync::watch;

use crate::types::SessionToken;

/// Holds the current session. Only the sign-in flow writes it; anyone can
/// read or subscribe.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Option<SessionToken>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<SessionToken> {
        self.tx.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Receive every session change from now on.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionToken>> {
        self.tx.subscribe()
    }

    pub(crate) fn set(&self, session: SessionToken) {
        self.tx.send_replace(Some(session));
    }

    pub(crate) fn clear(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserProfile;

    fn session(token: &str) -> SessionToken {
        SessionToken {
            access_token: token.to_string(),
            token_type: "bearer".to_string(),
            user: UserProfile::default(),
        }
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        assert!(!store.is_signed_in());

        store.set(session("a"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().access_token, "a");
        assert_eq!(store.current().unwrap().access_token, "a");

        store.clear();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::new();
        let reader = store.clone();
        store.set(session("shared"));
        assert!(reader.is_signed_in());
    }
}
