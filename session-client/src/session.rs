use std::sync::Arc;

use tokio::sync::watch;

use crate::error::SessionError;
use crate::token_store::TokenStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Refreshing,
}

/// Owns the in-memory access token and the observable session state.
///
/// The refresh token lives in the [`TokenStore`]. Presentation code calls
/// [`SessionManager::subscribe`] and returns to the login screen when the
/// state drops to `Unauthenticated`.
pub struct SessionManager {
    access_token: watch::Sender<Option<String>>,
    state: watch::Sender<SessionState>,
    store: Arc<dyn TokenStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            access_token: watch::Sender::new(None),
            state: watch::Sender::new(SessionState::Unauthenticated),
            store,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.borrow().is_some()
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, SessionError> {
        self.store.load().await
    }

    /// Stores a freshly issued token pair.
    pub async fn establish(&self, access_token: String, refresh_token: &str) -> Result<(), SessionError> {
        self.store.save(refresh_token).await?;
        self.access_token.send_replace(Some(access_token));
        self.state.send_replace(SessionState::Authenticated);
        Ok(())
    }

    pub(crate) fn begin_refresh(&self) {
        self.state.send_replace(SessionState::Refreshing);
    }

    pub(crate) fn refreshed(&self, access_token: String) {
        self.access_token.send_replace(Some(access_token));
        self.state.send_replace(SessionState::Authenticated);
    }

    /// Drops both tokens. Storage failures are logged, the in-memory state is cleared regardless.
    pub async fn clear(&self) {
        self.access_token.send_replace(None);
        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, "Failed to clear stored refresh token");
        }
        self.state.send_replace(SessionState::Unauthenticated);
    }
}
