//! Credentials and user identity.
//!
//! The client never reads ambient global state for its bearer token: a
//! [`Credentials`] capability is handed to the HTTP source instead, and the
//! user identity used for store scoping is resolved once through `/api/me`.

use std::sync::RwLock;

use crate::api::ContentSource;

/// Bearer credential capability injected into the content source
pub trait Credentials: Send + Sync {
    /// Current token, if any
    fn credential(&self) -> Option<String>;

    /// Called when the backend rejects the credential with 401
    fn on_unauthorized(&self);
}

/// In-process session holding the bearer token
#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<String>>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.trim().is_empty())),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = Some(token.into()),
            Err(_) => tracing::error!("Session lock poisoned; token not stored"),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential().is_some()
    }
}

impl Credentials for Session {
    fn credential(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn on_unauthorized(&self) {
        if let Ok(mut guard) = self.token.write() {
            if guard.take().is_some() {
                tracing::warn!("Credential rejected by backend; session cleared");
            }
        }
    }
}

/// Whose progress is being read and written
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserIdentity {
    User(String),
    Guest,
}

impl UserIdentity {
    pub fn is_guest(&self) -> bool {
        matches!(self, UserIdentity::Guest)
    }
}

/// Ask the backend who we are; any failure means guest
pub async fn resolve_identity(source: &dyn ContentSource) -> UserIdentity {
    match source.fetch_me().await {
        Ok(me) => UserIdentity::User(me.id),
        Err(e) => {
            tracing::warn!("Could not resolve user, using guest progress: {}", e);
            UserIdentity::Guest
        }
    }
}
