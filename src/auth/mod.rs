//! Session context and bearer-token resolution.
//!
//! [`AuthContext`] is the explicit replacement for a process-wide auth
//! singleton: it is built at startup from a [`KeyValueStore`] and a
//! [`CookieJar`], handed to whatever opens subscriptions, and owns the
//! load/save lifecycle of the persisted [`Session`].
//!
//! Token lookup order:
//!
//! 1. the structured session entry (`auth-storage`)
//! 2. the flat `auth_token` entry in the same storage
//! 3. the `auth_token` cookie

pub mod cookie;
pub mod session;
pub mod storage;

pub use cookie::CookieJar;
pub use session::{PersistedSession, Role, Session, User};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Storage key of the structured session entry.
pub const SESSION_STORAGE_KEY: &str = "auth-storage";
/// Storage key of the flat token fallback.
pub const TOKEN_STORAGE_KEY: &str = "auth_token";
/// Cookie consulted last.
pub const TOKEN_COOKIE_NAME: &str = "auth_token";

/// Errors resolving or persisting credentials. Never retried.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no authentication token found; run `easydeploy session set-token` or log in")]
    MissingToken,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Session,
    StorageKey,
    Cookie,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenSource::Session => "session",
            TokenSource::StorageKey => "storage",
            TokenSource::Cookie => "cookie",
        };
        f.write_str(s)
    }
}

/// A bearer token and its origin.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: String,
    pub source: TokenSource,
}

// Keep tokens out of logs.
impl fmt::Debug for ResolvedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedToken")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Credentials context shared by subscriptions.
#[derive(Clone)]
pub struct AuthContext {
    storage: Arc<dyn KeyValueStore>,
    cookies: CookieJar,
}

impl AuthContext {
    pub fn new(storage: Arc<dyn KeyValueStore>, cookies: CookieJar) -> Self {
        Self { storage, cookies }
    }

    /// Context with empty in-memory storage and no cookies.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), CookieJar::new())
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Read the persisted session. A missing entry is `None`; an unreadable
    /// entry is logged and treated as missing.
    pub fn load_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(raw) = self.storage.get(SESSION_STORAGE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<PersistedSession>(&raw) {
            Ok(persisted) => Ok(Some(persisted.state)),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable persisted session");
                Ok(None)
            }
        }
    }

    /// Persist the session in the structured store.
    pub fn save_session(&self, session: &Session) -> Result<(), AuthError> {
        let persisted = PersistedSession {
            state: session.clone(),
            version: 0,
        };
        let json = serde_json::to_string(&persisted)?;
        self.storage.set(SESSION_STORAGE_KEY, &json)?;
        tracing::debug!(
            authenticated = session.is_authenticated,
            "Persisted session"
        );
        Ok(())
    }

    /// Drop the structured session and the flat token.
    pub fn clear_session(&self) -> Result<(), AuthError> {
        self.storage.remove(SESSION_STORAGE_KEY)?;
        self.storage.remove(TOKEN_STORAGE_KEY)?;
        Ok(())
    }

    /// Resolve the bearer token, checking each source in order.
    ///
    /// Storage read failures are logged and the next source is tried; only
    /// when every source comes up empty is [`AuthError::MissingToken`] returned.
    pub fn resolve_token(&self) -> Result<ResolvedToken, AuthError> {
        match self.load_session() {
            Ok(Some(session)) => {
                if let Some(token) = session.usable_token() {
                    return Ok(ResolvedToken {
                        token: token.to_string(),
                        source: TokenSource::Session,
                    });
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Session store unavailable"),
        }

        match self.storage.get(TOKEN_STORAGE_KEY) {
            Ok(Some(token)) if !token.trim().is_empty() => {
                return Ok(ResolvedToken {
                    token,
                    source: TokenSource::StorageKey,
                });
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Token storage unavailable"),
        }

        if let Some(token) = self.cookies.get(TOKEN_COOKIE_NAME) {
            if !token.trim().is_empty() {
                return Ok(ResolvedToken {
                    token: token.to_string(),
                    source: TokenSource::Cookie,
                });
            }
        }

        Err(AuthError::MissingToken)
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext").finish_non_exhaustive()
    }
}
