//! Session lifecycle
//!
//! Owns the bearer token and the identity record. The two only ever exist
//! together: a partial pair (on disk or in memory) is treated as
//! unauthenticated and cleared. Everything else in the data layer observes
//! the session through [`SessionState`] and never mutates it directly.

use crate::api::IdentityApi;
use serde::{Deserialize, Serialize};
use shared::models::UserInfo;
use shared::request::{LoginRequest, RegisterRequest};
use shared::{ClientError, ClientResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;

/// An authenticated session: token and identity always travel together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub identity: UserInfo,
}

// =============================================================================
// Durable storage
// =============================================================================

/// The two durable string slots: the bearer token and the serialized
/// identity record. They are stored and cleared together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSlots {
    pub token: String,
    pub identity: String,
}

/// Durable storage for the session pair
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> std::io::Result<Option<PersistedSlots>>;
    fn store(&self, slots: &PersistedSlots) -> std::io::Result<()>;
    fn clear(&self) -> std::io::Result<()>;
}

/// File-backed storage: one JSON document holding both slots, so they are
/// written and removed as a unit
pub struct FileSessionStorage {
    file_path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            file_path: data_dir.join("session.json"),
        }
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> std::io::Result<Option<PersistedSlots>> {
        if !self.file_path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.file_path)?;
        match serde_json::from_str(&content) {
            Ok(slots) => Ok(Some(slots)),
            Err(err) => {
                tracing::warn!(error = %err, "discarding corrupt session file");
                Ok(None)
            }
        }
    }

    fn store(&self, slots: &PersistedSlots) -> std::io::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(slots)?;
        std::fs::write(&self.file_path, content)
    }

    fn clear(&self) -> std::io::Result<()> {
        if self.file_path.exists() {
            std::fs::remove_file(&self.file_path)?;
        }
        Ok(())
    }
}

/// In-memory storage for tests and ephemeral processes
#[derive(Default)]
pub struct MemorySessionStorage {
    slots: Mutex<Option<PersistedSlots>>,
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> std::io::Result<Option<PersistedSlots>> {
        Ok(self.slots.lock().unwrap().clone())
    }

    fn store(&self, slots: &PersistedSlots) -> std::io::Result<()> {
        *self.slots.lock().unwrap() = Some(slots.clone());
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        *self.slots.lock().unwrap() = None;
        Ok(())
    }
}

// =============================================================================
// Shared session state
// =============================================================================

/// Process-wide session state. The transport reads the token from here and
/// tears the session down on an authorization-denied response; the store
/// establishes and clears it. No other component mutates it.
pub struct SessionState {
    storage: Arc<dyn SessionStorage>,
    current: Mutex<Option<Session>>,
    auth_tx: watch::Sender<bool>,
}

impl SessionState {
    /// Load from durable storage. A missing, partial or corrupt pair
    /// starts the process anonymous and wipes both slots.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let current = match storage.load() {
            Ok(Some(slots)) if !slots.token.is_empty() => {
                match serde_json::from_str::<UserInfo>(&slots.identity) {
                    Ok(identity) => {
                        tracing::info!(username = %identity.username, "restored persisted session");
                        Some(Session {
                            token: slots.token,
                            identity,
                        })
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "persisted identity unreadable, clearing session");
                        let _ = storage.clear();
                        None
                    }
                }
            }
            Ok(Some(_)) => {
                // token slot empty while identity present
                let _ = storage.clear();
                None
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "session storage unreadable");
                None
            }
        };

        let (auth_tx, _) = watch::channel(current.is_some());
        Self {
            storage,
            current: Mutex::new(current),
            auth_tx,
        }
    }

    /// Pure read of the current session; never performs I/O
    pub fn current(&self) -> Option<Session> {
        self.current.lock().unwrap().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    /// Authenticated/anonymous signal for the rest of the application
    pub fn watch_authenticated(&self) -> watch::Receiver<bool> {
        self.auth_tx.subscribe()
    }

    /// Persist and activate a session
    pub(crate) fn establish(&self, session: Session) {
        let slots = PersistedSlots {
            token: session.token.clone(),
            identity: serde_json::to_string(&session.identity)
                .unwrap_or_else(|_| String::new()),
        };
        if let Err(err) = self.storage.store(&slots) {
            tracing::warn!(error = %err, "failed to persist session");
        }
        *self.current.lock().unwrap() = Some(session);
        let _ = self.auth_tx.send(true);
    }

    /// Synchronous, idempotent teardown. Storage failures are logged and
    /// swallowed so logout never fails.
    pub(crate) fn clear(&self) {
        let was_authenticated = self.current.lock().unwrap().take().is_some();
        if let Err(err) = self.storage.clear() {
            tracing::warn!(error = %err, "failed to clear persisted session");
        }
        if was_authenticated {
            tracing::info!("session cleared");
        }
        let _ = self.auth_tx.send(false);
    }
}

// =============================================================================
// Session store
// =============================================================================

/// Registration outcome when the account itself could not be created, or
/// was created but the follow-up login failed. The caller can tell the two
/// apart: `SessionNotEstablished` still carries the new identity.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegisterError {
    #[error(transparent)]
    Rejected(ClientError),

    #[error("registered but session not established: {cause}")]
    SessionNotEstablished {
        identity: UserInfo,
        cause: ClientError,
    },
}

/// Login, registration and logout against the identity service
pub struct SessionStore {
    state: Arc<SessionState>,
    identity: Arc<dyn IdentityApi>,
}

impl SessionStore {
    pub fn new(state: Arc<SessionState>, identity: Arc<dyn IdentityApi>) -> Self {
        Self { state, identity }
    }

    /// Exchange credentials for a session and persist it
    pub async fn login(&self, identifier: &str, password: &str) -> ClientResult<UserInfo> {
        let request = LoginRequest {
            identifier: identifier.to_string(),
            password: password.to_string(),
        };
        let login = self.identity.login(&request).await?;
        let session = Session {
            token: login.token,
            identity: login.user,
        };
        self.state.establish(session.clone());
        tracing::info!(username = %session.identity.username, "session established");
        Ok(session.identity)
    }

    /// Create an account, then log in with the supplied credentials
    pub async fn register(&self, profile: RegisterRequest) -> Result<UserInfo, RegisterError> {
        let identity = self
            .identity
            .register(&profile)
            .await
            .map_err(RegisterError::Rejected)?;

        match self
            .login(profile.login_identifier(), &profile.password)
            .await
        {
            Ok(user) => Ok(user),
            Err(cause) => {
                tracing::warn!(username = %identity.username, error = %cause,
                    "registration succeeded but implicit login failed");
                Err(RegisterError::SessionNotEstablished { identity, cause })
            }
        }
    }

    /// Clear the persisted pair; idempotent, never fails
    pub fn logout(&self) {
        self.state.clear();
    }

    /// Pure read of the in-memory session
    pub fn current_session(&self) -> Option<Session> {
        self.state.current()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn watch_authenticated(&self) -> watch::Receiver<bool> {
        self.state.watch_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Role;

    fn alice() -> UserInfo {
        UserInfo {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            first_name: "Alice".into(),
            last_name: "A".into(),
            role: Role::User,
        }
    }

    #[test]
    fn establish_then_clear_keeps_pairing() {
        let state = SessionState::new(Arc::new(MemorySessionStorage::default()));
        assert!(state.current().is_none());
        assert!(state.token().is_none());

        state.establish(Session {
            token: "abc".into(),
            identity: alice(),
        });
        let session = state.current().unwrap();
        assert_eq!(session.token, "abc");
        assert_eq!(session.identity.id, 1);

        state.clear();
        assert!(state.current().is_none());
        assert!(state.token().is_none());
        // idempotent
        state.clear();
        assert!(state.current().is_none());
    }

    #[test]
    fn partial_pair_loads_as_anonymous() {
        let storage = Arc::new(MemorySessionStorage::default());
        storage
            .store(&PersistedSlots {
                token: "abc".into(),
                identity: "not json".into(),
            })
            .unwrap();

        let state = SessionState::new(storage.clone());
        assert!(state.current().is_none());
        // both slots wiped
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn empty_token_slot_loads_as_anonymous() {
        let storage = Arc::new(MemorySessionStorage::default());
        storage
            .store(&PersistedSlots {
                token: String::new(),
                identity: serde_json::to_string(&alice()).unwrap(),
            })
            .unwrap();

        let state = SessionState::new(storage.clone());
        assert!(state.current().is_none());
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn watch_signal_tracks_session() {
        let state = SessionState::new(Arc::new(MemorySessionStorage::default()));
        let rx = state.watch_authenticated();
        assert!(!*rx.borrow());

        state.establish(Session {
            token: "abc".into(),
            identity: alice(),
        });
        assert!(*rx.borrow());

        state.clear();
        assert!(!*rx.borrow());
    }

    #[test]
    fn file_storage_round_trips_and_survives_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(FileSessionStorage::new(dir.path()));

        let state = SessionState::new(storage.clone());
        state.establish(Session {
            token: "abc".into(),
            identity: alice(),
        });
        drop(state);

        // new process, same directory
        let restored = SessionState::new(storage);
        let session = restored.current().unwrap();
        assert_eq!(session.token, "abc");
        assert_eq!(session.identity.username, "alice");
    }
}
