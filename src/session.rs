// src/session.rs
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{ChatSession, Session};

/// On-disk session state. Field names match the storage keys the dashboard
/// keeps across reloads: tokens, username, the cached favorite projection,
/// and locally kept chat transcripts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    favorite_stocks: Vec<String>,
    #[serde(default)]
    chat_sessions: Vec<ChatSession>,
}

/// Explicit session context object. Created empty or loaded from the state
/// file, populated on login/register, destroyed on logout. Every API-calling
/// component reads the token from here instead of any ambient global.
#[derive(Clone)]
pub struct SessionStore {
    path: PathBuf,
    state: Arc<Mutex<PersistedState>>,
}

impl SessionStore {
    /// Open the store, loading any state persisted by a previous run. A
    /// missing or unreadable file starts a clean (signed-out) store.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<PersistedState>(&bytes) {
                Ok(state) => {
                    debug!("Loaded session state from {}", path.display());
                    state
                }
                Err(e) => {
                    debug!("Ignoring malformed session state file: {}", e);
                    PersistedState::default()
                }
            },
            Err(_) => PersistedState::default(),
        };
        Self {
            path,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn session(&self) -> Option<Session> {
        let state = self.state.lock().await;
        let access_token = state.access_token.clone()?;
        Some(Session {
            access_token,
            refresh_token: state.refresh_token.clone(),
            username: state.username.clone().unwrap_or_default(),
        })
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state.lock().await.access_token.clone()
    }

    pub async fn username(&self) -> Option<String> {
        self.state.lock().await.username.clone()
    }

    /// Install a fresh session after a successful login and persist it.
    pub async fn set_session(&self, session: Session) -> Result<()> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.access_token = Some(session.access_token);
            state.refresh_token = session.refresh_token;
            state.username = Some(session.username);
            state.clone()
        };
        self.persist(&snapshot).await
    }

    pub async fn favorites(&self) -> Vec<String> {
        self.state.lock().await.favorite_stocks.clone()
    }

    /// Replace the persisted favorite projection wholesale.
    pub async fn set_favorites(&self, symbols: Vec<String>) -> Result<()> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.favorite_stocks = symbols;
            state.clone()
        };
        self.persist(&snapshot).await
    }

    pub async fn chat_sessions(&self) -> Vec<ChatSession> {
        self.state.lock().await.chat_sessions.clone()
    }

    /// Append or replace a chat transcript by id and persist.
    pub async fn save_chat_session(&self, session: ChatSession) -> Result<()> {
        let snapshot = {
            let mut state = self.state.lock().await;
            match state.chat_sessions.iter_mut().find(|s| s.id == session.id) {
                Some(existing) => *existing = session,
                None => state.chat_sessions.push(session),
            }
            state.clone()
        };
        self.persist(&snapshot).await
    }

    /// Logout: drop every piece of persisted state and remove the file.
    pub async fn clear(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            *state = PersistedState::default();
        }
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => info!("Cleared session state at {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn persist(&self, state: &PersistedState) -> Result<()> {
        let json = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_round_trips_through_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = SessionStore::open(&path).await;
        assert!(store.session().await.is_none());

        store
            .set_session(Session {
                access_token: "tok-123".into(),
                refresh_token: Some("ref-456".into()),
                username: "radha".into(),
            })
            .await
            .unwrap();
        store
            .set_favorites(vec!["AAPL".into(), "MSFT".into()])
            .await
            .unwrap();

        // A second store opened on the same path sees the persisted state,
        // like a page reload picking up browser storage.
        let reloaded = SessionStore::open(&path).await;
        let session = reloaded.session().await.unwrap();
        assert_eq!(session.access_token, "tok-123");
        assert_eq!(session.username, "radha");
        assert_eq!(reloaded.favorites().await, vec!["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn clear_destroys_session_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = SessionStore::open(&path).await;
        store
            .set_session(Session {
                access_token: "tok".into(),
                refresh_token: None,
                username: "u".into(),
            })
            .await
            .unwrap();
        store.clear().await.unwrap();

        assert!(store.access_token().await.is_none());
        assert!(!path.exists());
        // reload confirms nothing survived
        let reloaded = SessionStore::open(&path).await;
        assert!(reloaded.session().await.is_none());
    }

    #[tokio::test]
    async fn malformed_state_file_starts_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = SessionStore::open(&path).await;
        assert!(store.session().await.is_none());
        assert!(store.favorites().await.is_empty());
    }

    #[tokio::test]
    async fn chat_sessions_update_in_place_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("state.json")).await;

        store
            .save_chat_session(ChatSession {
                id: 1,
                title: "first".into(),
                messages: vec![],
            })
            .await
            .unwrap();
        store
            .save_chat_session(ChatSession {
                id: 1,
                title: "renamed".into(),
                messages: vec![],
            })
            .await
            .unwrap();

        let sessions = store.chat_sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title, "renamed");
    }
}
