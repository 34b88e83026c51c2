// src/favorites.rs
//! Favorites synchronizer: a server-authoritative symbol set with a
//! per-symbol debounced toggle. A rapid double-activation coalesces into a
//! single request for the opposite action instead of an add-then-remove
//! pair, and a superseded in-flight toggle has its stale outcome ignored.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::error::{ApiError, Result};
use crate::models::FavoriteStatus;

/// What an armed toggle will send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleIntent {
    Add,
    Remove,
}

impl ToggleIntent {
    pub fn opposite(self) -> Self {
        match self {
            ToggleIntent::Add => ToggleIntent::Remove,
            ToggleIntent::Remove => ToggleIntent::Add,
        }
    }

    pub fn status(self) -> FavoriteStatus {
        match self {
            ToggleIntent::Add => FavoriteStatus::Selected,
            ToggleIntent::Remove => FavoriteStatus::Unselected,
        }
    }
}

/// Per-symbol toggle state. `Idle` is the absence of an entry in the
/// pending map; an armed or in-flight gesture is one of the pending states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Idle,
    PendingAdd { armed_at: Instant },
    PendingRemove { armed_at: Instant },
}

impl ToggleState {
    pub fn pending(intent: ToggleIntent, armed_at: Instant) -> Self {
        match intent {
            ToggleIntent::Add => ToggleState::PendingAdd { armed_at },
            ToggleIntent::Remove => ToggleState::PendingRemove { armed_at },
        }
    }

    /// Transition on a user trigger. From `Idle` the intent follows cached
    /// membership; from a pending state the intent flips. Whether the
    /// previous send is cancelled (still inside the debounce window) or
    /// merely superseded (already on the wire) is the driver's call.
    pub fn on_trigger(self, is_favorite: bool, now: Instant) -> (ToggleState, ToggleIntent) {
        let intent = match self {
            ToggleState::Idle => {
                if is_favorite {
                    ToggleIntent::Remove
                } else {
                    ToggleIntent::Add
                }
            }
            ToggleState::PendingAdd { .. } => ToggleIntent::Remove,
            ToggleState::PendingRemove { .. } => ToggleIntent::Add,
        };
        (ToggleState::pending(intent, now), intent)
    }

    pub fn armed_at(&self) -> Option<Instant> {
        match self {
            ToggleState::Idle => None,
            ToggleState::PendingAdd { armed_at } | ToggleState::PendingRemove { armed_at } => {
                Some(*armed_at)
            }
        }
    }
}

struct PendingToggle {
    intent: ToggleIntent,
    generation: u64,
    armed_at: Instant,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct SyncState {
    favorites: HashSet<String>,
    pending: HashMap<String, PendingToggle>,
    next_generation: u64,
}

/// Cached projection of the server's favorite set plus the per-symbol
/// toggle machinery. The cache is only ever replaced wholesale with a fresh
/// server fetch; the client never invents favorite state.
#[derive(Clone)]
pub struct FavoritesSync {
    api: ApiClient,
    inner: Arc<Mutex<SyncState>>,
}

impl FavoritesSync {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            inner: Arc::new(Mutex::new(SyncState::default())),
        }
    }

    /// Seed the cache from the session store's persisted projection, for a
    /// warm start before the first server refresh.
    pub async fn prime_from_session(&self) {
        let persisted = self.api.session_store().favorites().await;
        let mut state = self.inner.lock().await;
        state.favorites = persisted.into_iter().collect();
    }

    pub async fn is_favorite(&self, symbol: &str) -> bool {
        let symbol = symbol.trim().to_uppercase();
        self.inner.lock().await.favorites.contains(&symbol)
    }

    /// Current cached set, sorted for stable display.
    pub async fn favorites(&self) -> Vec<String> {
        let state = self.inner.lock().await;
        let mut symbols: Vec<String> = state.favorites.iter().cloned().collect();
        symbols.sort();
        symbols
    }

    /// The intent currently armed or in flight for a symbol, if any.
    pub async fn pending_intent(&self, symbol: &str) -> Option<ToggleIntent> {
        let symbol = symbol.trim().to_uppercase();
        self.inner.lock().await.pending.get(&symbol).map(|p| p.intent)
    }

    /// One user gesture on the star for `symbol`. Arms the opposite of the
    /// cached membership (or of the pending intent, when triggered again
    /// within the debounce window); the request fires after the window
    /// elapses and is followed by a wholesale refresh from the server.
    pub async fn toggle(&self, symbol: &str) -> Result<()> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ApiError::Api("favorite toggle requires a symbol".into()));
        }

        let window = self.api.config().debounce_window;
        let now = Instant::now();
        let mut state = self.inner.lock().await;

        let current = match state.pending.get(&symbol) {
            None => ToggleState::Idle,
            Some(p) => ToggleState::pending(p.intent, p.armed_at),
        };
        let is_favorite = state.favorites.contains(&symbol);
        let (next, intent) = current.on_trigger(is_favorite, now);

        if let Some(previous) = state.pending.remove(&symbol) {
            let within_window = now.duration_since(previous.armed_at) <= window;
            if within_window {
                // send not fired yet: cancel it outright
                previous.task.abort();
                debug!("Coalesced double toggle on {} into {:?}", symbol, intent);
            }
            // outside the window the request is already on the wire; the
            // generation bump below makes its completion a no-op
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let task = tokio::spawn(run_toggle(
            self.api.clone(),
            self.inner.clone(),
            symbol.clone(),
            intent,
            generation,
            window,
        ));
        state.pending.insert(
            symbol,
            PendingToggle {
                intent,
                generation,
                armed_at: next.armed_at().unwrap_or(now),
                task,
            },
        );
        Ok(())
    }

    /// Fetch the authoritative list and replace the cache wholesale.
    pub async fn refresh(&self) -> Result<()> {
        let list = self.api.list_favorites().await?;
        self.apply_server_list(list).await;
        Ok(())
    }

    async fn apply_server_list(&self, list: Vec<String>) {
        {
            let mut state = self.inner.lock().await;
            state.favorites = list.iter().cloned().collect();
        }
        // keep the persisted projection in step; losing it only costs a
        // colder start next run
        if let Err(e) = self.api.session_store().set_favorites(list).await {
            error!("Failed to persist favorite projection: {}", e);
        }
    }
}

/// Debounce, send, refresh. Runs detached per gesture; a flipped or newer
/// gesture either aborts this task (pre-send) or invalidates its generation
/// (post-send), so a stale outcome is never applied.
async fn run_toggle(
    api: ApiClient,
    inner: Arc<Mutex<SyncState>>,
    symbol: String,
    intent: ToggleIntent,
    generation: u64,
    window: Duration,
) {
    tokio::time::sleep(window).await;
    {
        let state = inner.lock().await;
        if !is_current(&state, &symbol, generation) {
            return;
        }
    }

    if let Err(e) = api.set_favorite(&symbol, intent.status()).await {
        // cache stays at the last server-confirmed set; no retry
        error!("Favorite {:?} for {} failed: {}", intent, symbol, e);
    }

    // success or failure, the server is the authority: re-fetch and replace
    let refreshed = api.list_favorites().await;
    {
        let mut state = inner.lock().await;
        if !is_current(&state, &symbol, generation) {
            return; // superseded while in flight; ignore this outcome
        }
        state.pending.remove(&symbol);
        match &refreshed {
            Ok(list) => state.favorites = list.iter().cloned().collect(),
            Err(e) => error!("Favorite refresh for {} failed: {}", symbol, e),
        }
    }
    if let Ok(list) = refreshed {
        if let Err(e) = api.session_store().set_favorites(list).await {
            error!("Failed to persist favorite projection: {}", e);
        }
    }
}

fn is_current(state: &SyncState, symbol: &str, generation: u64) -> bool {
    state
        .pending
        .get(symbol)
        .map(|p| p.generation == generation)
        .unwrap_or(false)
}
