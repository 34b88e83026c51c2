// src/notifications.rs
//! Notification feed: a shared cache of the most recent page plus the
//! unread counter, refreshed by a cancellable periodic poll and mutated
//! in place by mark-as-read.

use std::sync::Arc;

use log::{error, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::error::{ApiError, Result};
use crate::models::{Notification, NotificationPage};

/// Local projection of the server's notification state. Mutated only under
/// its lock, always against the latest fetched list.
#[derive(Debug, Default)]
pub struct NotificationCache {
    notifications: Vec<Notification>,
    unread_count: u32,
}

impl NotificationCache {
    /// Replace the cached page with a fresh fetch.
    pub fn apply_page(&mut self, page: NotificationPage) {
        self.notifications = page.notifications;
        self.unread_count = page.unread_count;
    }

    /// Flip `is_read` for the matching entry and decrement the unread
    /// counter, floored at zero. No-op when the id is absent or the entry
    /// is already read; returns whether anything changed.
    pub fn mark_read(&mut self, id: i64) -> bool {
        match self.notifications.iter_mut().find(|n| n.id == id) {
            Some(entry) if !entry.is_read => {
                entry.is_read = true;
                self.unread_count = self.unread_count.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> u32 {
        self.unread_count
    }
}

/// View-lifetime notification feed. `start` fetches immediately and then on
/// the configured fixed interval; `stop` (or drop) cancels the schedule.
pub struct NotificationFeed {
    api: ApiClient,
    cache: Arc<Mutex<NotificationCache>>,
    poller: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl NotificationFeed {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            cache: Arc::new(Mutex::new(NotificationCache::default())),
            poller: std::sync::Mutex::new(None),
        }
    }

    /// Begin polling. Restarting replaces any previous schedule.
    pub fn start(&self) {
        let api = self.api.clone();
        let cache = self.cache.clone();
        let limit = api.config().notification_limit;
        let interval = api.config().poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                // first tick completes immediately: fetch on mount
                ticker.tick().await;
                match api.notifications(limit, false).await {
                    Ok(page) => cache.lock().await.apply_page(page),
                    Err(ApiError::NotAuthenticated) => {
                        // signed out: nothing to poll until the next login
                        warn!("Notification poll skipped: no session");
                        break;
                    }
                    // cache keeps its previous page on any other failure
                    Err(e) => error!("Notification poll failed: {}", e),
                }
            }
        });

        if let Some(previous) = self.install(Some(handle)) {
            previous.abort();
        }
    }

    /// Cancel the polling schedule (view teardown).
    pub fn stop(&self) {
        if let Some(handle) = self.install(None) {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    fn install(&self, handle: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut guard = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, handle)
    }

    /// One manual fetch outside the schedule.
    pub async fn refresh(&self) -> Result<()> {
        let limit = self.api.config().notification_limit;
        let page = self.api.notifications(limit, false).await?;
        self.cache.lock().await.apply_page(page);
        Ok(())
    }

    /// Mark one notification read on the server, then reflect it locally
    /// without waiting for the next poll. The cache is locked *after* the
    /// request completes, so the flip lands on whatever list the latest
    /// poll produced, never on a pre-request snapshot.
    pub async fn mark_as_read(&self, id: i64) -> Result<()> {
        self.api.mark_notification_read(id).await?;
        self.cache.lock().await.mark_read(id);
        Ok(())
    }

    pub async fn snapshot(&self) -> (Vec<Notification>, u32) {
        let cache = self.cache.lock().await;
        (cache.notifications().to_vec(), cache.unread_count())
    }
}

impl Drop for NotificationFeed {
    fn drop(&mut self) {
        self.stop();
    }
}
