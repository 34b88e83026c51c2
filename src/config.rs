// src/config.rs
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_NOTIFICATION_LIMIT: u32 = 10;
const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_STATE_FILE: &str = ".finstocks_session.json";

/// Client-wide knobs. `default()` reads the environment so the binary can
/// run unconfigured against a local server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Fixed notification poll cadence for the lifetime of a feed.
    pub poll_interval: Duration,
    /// Page size for the notifications endpoint.
    pub notification_limit: u32,
    /// Window inside which a second favorite-toggle trigger coalesces with
    /// the first instead of issuing a second request.
    pub debounce_window: Duration,
    /// Hard per-request deadline so a hung server cannot pin `loading`
    /// forever.
    pub request_timeout: Duration,
    /// Where the session store persists tokens and cached favorites.
    pub state_file: PathBuf,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_notification_limit(mut self, limit: u32) -> Self {
        self.notification_limit = limit.max(1);
        self
    }

    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = path.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let base_url =
            std::env::var("FINSTOCKS_API_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let state_file = std::env::var("FINSTOCKS_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATE_FILE));
        Self {
            base_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
            notification_limit: DEFAULT_NOTIFICATION_LIMIT,
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            state_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = ClientConfig::new("http://example.test")
            .with_poll_interval(Duration::from_secs(5))
            .with_notification_limit(0)
            .with_debounce_window(Duration::from_millis(150));
        assert_eq!(cfg.base_url, "http://example.test");
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        // limit is clamped to at least one row
        assert_eq!(cfg.notification_limit, 1);
        assert_eq!(cfg.debounce_window, Duration::from_millis(150));
    }
}
