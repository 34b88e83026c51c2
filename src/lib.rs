// src/lib.rs
pub mod api;
pub mod chart;
pub mod config;
pub mod error;
pub mod favorites;
pub mod models;
pub mod notifications;
pub mod session;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use favorites::FavoritesSync;
pub use notifications::NotificationFeed;
pub use session::SessionStore;
