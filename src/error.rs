// src/error.rs
use reqwest::StatusCode;
use thiserror::Error;

/// Failure taxonomy for one request attempt. Every variant is terminal for
/// that attempt; no retry is scheduled anywhere in the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect refused, timeout, DNS).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-2xx status; carries any server-supplied
    /// message body.
    #[error("http status {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// Body arrived but did not decode into the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// No token in the session store. Authenticated calls short-circuit on
    /// this before touching the network; callers treat it as a redirect to
    /// the sign-in flow.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Session state file could not be read or written.
    #[error("session state I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server-reported application error ("message" in a 2xx body).
    #[error("api error: {0}")]
    Api(String),
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;
