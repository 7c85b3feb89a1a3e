//! Error types for the cooldown policy engine.
//!
//! Nothing in this crate is allowed to take the host process down: every
//! failure either degrades to pass-through or rejects a single request, so
//! these variants exist for logging and for callers deciding which
//! degradation path to take.

use thiserror::Error;

/// Main error type for the cooldown policy engine.
#[derive(Debug, Error)]
pub enum CooldownError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using [`CooldownError`].
pub type Result<T> = std::result::Result<T, CooldownError>;
