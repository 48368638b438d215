//! Error types for Butterbot
//!
//! This module defines the error taxonomy used across the daemon,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Butterbot operations
///
/// Transport, configuration and delivery failures are kept as distinct
/// variants so the monitor can decide which of them may drive a state
/// transition. None of them is fatal once the daemon is running. Payload
/// decoding failures stay in [`crate::checks::DecodeError`]: a record that
/// does not decode simply matches no rule.
#[derive(Error, Debug)]
pub enum ButterbotError {
    /// Configuration errors (loading, validation, unsupported verbs or kinds)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network or broker connection failures
    #[error("Transport error: {0}")]
    Transport(String),

    /// Webhook POST could not be sent
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Reading the configuration file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid YAML for the config model
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ButterbotError {
    /// Whether this error came from the network or broker layer
    pub fn is_transport(&self) -> bool {
        matches!(self, ButterbotError::Transport(_) | ButterbotError::Http(_))
    }
}

/// Result type alias for Butterbot operations
///
/// Uses `anyhow::Error` so callers can attach context while propagating.
pub type Result<T> = anyhow::Result<T>;
