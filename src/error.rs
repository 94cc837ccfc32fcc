//! Error types and handling for the meter poller
//!
//! Three variants matter to the host: `Auth` (re-login needed), `Protocol`
//! (the endpoint answered with something unusable) and `Transport` (the
//! request never completed). The remaining variants cover local concerns
//! such as configuration files and persisted state.

use thiserror::Error;

/// Result type alias for meter operations
pub type Result<T> = std::result::Result<T, MeterError>;

/// Main error type for the meter poller
#[derive(Debug, Error)]
pub enum MeterError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Bad credentials, expired session or an unauthenticated GraphQL response
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Malformed body, unexpected response shape or non-auth GraphQL errors
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Network failures and timeouts
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Persisted accumulator state could not be read or written
    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

impl MeterError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new persistence error
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// The session must be rebuilt before the next authenticated call
    pub const fn is_reauth_required(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Failures the host may retry on its next scheduled refresh
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Auth { .. } | Self::Protocol { .. } | Self::Transport { .. }
        )
    }
}

impl From<std::io::Error> for MeterError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for MeterError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for MeterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for MeterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::transport(format!("request timed out: {err}"))
        } else {
            Self::transport(err.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for MeterError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::transport("refresh timed out")
    }
}
