//! Unified error types for Webcheck

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Webcheck
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine launch failure (unsupported variant or process/connect failure)
    #[error("Engine launch failed: {0}")]
    EngineLaunch(String),

    /// Session used before a successful initialize or after close
    #[error("Session not initialized: {0}")]
    NotInitialized(String),

    /// Selector not satisfied within the configured timeout
    #[error("Element '{selector}' not visible within {timeout_ms}ms")]
    ElementTimeout { selector: String, timeout_ms: u64 },

    /// Fixture file missing or malformed
    #[error("Test data load failed: {0}")]
    DataLoad(String),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Engine protocol errors
    #[error("Engine protocol error: {0}")]
    Engine(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Navigation failed
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Script execution failed
    #[error("Script execution failed: {0}")]
    Script(String),

    /// Report sink failure
    #[error("Report error: {0}")]
    Report(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new engine launch error
    pub fn engine_launch<S: Into<String>>(msg: S) -> Self {
        Error::EngineLaunch(msg.into())
    }

    /// Create a new not-initialized error
    pub fn not_initialized<S: Into<String>>(msg: S) -> Self {
        Error::NotInitialized(msg.into())
    }

    /// Create a new element timeout error
    pub fn element_timeout<S: Into<String>>(selector: S, timeout_ms: u64) -> Self {
        Error::ElementTimeout {
            selector: selector.into(),
            timeout_ms,
        }
    }

    /// Create a new data load error
    pub fn data_load<S: Into<String>>(msg: S) -> Self {
        Error::DataLoad(msg.into())
    }

    /// Create a new WebSocket error
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new engine protocol error
    pub fn engine<S: Into<String>>(msg: S) -> Self {
        Error::Engine(msg.into())
    }

    /// Create a new navigation error
    pub fn navigation<S: Into<String>>(msg: S) -> Self {
        Error::Navigation(msg.into())
    }

    /// Create a new script execution error
    pub fn script<S: Into<String>>(msg: S) -> Self {
        Error::Script(msg.into())
    }

    /// Create a new report error
    pub fn report<S: Into<String>>(msg: S) -> Self {
        Error::Report(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether this error is an element-visibility timeout
    pub fn is_element_timeout(&self) -> bool {
        matches!(self, Error::ElementTimeout { .. })
    }
}
