//! Error types for the HAL crate.

use thiserror::Error;

/// Errors that can occur in HAL operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// No backend matches the requested name or criteria.
    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    /// More than one backend matches where exactly one was expected.
    #[error("More than one backend matches the criteria: {0}")]
    AmbiguousBackend(String),

    /// Backend is not available.
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Authentication error (token lookup, account store, etc.).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// No credentials could be found.
    #[error("No credentials found: {0}")]
    CredentialsNotFound(String),

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// A caller-supplied value was rejected.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Network error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic backend error.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
