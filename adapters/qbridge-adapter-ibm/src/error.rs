//! Error types for the IBM Quantum adapter.

use qbridge_hal::HalError;
use thiserror::Error;

/// Result type for IBM operations.
pub type IbmResult<T> = Result<T, IbmError>;

/// Remote error code reported when a job id does not exist.
pub const JOB_NOT_FOUND_CODE: &str = "3250";

/// Errors that can occur when using IBM Quantum.
#[derive(Debug, Error)]
pub enum IbmError {
    /// Missing API token.
    #[error(
        "IBM Quantum API token not found. Pass a token, set QBRIDGE_IBM_TOKEN or \
         IBM_QUANTUM_TOKEN, or save an account."
    )]
    MissingToken,

    /// Invalid API token.
    #[error("Invalid IBM Quantum API token: {0}")]
    InvalidToken(String),

    /// Invalid authentication URL.
    #[error("Invalid IBM Quantum URL: {0}")]
    InvalidUrl(String),

    /// Token login failed.
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// The account has no usable hub/group/project.
    #[error("No instance available: {0}")]
    NoInstance(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error.
    #[error("IBM Quantum API error: {message}")]
    ApiError {
        /// Error code from API.
        code: Option<String>,
        /// Error message.
        message: String,
    },

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Backend not found.
    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    /// A caller-supplied value was rejected.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The server returned a record that cannot be turned into a job.
    #[error(
        "Unexpected return value received from the server when retrieving job {job_id}: {message}"
    )]
    ApiProtocol {
        /// Id of the offending job, empty if the record had none.
        job_id: String,
        /// What was wrong with the record.
        message: String,
    },

    /// No credentials are available.
    #[error("No credentials found: {0}")]
    CredentialsNotFound(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from the shared provider layer.
    #[error(transparent)]
    Hal(HalError),
}

impl IbmError {
    /// Whether the server reported the remote "job not found" code.
    pub fn is_job_not_found_code(code: Option<&str>, message: &str) -> bool {
        code == Some(JOB_NOT_FOUND_CODE)
            || message.contains(&format!("Error code: {JOB_NOT_FOUND_CODE}"))
    }
}

impl From<HalError> for IbmError {
    fn from(e: HalError) -> Self {
        match e {
            HalError::BackendNotFound(name) => IbmError::BackendNotFound(name),
            HalError::JobNotFound(id) => IbmError::JobNotFound(id),
            HalError::InvalidArgument(msg) => IbmError::InvalidArgument(msg),
            HalError::CredentialsNotFound(msg) => IbmError::CredentialsNotFound(msg),
            other => IbmError::Hal(other),
        }
    }
}

impl From<IbmError> for HalError {
    fn from(e: IbmError) -> Self {
        match e {
            IbmError::MissingToken
            | IbmError::InvalidToken(_)
            | IbmError::LoginFailed(_)
            | IbmError::InvalidUrl(_) => HalError::AuthenticationFailed(e.to_string()),
            IbmError::CredentialsNotFound(msg) => HalError::CredentialsNotFound(msg),
            IbmError::JobNotFound(id) => HalError::JobNotFound(id),
            IbmError::BackendNotFound(name) => HalError::BackendNotFound(name),
            IbmError::InvalidArgument(msg) => HalError::InvalidArgument(msg),
            IbmError::HttpError(err) => HalError::Network(err),
            IbmError::Hal(err) => err,
            _ => HalError::Backend(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_display() {
        let err = IbmError::MissingToken;
        assert!(err.to_string().contains("QBRIDGE_IBM_TOKEN"));
    }

    #[test]
    fn test_api_protocol_display_names_job() {
        let err = IbmError::ApiProtocol {
            job_id: "job-42".into(),
            message: "missing field status".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("job-42"));
        assert!(msg.contains("missing field status"));
    }

    #[test]
    fn test_api_error_display() {
        let err = IbmError::ApiError {
            code: Some("ERR_401".into()),
            message: "Unauthorized".into(),
        };
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[test]
    fn test_job_not_found_code_detection() {
        assert!(IbmError::is_job_not_found_code(Some("3250"), ""));
        assert!(IbmError::is_job_not_found_code(
            None,
            "Job not found. Error code: 3250."
        ));
        assert!(!IbmError::is_job_not_found_code(Some("3251"), "other"));
    }

    #[test]
    fn test_auth_errors_to_hal_auth_failed() {
        let hal: HalError = IbmError::MissingToken.into();
        assert!(matches!(hal, HalError::AuthenticationFailed(_)));
        let hal: HalError = IbmError::InvalidToken("bad".into()).into();
        assert!(matches!(hal, HalError::AuthenticationFailed(_)));
    }

    #[test]
    fn test_job_not_found_to_hal() {
        let hal: HalError = IbmError::JobNotFound("j1".into()).into();
        assert!(matches!(hal, HalError::JobNotFound(id) if id == "j1"));
    }

    #[test]
    fn test_api_protocol_to_hal_backend() {
        let hal: HalError = IbmError::ApiProtocol {
            job_id: "j".into(),
            message: "m".into(),
        }
        .into();
        assert!(matches!(hal, HalError::Backend(_)));
    }

    #[test]
    fn test_hal_roundtrip_keeps_variant() {
        let ibm: IbmError = HalError::BackendNotFound("ibm_lagos".into()).into();
        assert!(matches!(ibm, IbmError::BackendNotFound(ref n) if n == "ibm_lagos"));

        let ibm: IbmError = HalError::Configuration("x".into()).into();
        let hal: HalError = ibm.into();
        assert!(matches!(hal, HalError::Configuration(_)));
    }
}
