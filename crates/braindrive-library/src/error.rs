// Library plugin error types

use thiserror::Error;

/// Library plugin error
#[derive(Error, Debug)]
pub enum LibraryError {
    /// No API service bound / unusable configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Connection failed
    #[error("Cannot connect to backend: {0}")]
    ConnectionFailed(String),

    /// Request timeout
    #[error("Backend response timeout")]
    Timeout,

    /// API error from the backend
    #[error("Backend error: {0}")]
    ApiError(String),

    /// JSON parsing error
    #[error("Response parse error: {0}")]
    ParseError(String),

    /// No model selected for the capture panel
    #[error("No model selected")]
    NoModelSelected,

    /// Transcript extraction produced no text
    #[error("Transcript contained no extractable text")]
    EmptyTranscript,

    /// The backend returned neither text nor an approval event
    #[error("Backend returned an empty response")]
    EmptyResponse,

    /// Defaults writer found no module/layout entry to update
    #[error("Could not locate a capture module target: {0}")]
    TargetNotFound(String),
}

impl From<reqwest::Error> for LibraryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LibraryError::Timeout
        } else if err.is_connect() {
            LibraryError::ConnectionFailed(err.to_string())
        } else {
            LibraryError::ApiError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::ParseError(err.to_string())
    }
}

/// Result type for library plugin operations
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Error codes surfaced to the host UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryErrorCode {
    InvalidConfig,
    ConnectionFailed,
    Timeout,
    ApiError,
    ParseError,
    NoModelSelected,
    EmptyTranscript,
    EmptyResponse,
    TargetNotFound,
}

impl LibraryErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryErrorCode::InvalidConfig => "LIBRARY_INVALID_CONFIG",
            LibraryErrorCode::ConnectionFailed => "LIBRARY_CONNECTION_FAILED",
            LibraryErrorCode::Timeout => "LIBRARY_TIMEOUT",
            LibraryErrorCode::ApiError => "LIBRARY_API_ERROR",
            LibraryErrorCode::ParseError => "LIBRARY_PARSE_ERROR",
            LibraryErrorCode::NoModelSelected => "CAPTURE_NO_MODEL",
            LibraryErrorCode::EmptyTranscript => "CAPTURE_EMPTY_TRANSCRIPT",
            LibraryErrorCode::EmptyResponse => "CAPTURE_EMPTY_RESPONSE",
            LibraryErrorCode::TargetNotFound => "CAPTURE_TARGET_NOT_FOUND",
        }
    }
}

impl LibraryError {
    pub fn code(&self) -> LibraryErrorCode {
        match self {
            LibraryError::InvalidConfig(_) => LibraryErrorCode::InvalidConfig,
            LibraryError::ConnectionFailed(_) => LibraryErrorCode::ConnectionFailed,
            LibraryError::Timeout => LibraryErrorCode::Timeout,
            LibraryError::ApiError(_) => LibraryErrorCode::ApiError,
            LibraryError::ParseError(_) => LibraryErrorCode::ParseError,
            LibraryError::NoModelSelected => LibraryErrorCode::NoModelSelected,
            LibraryError::EmptyTranscript => LibraryErrorCode::EmptyTranscript,
            LibraryError::EmptyResponse => LibraryErrorCode::EmptyResponse,
            LibraryError::TargetNotFound(_) => LibraryErrorCode::TargetNotFound,
        }
    }
}

impl From<LibraryError> for String {
    fn from(err: LibraryError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_str() {
        assert_eq!(LibraryErrorCode::NoModelSelected.as_str(), "CAPTURE_NO_MODEL");
        assert_eq!(LibraryErrorCode::TargetNotFound.as_str(), "CAPTURE_TARGET_NOT_FOUND");
    }

    #[test]
    fn test_error_to_code() {
        let err = LibraryError::TargetNotFound("page".to_string());
        assert_eq!(err.code(), LibraryErrorCode::TargetNotFound);
        assert!(err.to_string().contains("capture module"));
    }

    #[test]
    fn test_parse_error_from_serde() {
        let bad: Result<serde_json::Value, _> = serde_json::from_str("{nope");
        let err: LibraryError = bad.unwrap_err().into();
        assert_eq!(err.code(), LibraryErrorCode::ParseError);
    }
}
