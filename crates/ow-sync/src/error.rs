use thiserror::Error;

/// Errors surfaced by the sync engine and the API client.
///
/// The enum is `Clone + PartialEq` so callers can compare consecutive
/// failures and suppress repeats.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The request could not be sent or did not complete (connect failure,
    /// timeout, abort).
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response on a read path.
    #[error("{status} {reason}")]
    Http { status: u16, reason: String },

    /// The body was not the JSON shape we expected.
    #[error("malformed response: {0}")]
    Decode(String),

    /// Non-2xx response on a write path; carries the backend's `detail`.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    /// Any non-2xx response from the login endpoint.
    #[error("login failed")]
    LoginFailed,

    /// Input rejected locally before anything was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// One of the concurrent reads of a refresh cycle failed, voiding the
    /// whole cycle.
    #[error("{endpoint}: {source}")]
    Partial {
        endpoint: &'static str,
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Read-path failures that the next scheduler tick retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network(_) | SyncError::Http { .. } | SyncError::Decode(_) => true,
            SyncError::Partial { source, .. } => source.is_retryable(),
            SyncError::Rejected { .. }
            | SyncError::LoginFailed
            | SyncError::InvalidInput(_) => false,
        }
    }

    pub(crate) fn http(status: reqwest::StatusCode) -> Self {
        SyncError::Http {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
        }
    }

    pub(crate) fn partial(endpoint: &'static str, source: SyncError) -> Self {
        SyncError::Partial {
            endpoint,
            source: Box::new(source),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::http(status)
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_status_line() {
        let err = SyncError::http(reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "503 Service Unavailable");
    }

    #[test]
    fn partial_error_names_endpoint() {
        let err = SyncError::partial(
            "GET /api/artifacts",
            SyncError::http(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
        );
        assert_eq!(err.to_string(), "GET /api/artifacts: 500 Internal Server Error");
        assert!(err.is_retryable());
    }

    #[test]
    fn write_errors_are_not_retryable() {
        let rejected = SyncError::Rejected {
            status: 400,
            detail: "Purpose already has tasks".into(),
        };
        assert_eq!(rejected.to_string(), "Purpose already has tasks");
        assert!(!rejected.is_retryable());
        assert!(!SyncError::LoginFailed.is_retryable());
        assert!(!SyncError::InvalidInput("empty purpose".into()).is_retryable());
    }

    #[test]
    fn identical_failures_compare_equal() {
        assert_eq!(
            SyncError::Network("connection refused".into()),
            SyncError::Network("connection refused".into())
        );
        assert_ne!(
            SyncError::http(reqwest::StatusCode::BAD_GATEWAY),
            SyncError::http(reqwest::StatusCode::GATEWAY_TIMEOUT)
        );
    }
}
