use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure modes surfaced to the operator.
///
/// Network-level failures (`Network`, `Timeout`, `Http`, `Decode`) are opaque:
/// the remote API guarantees no structured error body, so callers only learn
/// that a call was "not ok". The remaining variants are raised locally before
/// anything reaches the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Transport failure (connection refused, DNS, TLS, ...)
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded the configured deadline
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response
    #[error("{resource} request failed with HTTP {status}")]
    Http { status: u16, resource: String },

    /// 2xx response whose body could not be understood
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// 2xx response whose body reports failure (`{ "success": false, "error": .. }`)
    #[error("remote rejected the request: {0}")]
    Rejected(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no import candidates selected")]
    EmptySelection,

    #[error("{collection} is full ({limit} max)")]
    Capacity { collection: &'static str, limit: usize },

    #[error("an import is already in progress")]
    ImportBusy,

    #[error("no import candidates are staged")]
    NotStaged,

    #[error("import limit must be between 1 and 50, got {0}")]
    InvalidLimit(u32),

    #[error("invalid admin secret")]
    Unauthorized,

    #[error("admin session expired")]
    SessionExpired,

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Classify a reqwest failure. Timeouts are kept apart so the operator
    /// can tell a slow upstream from an unreachable one.
    pub fn from_reqwest(error: reqwest::Error, timeout: Duration, resource: &str) -> Self {
        if error.is_timeout() {
            Error::Timeout(timeout)
        } else if error.is_decode() {
            Error::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            Error::Http { status: status.as_u16(), resource: resource.to_string() }
        } else {
            Error::Network(error.to_string())
        }
    }

    /// Errors produced by a remote call, as opposed to local checks.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout(_) | Error::Http { .. } | Error::Decode(_) | Error::Rejected(_)
        )
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Storage(format!("{e:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_classification() {
        assert!(Error::Network("refused".into()).is_remote());
        assert!(Error::Timeout(Duration::from_secs(1)).is_remote());
        assert!(Error::Http { status: 500, resource: "news".into() }.is_remote());
        assert!(!Error::EmptySelection.is_remote());
        assert!(!Error::Capacity { collection: "images", limit: 20 }.is_remote());
    }

    #[test]
    fn messages_name_the_failure() {
        let e = Error::Http { status: 404, resource: "banner".into() };
        assert_eq!(e.to_string(), "banner request failed with HTTP 404");
        let e = Error::Capacity { collection: "links", limit: 10 };
        assert_eq!(e.to_string(), "links is full (10 max)");
    }

    #[tokio::test]
    async fn status_errors_carry_the_resource_name() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("GET", "/").with_status(503).create_async().await;
        let err = reqwest::get(server.url()).await.unwrap().error_for_status().unwrap_err();
        assert_eq!(
            Error::from_reqwest(err, Duration::from_secs(1), "banner"),
            Error::Http { status: 503, resource: "banner".into() }
        );
    }
}
