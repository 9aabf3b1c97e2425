//! Error types for minikv-admin
//!
//! Errors are compared by value when a cluster-wide read is reduced to a
//! single outcome, so every variant carries owned, address-free text and the
//! enum is `Clone + Eq + Hash`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Error {
    // === Transport Errors ===
    #[error("Peer unreachable: {0}")]
    PeerUnreachable(String),

    #[error("RPC authentication failed: {0}")]
    RpcAuth(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown RPC method: {0}")]
    UnknownMethod(String),

    // === Quorum Errors ===
    #[error("Insufficient read quorum")]
    InsufficientReadQuorum,

    #[error("No admin peers configured")]
    NoPeers,

    // === Service Errors ===
    #[error("Service signal channel closed")]
    SignalChannelClosed,

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Is this a failure of the transport rather than of the remote node?
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::PeerUnreachable(_) | Error::RpcAuth(_) | Error::Rpc(_)
        )
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::RpcAuth(_) => StatusCode::UNAUTHORIZED,
            Error::UnknownMethod(_) | Error::InvalidArgument(_) | Error::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::InsufficientReadQuorum | Error::PeerUnreachable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        // The peer address is stripped so that the same failure reported by
        // several peers compares equal.
        let e = e.without_url();
        if e.is_connect() || e.is_timeout() {
            Error::PeerUnreachable(e.to_string())
        } else {
            Error::Rpc(e.to_string())
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Error::RpcAuth(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_compare_by_value() {
        let a = Error::PeerUnreachable("connection refused".into());
        let b = Error::PeerUnreachable("connection refused".into());
        assert_eq!(a, b);
        assert_ne!(a, Error::Rpc("connection refused".into()));
    }

    #[test]
    fn test_http_status() {
        use axum::http::StatusCode;
        assert_eq!(
            Error::RpcAuth("bad token".into()).to_http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::InsufficientReadQuorum.to_http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert!(Error::PeerUnreachable("x".into()).is_transport());
        assert!(!Error::Remote("x".into()).is_transport());
    }
}
