//! Error types for treedns
//!
//! Provides structured error types for every node component: naming,
//! the wire codec, the registry, the startup handshake and the transport.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Unified error type for a name-server node
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Naming Errors
    // =========================================================================
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    // =========================================================================
    // Codec Errors
    // =========================================================================
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Message too large: {size} bytes exceeds datagram limit of {limit} bytes")]
    MessageTooLarge { size: usize, limit: usize },

    // =========================================================================
    // Registry Errors
    // =========================================================================
    #[error("Name already registered: {name} (as {existing})")]
    RegistrationConflict { name: String, existing: String },

    // =========================================================================
    // Handshake Errors
    // =========================================================================
    #[error("Parent {parent} did not answer the registration within {timeout:?}")]
    HandshakeTimeout { parent: SocketAddr, timeout: Duration },

    #[error("Parent {parent} rejected the registration: {reason}")]
    HandshakeRejected { parent: SocketAddr, reason: String },

    #[error("Handshake protocol error: {0}")]
    HandshakeProtocol(String),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error came out of the parent handshake
    pub fn is_handshake_failure(&self) -> bool {
        matches!(
            self,
            Error::HandshakeTimeout { .. }
                | Error::HandshakeRejected { .. }
                | Error::HandshakeProtocol(_)
        )
    }

    /// Process exit status to report for this error
    pub fn exit_code(&self) -> u8 {
        if self.is_handshake_failure() {
            2
        } else {
            1
        }
    }
}

/// Result type alias for treedns
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_errors_exit_with_two() {
        let parent: SocketAddr = "127.0.0.1:53001".parse().unwrap();

        let err = Error::HandshakeTimeout {
            parent,
            timeout: Duration::from_secs(3),
        };
        assert!(err.is_handshake_failure());
        assert_eq!(err.exit_code(), 2);

        let err = Error::HandshakeRejected {
            parent,
            reason: "name already registered".into(),
        };
        assert!(err.is_handshake_failure());
        assert!(err.to_string().contains("name already registered"));
    }

    #[test]
    fn test_other_errors_are_not_handshake_failures() {
        let err = Error::RegistrationConflict {
            name: "com".into(),
            existing: "subdomain".into(),
        };
        assert!(!err.is_handshake_failure());

        let err = Error::InvalidName {
            name: "not.a.label".into(),
            reason: "contains a dot".into(),
        };
        assert!(!err.is_handshake_failure());
        assert_eq!(err.exit_code(), 1);

        let err = Error::Configuration("bad port".into());
        assert!(!err.is_handshake_failure());
        assert_eq!(err.exit_code(), 1);
    }
}
