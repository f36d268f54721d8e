//! Error types for the Subsonic provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Credential construction errors
///
/// Fatal to the operation that requested the credential: no request is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid auth mode '{0}' (expected 'token' or 'password')")]
    InvalidMode(String),
}

/// Failure of a single remote call
///
/// Never fatal to a batch: the call is abandoned and logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Non-2xx HTTP status
    #[error("HTTP error (status {status})")]
    Http { status: u16 },

    /// Body is not valid JSON or a payload has the wrong shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// JSON without the `subsonic-response` envelope
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Envelope reported `status: failed`
    #[error("Subsonic error {code}: {message}")]
    Remote { code: i64, message: String },

    /// Connection, TLS or timeout failure reported by the HTTP bridge
    #[error("Network error: {0}")]
    Network(String),
}

impl From<BridgeError> for TransportError {
    fn from(error: BridgeError) -> Self {
        TransportError::Network(error.to_string())
    }
}

/// Any Subsonic provider error
#[derive(Error, Debug)]
pub enum SubsonicError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type for Subsonic operations
pub type Result<T> = std::result::Result<T, SubsonicError>;

/// Result type for a single remote call
pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = TransportError::Remote {
            code: 40,
            message: "Wrong username or password".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Subsonic error 40: Wrong username or password"
        );

        let error = AuthError::InvalidMode("ldap".to_string());
        assert!(error.to_string().contains("'ldap'"));
    }

    #[test]
    fn test_bridge_error_conversion() {
        let error: TransportError = BridgeError::Timeout("5s elapsed".to_string()).into();
        assert!(matches!(error, TransportError::Network(msg) if msg.contains("5s elapsed")));

        let error: SubsonicError = AuthError::InvalidMode("x".to_string()).into();
        assert!(matches!(error, SubsonicError::Auth(_)));
    }
}
