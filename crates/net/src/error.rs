use thiserror::Error;
use tracing::Level;

use crate::key::KeyError;

/// Everything that can cut a login short. Handlers return this instead
/// of a bare failure flag so the listener can log once, at the right
/// severity, and tests can assert on the kind.
#[derive(Debug, Error)]
pub enum LoginError {
    /// Negotiated via a Disconnect packet before the error surfaces; not
    /// a hard failure.
    #[error("client protocol {client} does not match server protocol {server}")]
    ProtocolVersionMismatch { client: i32, server: i32 },
    #[error("malformed packet: {0}")]
    MalformedPacket(String),
    #[error("cryptography failure: {0}")]
    CryptoFailure(String),
    /// The connection is closed without a reply; a mismatch here means
    /// the peer never performed the RSA exchange it claims to have done.
    #[error("verify token mismatch")]
    VerifyTokenMismatch,
    #[error("session server refused authentication (HTTP {0})")]
    AuthenticationRefused(u16),
    #[error("session server unreachable: {0}")]
    AuthenticationUnreachable(String),
    #[error("malformed session server response: {0}")]
    MalformedAuth(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl LoginError {
    /// Severity the listener logs this kind at.
    pub fn severity(&self) -> Level {
        match self {
            Self::ProtocolVersionMismatch { .. } => Level::INFO,
            Self::MalformedPacket(_) => Level::WARN,
            Self::CryptoFailure(_) => Level::ERROR,
            Self::VerifyTokenMismatch => Level::WARN,
            Self::AuthenticationRefused(_) => Level::INFO,
            Self::AuthenticationUnreachable(_) => Level::ERROR,
            Self::MalformedAuth(_) => Level::ERROR,
            Self::Internal(_) => Level::ERROR,
        }
    }
}

impl From<basalt_proto::io::Error> for LoginError {
    fn from(value: basalt_proto::io::Error) -> Self {
        Self::MalformedPacket(value.to_string())
    }
}

impl From<KeyError> for LoginError {
    fn from(value: KeyError) -> Self {
        match &value {
            KeyError::OversizedCiphertext(_) => Self::MalformedPacket(value.to_string()),
            _ => Self::CryptoFailure(value.to_string()),
        }
    }
}
