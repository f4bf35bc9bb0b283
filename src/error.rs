//! Sealwire error types.
//!
//! Errors fall into two groups:
//!
//! - **Untrusted input**: `MalformedFrame`, `Crypto`, `Decompression` and
//!   `FrameTooLarge` describe bytes that came off the wire. The connection's
//!   `decrypt` folds all of them into `None`; `try_decrypt` and the stream
//!   helpers return them so callers can log and close the connection.
//! - **Caller mistakes**: `NegotiationNotStarted`, `AlreadyEstablished` and
//!   `NegotiationIncomplete` mean the API was driven out of order.
//!
//! The `Crypto` variant preserves the full error chain via `#[source]`.

use thiserror::Error;

use crate::crypto::CryptoError;

/// Sealwire errors.
#[derive(Error, Debug)]
pub enum SealwireError {
    /// A sealed operation was attempted before key agreement finished.
    #[error("Key negotiation has not completed")]
    NegotiationIncomplete,

    /// `finalize_offer` was called without a prior `create_offer`.
    #[error("No key negotiation was started on this connection")]
    NegotiationNotStarted,

    /// Negotiation was driven again after the key was established.
    #[error("Key already established; renegotiation is not supported")]
    AlreadyEstablished,

    /// Negotiation messages arrived in an invalid order.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Frame header or length fields are inconsistent with the buffer.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Frame exceeds the configured size limit.
    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge {
        /// Declared length
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// Compression operation failed.
    #[error("Compression error: {0}")]
    Compression(String),

    /// Decompression operation failed.
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// Cryptographic operation failed.
    #[error("Crypto error: {0}")]
    Crypto(#[source] CryptoError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// A transport-level deadline expired.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Sealwire operations
pub type Result<T> = std::result::Result<T, SealwireError>;

impl SealwireError {
    /// Whether the error came from untrusted peer bytes rather than API misuse.
    pub fn is_peer_fault(&self) -> bool {
        matches!(
            self,
            SealwireError::MalformedFrame(_)
                | SealwireError::FrameTooLarge { .. }
                | SealwireError::Decompression(_)
                | SealwireError::Crypto(_)
        )
    }
}

impl From<CryptoError> for SealwireError {
    fn from(err: CryptoError) -> Self {
        SealwireError::Crypto(err)
    }
}

impl From<toml::de::Error> for SealwireError {
    fn from(err: toml::de::Error) -> Self {
        SealwireError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SealwireError {
    fn from(err: toml::ser::Error) -> Self {
        SealwireError::Config(err.to_string())
    }
}
