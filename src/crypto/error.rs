//! Unified cryptographic error type.
//!
//! Aggregates the key, agreement and cipher errors so the connection layer
//! can carry one error with its full `#[source]` chain.

use thiserror::Error;

use super::agreement::AgreementError;
use super::cipher::CipherError;
use super::key::KeyError;

/// Unified error type for all cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key agreement failed (malformed or degenerate peer parameters).
    #[error("Key agreement: {0}")]
    Agreement(#[source] AgreementError),

    /// Encryption or decryption failed.
    #[error("Cipher: {0}")]
    Cipher(#[source] CipherError),

    /// Key material was unusable.
    #[error("Key: {0}")]
    Key(#[source] KeyError),

    /// The operating system RNG is unavailable.
    #[error("RNG unavailable: {0}")]
    Rng(String),
}

impl From<AgreementError> for CryptoError {
    fn from(err: AgreementError) -> Self {
        CryptoError::Agreement(err)
    }
}

impl From<CipherError> for CryptoError {
    fn from(err: CipherError) -> Self {
        CryptoError::Cipher(err)
    }
}

impl From<KeyError> for CryptoError {
    fn from(err: KeyError) -> Self {
        CryptoError::Key(err)
    }
}
