//! Secret key material for a single connection.
//!
//! Uses HKDF (HMAC-based Key Derivation Function) to split the agreed
//! Diffie-Hellman secret into independent cipher and MAC keys.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::KEY_SIZE;

/// Errors from key material operations
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key material was empty
    #[error("Key material is empty")]
    Empty,

    /// Key material shorter than required
    #[error("Key too short: {len} bytes (need {min})")]
    TooShort {
        /// Actual length
        len: usize,
        /// Required length
        min: usize,
    },

    /// HKDF expansion failed
    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),
}

/// Key material (secret bytes), zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: Vec<u8>,
}

impl KeyMaterial {
    /// Create new key material from bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the key length
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the key is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reject material that cannot key AES-256 or HMAC-SHA256.
    pub fn ensure_len(&self, min: usize) -> Result<(), KeyError> {
        if self.bytes.is_empty() {
            return Err(KeyError::Empty);
        }
        if self.bytes.len() < min {
            return Err(KeyError::TooShort {
                len: self.bytes.len(),
                min,
            });
        }
        Ok(())
    }

    /// Derive a new key using HKDF-SHA256 with no salt.
    pub fn derive(&self, info: &[u8], output_len: usize) -> Result<KeyMaterial, KeyError> {
        if self.bytes.is_empty() {
            return Err(KeyError::Empty);
        }

        let hk = Hkdf::<Sha256>::new(None, &self.bytes);
        let mut okm = vec![0u8; output_len];

        hk.expand(info, &mut okm)
            .map_err(|e| KeyError::DerivationFailed(format!("HKDF expand failed: {}", e)))?;

        Ok(KeyMaterial::new(okm))
    }

    /// Derive a full-size session key for the given purpose label.
    pub fn derive_session_key(&self, purpose: &str) -> Result<KeyMaterial, KeyError> {
        self.derive(purpose.as_bytes(), KEY_SIZE)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Don't leak key material in debug output
        write!(f, "KeyMaterial([REDACTED, {} bytes])", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_debug_redacts_bytes() {
        let key = KeyMaterial::new(vec![0xAB; 32]);
        let printed = format!("{:?}", key);
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("ab"));
        assert!(!printed.contains("171"));
    }

    #[test]
    fn test_derive_is_deterministic_and_purpose_bound() {
        let secret = KeyMaterial::new(vec![0x42u8; 32]);

        let a = secret.derive_session_key("sealwire/v1/cipher").unwrap();
        let b = secret.derive_session_key("sealwire/v1/cipher").unwrap();
        let mac = secret.derive_session_key("sealwire/v1/mac").unwrap();

        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), mac.as_bytes());
        assert_eq!(a.len(), KEY_SIZE);
    }

    #[test]
    fn test_rfc5869_no_salt_vector() {
        // RFC 5869 Appendix A.3: zero-length salt and info
        let ikm = hex!("0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b");
        let okm = KeyMaterial::new(ikm.to_vec()).derive(&[], 42).unwrap();
        assert_eq!(
            okm.as_bytes(),
            hex!(
                "8da4e775a563c18f715f802a063c5a31b8a11f5c5ee1879ec3454e5f3c738d2d"
                "9d201395faa4b61a96c8"
            )
        );
    }

    #[test]
    fn test_empty_key_rejected() {
        let empty = KeyMaterial::new(Vec::new());
        assert!(matches!(empty.ensure_len(32), Err(KeyError::Empty)));
        assert!(matches!(empty.derive(b"x", 32), Err(KeyError::Empty)));
    }

    #[test]
    fn test_short_key_rejected() {
        let short = KeyMaterial::new(vec![1u8; 16]);
        assert!(matches!(
            short.ensure_len(32),
            Err(KeyError::TooShort { len: 16, min: 32 })
        ));
    }
}
