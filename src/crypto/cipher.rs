//! AES-256-CBC encryption with an HMAC-SHA256 tag (encrypt-then-MAC).
//!
//! Output of [`SessionCipher::seal`] is `ciphertext || tag`. The tag covers
//! the caller-supplied associated data (the frame's IV and payload length)
//! followed by the ciphertext, so any bit flip in the sealed region is
//! detected before the padding is ever inspected.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

use super::key::KeyMaterial;
use super::{BLOCK_SIZE, IV_SIZE, KEY_SIZE, MAC_TAG_SIZE};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// HKDF label for the AES key
const CIPHER_KEY_LABEL: &str = "sealwire/v1/cipher";

/// HKDF label for the HMAC key
const MAC_KEY_LABEL: &str = "sealwire/v1/mac";

/// Errors from cipher operations
#[derive(Debug, Error)]
pub enum CipherError {
    /// Invalid key or IV length
    #[error("Invalid cipher key: {0}")]
    InvalidKey(String),

    /// Sealed data shorter than one block plus the tag
    #[error("Ciphertext too short")]
    DataTooShort,

    /// Tag did not verify (tampered data or wrong key)
    #[error("Authentication tag mismatch")]
    AuthenticationFailed,

    /// Padding invalid after a verified tag
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Per-connection cipher keyed from the agreed secret.
pub struct SessionCipher {
    cipher_key: KeyMaterial,
    mac_key: KeyMaterial,
}

impl SessionCipher {
    /// Derive cipher and MAC keys from a shared Diffie-Hellman secret.
    pub fn from_shared_secret(secret: &KeyMaterial) -> Result<Self, super::CryptoError> {
        secret.ensure_len(KEY_SIZE)?;
        Ok(Self {
            cipher_key: secret.derive_session_key(CIPHER_KEY_LABEL)?,
            mac_key: secret.derive_session_key(MAC_KEY_LABEL)?,
        })
    }

    /// Generate a fresh random IV from the thread-local CSPRNG.
    pub fn generate_iv() -> [u8; IV_SIZE] {
        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);
        iv
    }

    /// Encrypt `plaintext` under `iv` and append the tag.
    ///
    /// Returns: ciphertext || tag
    pub fn seal(
        &self,
        plaintext: &[u8],
        iv: &[u8; IV_SIZE],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        let encryptor = Aes256CbcEnc::new_from_slices(self.cipher_key.as_bytes(), iv)
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        let mut sealed = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let tag = self.tag(associated_data, &sealed)?;
        sealed.extend_from_slice(&tag);
        Ok(sealed)
    }

    /// Verify the tag, then decrypt and strip padding.
    ///
    /// Input format: ciphertext || tag
    pub fn open(
        &self,
        sealed: &[u8],
        iv: &[u8; IV_SIZE],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        if sealed.len() < BLOCK_SIZE + MAC_TAG_SIZE {
            return Err(CipherError::DataTooShort);
        }

        let (ciphertext, tag) = sealed.split_at(sealed.len() - MAC_TAG_SIZE);
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::DecryptionFailed(format!(
                "ciphertext length {} is not a multiple of {}",
                ciphertext.len(),
                BLOCK_SIZE
            )));
        }

        let mut mac = self.mac()?;
        mac.update(associated_data);
        mac.update(ciphertext);
        mac.verify_slice(tag)
            .map_err(|_| CipherError::AuthenticationFailed)?;

        let decryptor = Aes256CbcDec::new_from_slices(self.cipher_key.as_bytes(), iv)
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|e| CipherError::DecryptionFailed(e.to_string()))
    }

    /// Ciphertext length for a plaintext of `len` bytes, tag included.
    pub fn sealed_len(len: usize) -> usize {
        (len / BLOCK_SIZE + 1) * BLOCK_SIZE + MAC_TAG_SIZE
    }

    fn mac(&self) -> Result<HmacSha256, CipherError> {
        HmacSha256::new_from_slice(self.mac_key.as_bytes())
            .map_err(|e| CipherError::InvalidKey(e.to_string()))
    }

    fn tag(
        &self,
        associated_data: &[u8],
        ciphertext: &[u8],
    ) -> Result<[u8; MAC_TAG_SIZE], CipherError> {
        let mut mac = self.mac()?;
        mac.update(associated_data);
        mac.update(ciphertext);

        let mut tag = [0u8; MAC_TAG_SIZE];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        Ok(tag)
    }
}

impl std::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCipher")
            .field("algorithm", &"AES-256-CBC+HMAC-SHA256")
            .finish_non_exhaustive()
    }
}
