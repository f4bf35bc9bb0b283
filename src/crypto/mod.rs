//! Cryptographic building blocks for sealed frames.
//!
//! - **X25519 key agreement**: behind the [`KeyAgreement`] trait so other
//!   Diffie-Hellman backends can be dropped in
//! - **HKDF-SHA256**: splits the agreed secret into cipher and MAC keys
//! - **AES-256-CBC + HMAC-SHA256**: encrypt-then-MAC for each frame
//!
//! # Key Schedule
//!
//! ```text
//! shared_secret = X25519(sk_a, pk_b) = X25519(sk_b, pk_a)
//!     ├─[HKDF]─► "sealwire/v1/cipher" ─► AES-256 key
//!     └─[HKDF]─► "sealwire/v1/mac"    ─► HMAC-SHA256 key
//! ```
//!
//! # IV Generation
//!
//! Every frame gets a fresh 128-bit IV from `rand::thread_rng()`. The IV is
//! carried in the frame header and covered by the MAC.

mod agreement;
mod cipher;
mod error;
mod key;

pub use agreement::{Accepted, AgreementError, KeyAgreement, X25519Agreement, X25519_PREFIX};
pub use cipher::{CipherError, SessionCipher};
pub use error::CryptoError;
pub use key::{KeyError, KeyMaterial};

/// AES block size (128 bits)
pub const BLOCK_SIZE: usize = 16;

/// CBC initialization vector size (128 bits)
pub const IV_SIZE: usize = 16;

/// Key size for AES-256, HMAC-SHA256 and X25519 (256 bits)
pub const KEY_SIZE: usize = 32;

/// HMAC-SHA256 tag size (256 bits)
pub const MAC_TAG_SIZE: usize = 32;
