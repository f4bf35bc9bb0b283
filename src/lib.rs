//! # Sealwire - per-connection secure transport
//!
//! Sealwire turns an ordinary byte stream into an authenticated, encrypted
//! and compressed message channel. Each connection negotiates its own key
//! with a Diffie-Hellman exchange, or agrees with the peer to run without
//! encryption.
//!
//! ## Pipeline
//!
//! ```text
//! send:    data ─► compress ─► seal (AES-256-CBC + HMAC) ─► frame ─► stream
//! receive: stream ─► unframe ─► verify + decrypt ─► decompress ─► data
//! ```
//!
//! ### Negotiation
//!
//! ```text
//! Initiator                                Responder
//!    │                                         │
//!    │──── "X25519:<pk_a>" or NO ENCRYPTION ──>│ accept_offer()
//!    │<─── "X25519:<pk_b>" or NO ENCRYPTION ───│
//! finalize_offer()                             │
//!    │                                         │
//!    │═══════════ sealed frames ══════════════│
//! ```
//!
//! ### Wire Formats
//!
//! All integers are little-endian `u32`. `total` counts the bytes after
//! itself.
//!
//! | Mode     | Layout                                                  |
//! |----------|---------------------------------------------------------|
//! | Payload  | `[tag: 0 raw, 1 gzip][data]`                            |
//! | Plain    | `[total][payload_len][payload]`                         |
//! | Sealed   | `[total][iv: 16][payload_len][ciphertext][hmac: 32]`    |
//!
//! ## Quick Start
//!
//! ```rust
//! use sealwire::SecureConnection;
//!
//! let mut alice = SecureConnection::detached(1, true);
//! let mut bob = SecureConnection::detached(2, true);
//!
//! let offer = alice.create_offer().unwrap();
//! let response = bob.accept_offer(&offer).unwrap().unwrap();
//! assert!(alice.finalize_offer(&response).unwrap());
//!
//! let frame = alice.encrypt(b"hello bob").unwrap();
//! assert_eq!(bob.decrypt(&frame).unwrap(), b"hello bob");
//! ```
//!
//! Over a real stream, use [`SecureConnection::initiate_handshake`] /
//! [`SecureConnection::respond_handshake`] followed by
//! [`SecureConnection::send`] / [`SecureConnection::recv`].
//!
//! ## Modules
//!
//! - [`connection`]: negotiation state machine and the send/receive pipeline
//! - [`codec`]: compression stage and frame codec
//! - [`crypto`]: key agreement, key derivation, frame cipher
//! - [`transport`]: async stream helpers and TCP construction
//! - [`runtime`]: process-wide init/teardown
//! - [`config`]: configuration management
//! - [`error`]: error types and result aliases

pub mod codec;
pub mod config;
pub mod connection;
pub mod crypto;
pub mod error;
pub mod runtime;
pub mod transport;

// Re-exports for convenience
pub use codec::{CompressionStage, Frame, FrameMode, PayloadTag};
pub use config::Config;
pub use connection::{ConnectionId, NegotiationState, Role, SecureConnection, NO_ENCRYPTION};
pub use crypto::{CryptoError, KeyAgreement, X25519Agreement};
pub use error::{Result, SealwireError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
