//! Diffie-Hellman key agreement behind a swappable backend trait.
//!
//! The connection layer only ever sees opaque UTF-8 blobs. The default
//! backend is X25519, whose blobs look like `X25519:<base64 public key>`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use thiserror::Error;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};

use super::key::KeyMaterial;
use super::KEY_SIZE;

/// Textual tag prepended to every X25519 blob.
pub const X25519_PREFIX: &str = "X25519:";

/// Errors from key agreement operations
#[derive(Debug, Error)]
pub enum AgreementError {
    /// Peer parameters could not be parsed
    #[error("Malformed agreement parameters: {0}")]
    Malformed(String),

    /// `finalize` called before `offer`
    #[error("No offer has been created")]
    NoOffer,

    /// Peer sent a low-order point; the shared secret would be all zeros
    #[error("Peer public key produced a non-contributory shared secret")]
    NonContributory,
}

/// Result of answering a peer's offer.
#[derive(Debug)]
pub struct Accepted {
    /// Serialized public response to send back to the offering peer
    pub response: Vec<u8>,
    /// Shared secret computed on this side
    pub secret: KeyMaterial,
}

/// A Diffie-Hellman style key agreement backend.
///
/// `offer` is called by the initiating side, `accept` by the answering side
/// and `finalize` by the initiator once the answer arrives. Implementations
/// must return the same offer for repeated `offer` calls until `finalize`
/// has consumed it.
pub trait KeyAgreement {
    /// Produce (or re-emit) this side's public request.
    fn offer(&mut self) -> Vec<u8>;

    /// Answer a peer's offer, computing the shared secret.
    fn accept(&mut self, offer: &[u8]) -> Result<Accepted, AgreementError>;

    /// Complete a previously created offer with the peer's response.
    fn finalize(&mut self, response: &[u8]) -> Result<KeyMaterial, AgreementError>;
}

/// X25519 key agreement (256-bit keys) using `x25519-dalek`.
#[derive(Default)]
pub struct X25519Agreement {
    /// Secret behind the pending offer
    secret: Option<StaticSecret>,
    /// Public half of the pending offer
    public: Option<X25519Public>,
}

impl X25519Agreement {
    /// Create an agreement with no key pair yet; one is generated on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a fixed secret. Intended for reproducible tests.
    pub fn from_secret(secret_bytes: [u8; KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(secret_bytes);
        let public = X25519Public::from(&secret);
        Self {
            secret: Some(secret),
            public: Some(public),
        }
    }

    /// Whether an offer is waiting for its response.
    pub fn has_pending_offer(&self) -> bool {
        self.secret.is_some()
    }

    fn diffie_hellman(
        secret: &StaticSecret,
        peer: &X25519Public,
    ) -> Result<KeyMaterial, AgreementError> {
        let shared = secret.diffie_hellman(peer);
        if !shared.was_contributory() {
            return Err(AgreementError::NonContributory);
        }
        Ok(KeyMaterial::new(shared.as_bytes().to_vec()))
    }
}

impl KeyAgreement for X25519Agreement {
    fn offer(&mut self) -> Vec<u8> {
        let public = match self.public {
            Some(public) => public,
            None => {
                let secret = StaticSecret::random_from_rng(OsRng);
                let public = X25519Public::from(&secret);
                self.secret = Some(secret);
                self.public = Some(public);
                public
            },
        };
        encode_public(&public)
    }

    fn accept(&mut self, offer: &[u8]) -> Result<Accepted, AgreementError> {
        let peer = decode_public(offer)?;

        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519Public::from(&secret);
        let shared = Self::diffie_hellman(&secret, &peer)?;

        Ok(Accepted {
            response: encode_public(&public),
            secret: shared,
        })
    }

    fn finalize(&mut self, response: &[u8]) -> Result<KeyMaterial, AgreementError> {
        let peer = decode_public(response)?;
        let secret = self.secret.as_ref().ok_or(AgreementError::NoOffer)?;
        let shared = Self::diffie_hellman(secret, &peer)?;

        // The pending secret is single-use.
        self.secret = None;
        self.public = None;
        Ok(shared)
    }
}

impl std::fmt::Debug for X25519Agreement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X25519Agreement")
            .field("pending_offer", &self.has_pending_offer())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Serialize a public key as `X25519:<base64>`.
fn encode_public(public: &X25519Public) -> Vec<u8> {
    format!("{}{}", X25519_PREFIX, BASE64.encode(public.as_bytes())).into_bytes()
}

/// Parse a blob produced by [`encode_public`].
fn decode_public(blob: &[u8]) -> Result<X25519Public, AgreementError> {
    let text = std::str::from_utf8(blob)
        .map_err(|e| AgreementError::Malformed(format!("not UTF-8: {}", e)))?;
    let encoded = text
        .trim()
        .strip_prefix(X25519_PREFIX)
        .ok_or_else(|| AgreementError::Malformed("missing X25519 prefix".to_string()))?;
    let raw = BASE64
        .decode(encoded)
        .map_err(|e| AgreementError::Malformed(format!("bad base64: {}", e)))?;
    let bytes: [u8; KEY_SIZE] = raw.as_slice().try_into().map_err(|_| {
        AgreementError::Malformed(format!("expected {} bytes, got {}", KEY_SIZE, raw.len()))
    })?;
    Ok(X25519Public::from(bytes))
}
