//! Per-connection secure transport state.
//!
//! A [`SecureConnection`] owns one raw stream plus everything negotiated for
//! it: the caller-assigned id, whether encryption is requested, the key
//! agreement in progress and, once negotiation completes, the session cipher.
//!
//! # Negotiation
//!
//! ```text
//!                     create_offer()
//!     [Uninitialized] ─────────────────> [OfferSent]
//!          │                                  │
//!          │ accept_offer()                   │ finalize_offer()
//!          v                                  v
//!     [KeyEstablished] <──────────────────────┘
//! ```
//!
//! The responder has no intermediate "offer accepted" state: `accept_offer`
//! computes the shared key and answers in one call, so it moves straight
//! from `Uninitialized` to `KeyEstablished`.
//!
//! `KeyEstablished` is terminal. Either side can refuse encryption by sending
//! (or answering with) the literal `NO ENCRYPTION`; the downgrade is mutual
//! and permanent, and a side that asked for no encryption is never upgraded.
//!
//! # Pipeline
//!
//! `encrypt` compresses, then seals, then frames. `decrypt` undoes the three
//! steps in reverse order. Frames that fail any step come back as `None`
//! from [`SecureConnection::decrypt`]; [`SecureConnection::try_decrypt`]
//! returns the classified error instead.
//!
//! # Caller contract
//!
//! While encryption is requested but the key is not yet established,
//! `encrypt` and `decrypt` pass the (compressed) payload through unframed and
//! unencrypted, logging a warning. Never send application data before
//! [`SecureConnection::is_key_established`] is true; the async stream helpers
//! in [`crate::transport`] enforce this.

use crate::codec::{sealed_header, CompressionStage, Frame, FrameMode};
use crate::config::{Config, TransportConfig};
use crate::crypto::{AgreementError, CryptoError, KeyAgreement, SessionCipher, X25519Agreement};
use crate::error::{Result, SealwireError};
use crate::runtime;

/// Handshake blob that signals "no encryption on this connection"
pub const NO_ENCRYPTION: &[u8] = b"NO ENCRYPTION";

/// Caller-assigned connection identifier, used for diagnostics only
pub type ConnectionId = u64;

/// Key negotiation progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Nothing sent or received yet
    Uninitialized,
    /// Offer created, waiting for the peer's response
    OfferSent,
    /// Negotiation finished (with or without encryption)
    KeyEstablished,
}

/// Which side of the handshake this connection played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Created the offer
    Initiator,
    /// Answered the offer
    Responder,
}

/// Encryption status. A cipher exists exactly when encryption is requested
/// and the key is established.
enum CryptoMode {
    Disabled,
    Pending,
    Active(SessionCipher),
}

/// A stream plus its negotiated compression/encryption pipeline.
pub struct SecureConnection<S, A = X25519Agreement> {
    id: ConnectionId,
    stream: S,
    mode: CryptoMode,
    state: NegotiationState,
    role: Option<Role>,
    agreement: Option<A>,
    compression: CompressionStage,
    transport: TransportConfig,
}

impl<S> SecureConnection<S, X25519Agreement> {
    /// Wrap `stream`, taking compression and transport settings from the
    /// process-wide runtime.
    pub fn new(stream: S, id: ConnectionId, encryption: bool) -> Self {
        Self::with_backend(stream, id, encryption, &runtime::config())
    }

    /// Wrap `stream` using an explicit configuration.
    pub fn with_config(stream: S, id: ConnectionId, config: &Config) -> Self {
        Self::with_backend(stream, id, config.connection.encryption, config)
    }
}

impl SecureConnection<(), X25519Agreement> {
    /// A connection with no stream attached; only the pipeline is usable.
    pub fn detached(id: ConnectionId, encryption: bool) -> Self {
        Self::new((), id, encryption)
    }
}

impl<S, A: KeyAgreement + Default> SecureConnection<S, A> {
    /// Wrap `stream` with a specific key agreement backend.
    pub fn with_backend(stream: S, id: ConnectionId, encryption: bool, config: &Config) -> Self {
        Self {
            id,
            stream,
            mode: if encryption {
                CryptoMode::Pending
            } else {
                CryptoMode::Disabled
            },
            state: NegotiationState::Uninitialized,
            role: None,
            agreement: None,
            compression: CompressionStage::new(&config.compression),
            transport: config.transport.clone(),
        }
    }

    /// Caller-assigned identifier
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether this side still wants encryption
    pub fn is_encryption_requested(&self) -> bool {
        !matches!(self.mode, CryptoMode::Disabled)
    }

    /// Whether negotiation has completed
    pub fn is_key_established(&self) -> bool {
        self.state == NegotiationState::KeyEstablished
    }

    /// Current negotiation state
    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Handshake role, once known
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Frame layout used on the wire, or `None` while the pipeline is in
    /// pass-through (encryption requested, key not yet established).
    pub fn frame_mode(&self) -> Option<FrameMode> {
        match self.mode {
            CryptoMode::Disabled => Some(FrameMode::Plain),
            CryptoMode::Pending => None,
            CryptoMode::Active(_) => Some(FrameMode::Sealed),
        }
    }

    /// Stream limits for the async helpers
    pub fn transport_config(&self) -> &TransportConfig {
        &self.transport
    }

    /// Borrow the underlying stream
    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Mutably borrow the underlying stream
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Give back the underlying stream, dropping all key material
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Produce this side's handshake offer.
    ///
    /// Returns [`NO_ENCRYPTION`] when encryption is not requested. Repeated
    /// calls before the response arrives return the same offer.
    pub fn create_offer(&mut self) -> Result<Vec<u8>> {
        match self.state {
            NegotiationState::KeyEstablished => return Err(SealwireError::AlreadyEstablished),
            NegotiationState::Uninitialized | NegotiationState::OfferSent => {},
        }

        self.state = NegotiationState::OfferSent;
        self.role = Some(Role::Initiator);

        if !self.is_encryption_requested() {
            tracing::debug!(connection = self.id, "offering unencrypted connection");
            return Ok(NO_ENCRYPTION.to_vec());
        }

        let offer = self.agreement.get_or_insert_with(A::default).offer();
        tracing::debug!(connection = self.id, "key offer created");
        Ok(offer)
    }

    /// Answer a peer's offer.
    ///
    /// Returns the response to send back, or `None` if the offer was empty or
    /// malformed (no key is produced and the state is unchanged).
    pub fn accept_offer(&mut self, offer: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.state {
            NegotiationState::Uninitialized => {},
            NegotiationState::OfferSent => {
                return Err(SealwireError::Protocol(
                    "received an offer after sending one".to_string(),
                ))
            },
            NegotiationState::KeyEstablished => return Err(SealwireError::AlreadyEstablished),
        }

        if offer.is_empty() {
            return Ok(None);
        }

        if offer == NO_ENCRYPTION || !self.is_encryption_requested() {
            self.disable_encryption();
            self.establish(Role::Responder);
            return Ok(Some(NO_ENCRYPTION.to_vec()));
        }

        let accepted = match self.agreement.get_or_insert_with(A::default).accept(offer) {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::debug!(connection = self.id, error = %e, "ignoring malformed key offer");
                return Ok(None);
            },
        };

        self.mode = CryptoMode::Active(SessionCipher::from_shared_secret(&accepted.secret)?);
        self.establish(Role::Responder);
        Ok(Some(accepted.response))
    }

    /// Complete negotiation with the peer's response to our offer.
    ///
    /// Returns `false` if the response was empty or malformed (no key is
    /// produced). Calling this before [`create_offer`](Self::create_offer) is
    /// an error.
    pub fn finalize_offer(&mut self, response: &[u8]) -> Result<bool> {
        match self.state {
            NegotiationState::OfferSent => {},
            NegotiationState::Uninitialized => return Err(SealwireError::NegotiationNotStarted),
            NegotiationState::KeyEstablished => return Err(SealwireError::AlreadyEstablished),
        }

        if response.is_empty() {
            return Ok(false);
        }

        if response == NO_ENCRYPTION {
            self.disable_encryption();
            self.establish(Role::Initiator);
            return Ok(true);
        }

        // We offered no encryption; anything but the sentinel is a protocol slip.
        let Some(agreement) = self.agreement.as_mut() else {
            tracing::debug!(
                connection = self.id,
                "ignoring key response to an unencrypted offer"
            );
            return Ok(false);
        };

        let secret = match agreement.finalize(response) {
            Ok(secret) => secret,
            Err(AgreementError::NoOffer) => return Err(SealwireError::NegotiationNotStarted),
            Err(e) => {
                tracing::debug!(connection = self.id, error = %e, "ignoring malformed key response");
                return Ok(false);
            },
        };

        self.mode = CryptoMode::Active(SessionCipher::from_shared_secret(&secret)?);
        self.establish(Role::Initiator);
        Ok(true)
    }

    /// Compress, seal and frame one message.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let tagged = self.compression.compress(data)?;
        self.seal(tagged)
    }

    /// Undo [`encrypt`](Self::encrypt). Any malformed, tampered or
    /// undecodable frame yields `None`.
    pub fn decrypt(&self, frame: &[u8]) -> Option<Vec<u8>> {
        match self.try_decrypt(frame) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::debug!(
                    connection = self.id,
                    frame_len = frame.len(),
                    error = %e,
                    "rejecting frame"
                );
                None
            },
        }
    }

    /// Like [`decrypt`](Self::decrypt) but reports why a frame was rejected.
    pub fn try_decrypt(&self, frame: &[u8]) -> Result<Vec<u8>> {
        let tagged = self.open(frame)?;
        self.compression.decompress(&tagged)
    }

    fn seal(&self, tagged: Vec<u8>) -> Result<Vec<u8>> {
        match &self.mode {
            CryptoMode::Disabled => Frame::Plain { payload: &tagged }.encode(),
            CryptoMode::Pending => {
                tracing::warn!(
                    connection = self.id,
                    "encryption requested but key not negotiated; payload sent unencrypted"
                );
                Ok(tagged)
            },
            CryptoMode::Active(cipher) => {
                let iv = SessionCipher::generate_iv();
                let payload_len = u32::try_from(tagged.len()).map_err(|_| {
                    SealwireError::FrameTooLarge {
                        len: tagged.len(),
                        max: u32::MAX as usize,
                    }
                })?;
                let header = sealed_header(&iv, payload_len);
                let body = cipher
                    .seal(&tagged, &iv, &header)
                    .map_err(CryptoError::from)?;

                Frame::Sealed {
                    iv,
                    payload_len,
                    body: &body,
                }
                .encode()
            },
        }
    }

    fn open(&self, frame: &[u8]) -> Result<Vec<u8>> {
        match &self.mode {
            CryptoMode::Disabled => Ok(Frame::decode_plain(frame)?.to_vec()),
            CryptoMode::Pending => {
                tracing::warn!(
                    connection = self.id,
                    "encryption requested but key not negotiated; payload accepted unencrypted"
                );
                Ok(frame.to_vec())
            },
            CryptoMode::Active(cipher) => {
                let sealed = Frame::decode_sealed(frame)?;
                let header = sealed_header(&sealed.iv, sealed.payload_len);
                let mut plaintext = cipher
                    .open(sealed.body, &sealed.iv, &header)
                    .map_err(CryptoError::from)?;

                let payload_len = sealed.payload_len as usize;
                if payload_len > plaintext.len() {
                    return Err(SealwireError::MalformedFrame(format!(
                        "payload length {} exceeds decrypted size {}",
                        payload_len,
                        plaintext.len()
                    )));
                }
                plaintext.truncate(payload_len);
                Ok(plaintext)
            },
        }
    }

    fn disable_encryption(&mut self) {
        if self.is_encryption_requested() {
            tracing::info!(connection = self.id, "peer negotiated an unencrypted connection");
        }
        self.mode = CryptoMode::Disabled;
        self.agreement = None;
    }

    fn establish(&mut self, role: Role) {
        self.state = NegotiationState::KeyEstablished;
        self.role = Some(role);
        tracing::debug!(
            connection = self.id,
            role = ?role,
            encrypted = self.is_encryption_requested(),
            "key negotiation complete"
        );
    }
}

impl<S, A> std::fmt::Debug for SecureConnection<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.mode {
            CryptoMode::Disabled => "disabled",
            CryptoMode::Pending => "pending",
            CryptoMode::Active(_) => "active",
        };
        f.debug_struct("SecureConnection")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("role", &self.role)
            .field("encryption", &mode)
            .finish_non_exhaustive()
    }
}
