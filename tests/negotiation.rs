//! Key negotiation scenarios between two in-memory connections.
//!
//! These cover every combination of "encryption requested" on the two sides,
//! negotiation driven out of order, and malformed handshake blobs.

use sealwire::config::Config;
use sealwire::crypto::{Accepted, AgreementError, KeyAgreement, KeyMaterial, X25519Agreement};
use sealwire::{FrameMode, NegotiationState, Role, SealwireError, SecureConnection, NO_ENCRYPTION};

fn negotiate(a: &mut SecureConnection<()>, b: &mut SecureConnection<()>) -> bool {
    let offer = a.create_offer().unwrap();
    let response = b.accept_offer(&offer).unwrap().unwrap();
    a.finalize_offer(&response).unwrap()
}

/// Both sides request encryption: frames are sealed in both directions.
#[test]
fn test_both_sides_encrypt() {
    let mut a = SecureConnection::detached(1, true);
    let mut b = SecureConnection::detached(2, true);

    let offer = a.create_offer().unwrap();
    assert!(offer.starts_with(b"X25519:"));
    assert_eq!(a.state(), NegotiationState::OfferSent);

    let response = b.accept_offer(&offer).unwrap().unwrap();
    assert!(response.starts_with(b"X25519:"));
    assert_ne!(offer, response);
    assert_eq!(b.state(), NegotiationState::KeyEstablished);

    assert!(a.finalize_offer(&response).unwrap());
    assert_eq!(a.state(), NegotiationState::KeyEstablished);

    let frame = a.encrypt(b"Hello").unwrap();
    assert_eq!(b.decrypt(&frame).unwrap(), b"Hello");
    assert_eq!(a.frame_mode(), Some(FrameMode::Sealed));
}

/// Initiator refuses encryption: responder is downgraded.
#[test]
fn test_initiator_declines_encryption() {
    let mut a = SecureConnection::detached(1, false);
    let mut b = SecureConnection::detached(2, true);

    let offer = a.create_offer().unwrap();
    assert_eq!(offer, NO_ENCRYPTION);

    let response = b.accept_offer(&offer).unwrap().unwrap();
    assert_eq!(response, NO_ENCRYPTION);
    assert!(!b.is_encryption_requested());

    assert!(a.finalize_offer(&response).unwrap());

    let frame = a.encrypt(b"Hello").unwrap();
    // Plain frame: [total][payload_len][tag][data]
    assert_eq!(frame.len(), 4 + 4 + 1 + 5);
    assert_eq!(b.decrypt(&frame).unwrap(), b"Hello");
}

/// Responder refuses encryption: it answers a real offer with the sentinel
/// and the initiator follows.
#[test]
fn test_responder_declines_encryption() {
    let mut a = SecureConnection::detached(1, true);
    let mut b = SecureConnection::detached(2, false);

    assert!(negotiate(&mut a, &mut b));
    assert!(!a.is_encryption_requested());
    assert!(!b.is_encryption_requested());
    assert_eq!(a.frame_mode(), Some(FrameMode::Plain));

    let frame = b.encrypt(b"plain reply").unwrap();
    assert_eq!(a.decrypt(&frame).unwrap(), b"plain reply");
}

/// Neither side wants encryption.
#[test]
fn test_neither_side_encrypts() {
    let mut a = SecureConnection::detached(1, false);
    let mut b = SecureConnection::detached(2, false);

    assert!(negotiate(&mut a, &mut b));
    assert_eq!(a.role(), Some(Role::Initiator));
    assert_eq!(b.role(), Some(Role::Responder));

    let frame = a.encrypt(b"").unwrap();
    assert_eq!(b.decrypt(&frame).unwrap(), b"");
}

#[test]
fn test_finalize_before_offer_fails() {
    let mut a = SecureConnection::detached(1, true);
    let err = a.finalize_offer(NO_ENCRYPTION).unwrap_err();
    assert!(matches!(err, SealwireError::NegotiationNotStarted));
    assert_eq!(a.state(), NegotiationState::Uninitialized);
}

#[test]
fn test_malformed_blobs_produce_no_key() {
    let mut b = SecureConnection::detached(2, true);
    for blob in [
        &b""[..],
        b"X25519:",
        b"X25519:%%%",
        b"X25519:AAAA",
        b"DH:MTIzNA==",
    ] {
        assert_eq!(b.accept_offer(blob).unwrap(), None, "blob {:?}", blob);
    }
    assert!(!b.is_key_established());

    // The connection is still usable for a proper offer.
    let mut a = SecureConnection::detached(1, true);
    assert!(negotiate(&mut a, &mut b));
}

#[test]
fn test_malformed_response_leaves_offer_pending() {
    let mut a = SecureConnection::detached(1, true);
    let mut b = SecureConnection::detached(2, true);

    let offer = a.create_offer().unwrap();
    assert!(!a.finalize_offer(b"X25519:bm90IGEga2V5").unwrap());
    assert_eq!(a.state(), NegotiationState::OfferSent);

    let response = b.accept_offer(&offer).unwrap().unwrap();
    assert!(a.finalize_offer(&response).unwrap());

    let frame = b.encrypt(b"recovered").unwrap();
    assert_eq!(a.decrypt(&frame).unwrap(), b"recovered");
}

/// A DH response to a sentinel offer is ignored; only the sentinel completes it.
#[test]
fn test_dh_response_to_sentinel_offer_ignored() {
    let mut a = SecureConnection::detached(1, false);
    a.create_offer().unwrap();

    let mut other = SecureConnection::detached(3, true);
    let dh_offer = other.create_offer().unwrap();

    assert!(!a.finalize_offer(&dh_offer).unwrap());
    assert!(!a.is_key_established());
    assert!(a.finalize_offer(NO_ENCRYPTION).unwrap());
}

#[test]
fn test_renegotiation_rejected_after_downgrade() {
    let mut a = SecureConnection::detached(1, false);
    let mut b = SecureConnection::detached(2, true);
    assert!(negotiate(&mut a, &mut b));

    assert!(matches!(
        b.accept_offer(b"X25519:AAAA"),
        Err(SealwireError::AlreadyEstablished)
    ));
    assert!(!b.is_encryption_requested());
}

/// Deterministic backend: the initiator always offers the same public key.
#[derive(Default)]
struct FixedInitiator(Option<X25519Agreement>);

impl FixedInitiator {
    fn inner(&mut self) -> &mut X25519Agreement {
        self.0
            .get_or_insert_with(|| X25519Agreement::from_secret([0x42; 32]))
    }
}

impl KeyAgreement for FixedInitiator {
    fn offer(&mut self) -> Vec<u8> {
        self.inner().offer()
    }

    fn accept(&mut self, offer: &[u8]) -> Result<Accepted, AgreementError> {
        self.inner().accept(offer)
    }

    fn finalize(&mut self, response: &[u8]) -> Result<KeyMaterial, AgreementError> {
        self.inner().finalize(response)
    }
}

#[test]
fn test_custom_agreement_backend() {
    let config = Config::default();
    let mut a = SecureConnection::<(), FixedInitiator>::with_backend((), 1, true, &config);
    let mut a2 = SecureConnection::<(), FixedInitiator>::with_backend((), 2, true, &config);
    let mut b = SecureConnection::detached(3, true);

    let offer = a.create_offer().unwrap();
    assert_eq!(offer, a2.create_offer().unwrap());

    let response = b.accept_offer(&offer).unwrap().unwrap();
    assert!(a.finalize_offer(&response).unwrap());

    let frame = a.encrypt(b"fixed key offer").unwrap();
    assert_eq!(b.decrypt(&frame).unwrap(), b"fixed key offer");

    // Same offer, different session: frames from `a` do not open under `a2`.
    let mut c = SecureConnection::detached(4, true);
    let response = c.accept_offer(&offer).unwrap().unwrap();
    assert!(a2.finalize_offer(&response).unwrap());
    assert!(a2.decrypt(&frame).is_none());
}
