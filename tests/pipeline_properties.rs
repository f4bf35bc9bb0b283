//! Property tests for the encrypt/decrypt pipeline.

use proptest::prelude::*;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sealwire::codec::{CompressionStage, MIN_SEALED_FRAME_LEN};
use sealwire::SecureConnection;

fn negotiated(encryption: bool) -> (SecureConnection<()>, SecureConnection<()>) {
    let mut a = SecureConnection::detached(1, encryption);
    let mut b = SecureConnection::detached(2, encryption);
    let offer = a.create_offer().unwrap();
    let response = b.accept_offer(&offer).unwrap().unwrap();
    assert!(a.finalize_offer(&response).unwrap());
    (a, b)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_sealed_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let (a, b) = negotiated(true);
        let frame = a.encrypt(&data).unwrap();
        prop_assert_eq!(b.decrypt(&frame).unwrap(), data);
    }

    #[test]
    fn prop_plain_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let (a, b) = negotiated(false);
        let frame = a.encrypt(&data).unwrap();
        prop_assert_eq!(b.decrypt(&frame).unwrap(), data);
    }

    #[test]
    fn prop_compression_never_grows_more_than_one_byte(
        data in proptest::collection::vec(any::<u8>(), 0..4096)
    ) {
        let stage = CompressionStage::default();
        let tagged = stage.compress(&data).unwrap();
        prop_assert!(tagged.len() <= data.len() + 1);
        prop_assert_eq!(stage.decompress(&tagged).unwrap(), data);
    }

    #[test]
    fn prop_any_bit_flip_is_rejected(
        data in proptest::collection::vec(any::<u8>(), 0..512),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let (a, b) = negotiated(true);
        let mut frame = a.encrypt(&data).unwrap();
        let i = position.index(frame.len());
        frame[i] ^= 1 << bit;
        prop_assert!(b.decrypt(&frame).is_none());
    }
}

#[test]
fn test_empty_input_roundtrips_in_both_modes() {
    for encryption in [true, false] {
        let (a, b) = negotiated(encryption);
        let frame = a.encrypt(b"").unwrap();
        assert_eq!(b.decrypt(&frame).unwrap(), b"");
    }
}

#[test]
fn test_compressible_input_shrinks() {
    let (a, b) = negotiated(true);
    let data = br#"{"role":"user","content":"hello"}"#.repeat(64);
    let frame = a.encrypt(&data).unwrap();
    assert!(frame.len() < data.len() / 4);
    assert_eq!(b.decrypt(&frame).unwrap(), data);
}

#[test]
fn test_random_bytes_are_rejected() {
    let (_a, b) = negotiated(true);
    let mut rng = ChaCha8Rng::seed_from_u64(0x5ea1);
    for _ in 0..32 {
        let mut junk = vec![0u8; 1024];
        rng.fill_bytes(&mut junk);
        assert!(b.decrypt(&junk).is_none());
    }
}

#[test]
fn test_short_sealed_frame_rejected_regardless_of_header() {
    let (_a, b) = negotiated(true);
    for total in [0u32, 16, 20, 24, 1000] {
        let mut frame = vec![0u8; MIN_SEALED_FRAME_LEN - 1];
        frame[..4].copy_from_slice(&total.to_le_bytes());
        assert!(b.decrypt(&frame).is_none(), "total {total}");
    }
}

#[test]
fn test_declared_length_beyond_buffer_rejected() {
    let (a, b) = negotiated(false);
    let mut frame = a.encrypt(b"length check").unwrap();
    let inflated = frame.len() as u32;
    frame[..4].copy_from_slice(&inflated.to_le_bytes());
    assert!(b.decrypt(&frame).is_none());
}

#[test]
fn test_truncated_frame_rejected() {
    let (a, b) = negotiated(true);
    let frame = a.encrypt(&[9u8; 300]).unwrap();
    for cut in [1, 16, 32, frame.len() / 2] {
        assert!(b.decrypt(&frame[..frame.len() - cut]).is_none());
    }
}
