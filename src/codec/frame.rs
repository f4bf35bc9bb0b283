//! Length-prefixed frame encoding and decoding.
//!
//! # Wire Format
//!
//! All integers are little-endian `u32`.
//!
//! ```text
//! Plain:  [total:4][payload_len:4][payload]
//! Sealed: [total:4][iv:16][payload_len:4][ciphertext || mac_tag]
//! ```
//!
//! `total` counts every byte after the length field itself. Bytes past the
//! declared end of a frame are ignored by [`Frame::decode`].

use crate::crypto::IV_SIZE;
use crate::error::{Result, SealwireError};

/// Size of each length field
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Header size of a plain frame (`total` + `payload_len`)
pub const PLAIN_HEADER_LEN: usize = 2 * LENGTH_FIELD_SIZE;

/// Header size of a sealed frame (`total` + IV + `payload_len`)
pub const SEALED_HEADER_LEN: usize = 2 * LENGTH_FIELD_SIZE + IV_SIZE;

/// Smallest plain frame (empty payload)
pub const MIN_PLAIN_FRAME_LEN: usize = PLAIN_HEADER_LEN;

/// Smallest sealed frame (at least one ciphertext byte)
pub const MIN_SEALED_FRAME_LEN: usize = SEALED_HEADER_LEN + 1;

/// Which frame layout is in use on a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    /// No encryption: payload travels as compressed plaintext
    Plain,
    /// Encrypted: IV in the header, ciphertext as payload
    Sealed,
}

impl FrameMode {
    /// Minimum valid frame length for this mode
    pub fn min_frame_len(self) -> usize {
        match self {
            Self::Plain => MIN_PLAIN_FRAME_LEN,
            Self::Sealed => MIN_SEALED_FRAME_LEN,
        }
    }
}

impl std::fmt::Display for FrameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Sealed => write!(f, "sealed"),
        }
    }
}

/// A borrowed view of one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Plain frame
    Plain {
        /// Tagged (compressed or raw) payload
        payload: &'a [u8],
    },
    /// Sealed frame
    Sealed {
        /// Per-frame IV
        iv: [u8; IV_SIZE],
        /// Length of the plaintext before padding
        payload_len: u32,
        /// Ciphertext followed by the MAC tag
        body: &'a [u8],
    },
}

impl<'a> Frame<'a> {
    /// Layout of this frame
    pub fn mode(&self) -> FrameMode {
        match self {
            Self::Plain { .. } => FrameMode::Plain,
            Self::Sealed { .. } => FrameMode::Sealed,
        }
    }

    /// Value of the leading `total` field
    pub fn total_len(&self) -> usize {
        match self {
            Self::Plain { payload } => LENGTH_FIELD_SIZE + payload.len(),
            Self::Sealed { body, .. } => IV_SIZE + LENGTH_FIELD_SIZE + body.len(),
        }
    }

    /// Full encoded size including the `total` field
    pub fn encoded_len(&self) -> usize {
        LENGTH_FIELD_SIZE + self.total_len()
    }

    /// Encode to wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let total = to_u32(self.total_len())?;
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&total.to_le_bytes());

        match self {
            Self::Plain { payload } => {
                buf.extend_from_slice(&to_u32(payload.len())?.to_le_bytes());
                buf.extend_from_slice(payload);
            },
            Self::Sealed {
                iv,
                payload_len,
                body,
            } => {
                buf.extend_from_slice(&sealed_header(iv, *payload_len));
                buf.extend_from_slice(body);
            },
        }

        Ok(buf)
    }

    /// Decode one frame of the given mode from the front of `data`.
    pub fn decode(data: &'a [u8], mode: FrameMode) -> Result<Self> {
        match mode {
            FrameMode::Plain => Self::decode_plain(data).map(|payload| Self::Plain { payload }),
            FrameMode::Sealed => Self::decode_sealed(data).map(|sealed| Self::Sealed {
                iv: sealed.iv,
                payload_len: sealed.payload_len,
                body: sealed.body,
            }),
        }
    }

    /// Decode a plain frame, returning its payload.
    pub fn decode_plain(data: &'a [u8]) -> Result<&'a [u8]> {
        let frame = declared_body(data, FrameMode::Plain)?;
        if frame.len() < LENGTH_FIELD_SIZE {
            return Err(SealwireError::MalformedFrame(format!(
                "declared length {} shorter than payload length field",
                frame.len()
            )));
        }

        let payload_len = read_u32(frame, 0) as usize;
        let payload = &frame[LENGTH_FIELD_SIZE..];
        if payload_len > payload.len() {
            return Err(SealwireError::MalformedFrame(format!(
                "payload length {} exceeds frame body of {} bytes",
                payload_len,
                payload.len()
            )));
        }
        Ok(&payload[..payload_len])
    }

    /// Decode a sealed frame into its header fields and body.
    pub fn decode_sealed(data: &'a [u8]) -> Result<SealedFrame<'a>> {
        let frame = declared_body(data, FrameMode::Sealed)?;
        if frame.len() < MIN_SEALED_FRAME_LEN - LENGTH_FIELD_SIZE {
            return Err(SealwireError::MalformedFrame(format!(
                "declared length {} too short for a sealed frame",
                frame.len()
            )));
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&frame[..IV_SIZE]);
        Ok(SealedFrame {
            iv,
            payload_len: read_u32(frame, IV_SIZE),
            body: &frame[IV_SIZE + LENGTH_FIELD_SIZE..],
        })
    }
}

/// Fields of a decoded sealed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedFrame<'a> {
    /// Per-frame IV
    pub iv: [u8; IV_SIZE],
    /// Length of the plaintext before padding
    pub payload_len: u32,
    /// Ciphertext followed by the MAC tag
    pub body: &'a [u8],
}

/// Check the minimum size and declared length, returning the bytes after
/// the `total` field.
fn declared_body(data: &[u8], mode: FrameMode) -> Result<&[u8]> {
    if data.len() < mode.min_frame_len() {
        return Err(SealwireError::MalformedFrame(format!(
            "{} frame needs at least {} bytes, got {}",
            mode,
            mode.min_frame_len(),
            data.len()
        )));
    }

    let total = read_u32(data, 0) as usize;
    let available = data.len() - LENGTH_FIELD_SIZE;
    if total > available {
        return Err(SealwireError::MalformedFrame(format!(
            "declared length {} exceeds {} available bytes",
            total, available
        )));
    }
    Ok(&data[LENGTH_FIELD_SIZE..LENGTH_FIELD_SIZE + total])
}

/// Bytes authenticated alongside a sealed body: `iv || payload_len`.
pub fn sealed_header(
    iv: &[u8; IV_SIZE],
    payload_len: u32,
) -> [u8; IV_SIZE + LENGTH_FIELD_SIZE] {
    let mut header = [0u8; IV_SIZE + LENGTH_FIELD_SIZE];
    header[..IV_SIZE].copy_from_slice(iv);
    header[IV_SIZE..].copy_from_slice(&payload_len.to_le_bytes());
    header
}

/// Full frame length announced by a length prefix, if enough bytes are present.
pub fn declared_frame_len(prefix: &[u8]) -> Option<usize> {
    if prefix.len() < LENGTH_FIELD_SIZE {
        return None;
    }
    Some(LENGTH_FIELD_SIZE + read_u32(prefix, 0) as usize)
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn to_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| SealwireError::FrameTooLarge {
        len,
        max: u32::MAX as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_layout() {
        let frame = Frame::Plain { payload: b"\x00hi" };
        let bytes = frame.encode().unwrap();

        assert_eq!(bytes.len(), 11);
        assert_eq!(&bytes[0..4], &7u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &3u32.to_le_bytes());
        assert_eq!(&bytes[8..], b"\x00hi");

        assert_eq!(Frame::decode(&bytes, FrameMode::Plain).unwrap(), frame);
    }

    #[test]
    fn test_sealed_layout() {
        let iv = [0xAA; IV_SIZE];
        let body = [0x55; 48];
        let frame = Frame::Sealed {
            iv,
            payload_len: 9,
            body: &body,
        };
        let bytes = frame.encode().unwrap();

        assert_eq!(bytes.len(), 4 + 16 + 4 + 48);
        assert_eq!(&bytes[0..4], &68u32.to_le_bytes());
        assert_eq!(&bytes[4..20], &iv);
        assert_eq!(&bytes[20..24], &9u32.to_le_bytes());

        assert_eq!(Frame::decode(&bytes, FrameMode::Sealed).unwrap(), frame);
    }

    #[test]
    fn test_empty_plain_frame_is_minimum() {
        let bytes = Frame::Plain { payload: &[] }.encode().unwrap();
        assert_eq!(bytes.len(), MIN_PLAIN_FRAME_LEN);
        assert!(Frame::decode(&bytes, FrameMode::Plain).is_ok());
        assert!(Frame::decode(&bytes[..7], FrameMode::Plain).is_err());
    }

    #[test]
    fn test_declared_length_exceeding_buffer() {
        let mut bytes = Frame::Plain { payload: b"abc" }.encode().unwrap();
        bytes[0..4].copy_from_slice(&100u32.to_le_bytes());
        assert!(matches!(
            Frame::decode(&bytes, FrameMode::Plain),
            Err(SealwireError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_payload_length_exceeding_frame() {
        let mut bytes = Frame::Plain { payload: b"abc" }.encode().unwrap();
        bytes[4..8].copy_from_slice(&50u32.to_le_bytes());
        assert!(Frame::decode(&bytes, FrameMode::Plain).is_err());
    }

    #[test]
    fn test_sealed_minimum_enforced() {
        assert!(Frame::decode(&[0u8; 24], FrameMode::Sealed).is_err());

        let mut bytes = vec![0u8; 25];
        bytes[0..4].copy_from_slice(&21u32.to_le_bytes());
        assert!(Frame::decode(&bytes, FrameMode::Sealed).is_ok());

        bytes[0..4].copy_from_slice(&20u32.to_le_bytes());
        assert!(Frame::decode(&bytes, FrameMode::Sealed).is_err());
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut bytes = Frame::Plain { payload: b"xyz" }.encode().unwrap();
        bytes.extend_from_slice(b"next frame");
        match Frame::decode(&bytes, FrameMode::Plain).unwrap() {
            Frame::Plain { payload } => assert_eq!(payload, b"xyz"),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_typed_decoders() {
        let plain = Frame::Plain { payload: b"\x01zz" };
        let bytes = plain.encode().unwrap();
        assert_eq!(Frame::decode_plain(&bytes).unwrap(), b"\x01zz");
        assert_eq!(Frame::decode(&bytes, FrameMode::Plain).unwrap().mode(), FrameMode::Plain);

        let body = [0x11; 32];
        let sealed = Frame::Sealed {
            iv: [7; IV_SIZE],
            payload_len: 3,
            body: &body,
        };
        let bytes = sealed.encode().unwrap();
        let view = Frame::decode_sealed(&bytes).unwrap();
        assert_eq!(view.iv, [7; IV_SIZE]);
        assert_eq!(view.payload_len, 3);
        assert_eq!(view.body, &body);
        assert_eq!(Frame::decode(&bytes, FrameMode::Sealed).unwrap().mode(), FrameMode::Sealed);

        assert!(Frame::decode_sealed(&bytes[..20]).is_err());
    }

    #[test]
    fn test_declared_frame_len() {
        let bytes = Frame::Plain { payload: b"abcd" }.encode().unwrap();
        assert_eq!(declared_frame_len(&bytes), Some(bytes.len()));
        assert_eq!(declared_frame_len(&bytes[..3]), None);
    }
}
