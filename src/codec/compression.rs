//! Tagged gzip compression for frame payloads.
//!
//! Every payload is prefixed with one tag byte:
//!
//! | Tag | Body                  |
//! |-----|-----------------------|
//! | `0` | raw input, verbatim   |
//! | `1` | gzip stream (flate2)  |
//!
//! The gzip form is only emitted when it is strictly shorter than the input,
//! so a tagged payload is never longer than `input.len() + 1`.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::config::CompressionConfig;
use crate::error::{Result, SealwireError};

/// Payload representation marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadTag {
    /// Body is the original bytes
    Raw = 0,
    /// Body is a gzip stream
    Gzip = 1,
}

impl PayloadTag {
    /// Wire value
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Parse a wire value
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Raw),
            1 => Some(Self::Gzip),
            _ => None,
        }
    }
}

/// Size-aware gzip stage
#[derive(Debug, Clone)]
pub struct CompressionStage {
    level: u32,
    max_decompressed_len: usize,
}

impl Default for CompressionStage {
    fn default() -> Self {
        Self::new(&CompressionConfig::default())
    }
}

impl CompressionStage {
    /// Create a stage from configuration
    pub fn new(config: &CompressionConfig) -> Self {
        Self {
            level: config.level.min(9),
            max_decompressed_len: config.max_decompressed_len,
        }
    }

    /// Compress `data`, falling back to the raw form when gzip does not help.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| SealwireError::Compression(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| SealwireError::Compression(e.to_string()))?;

        let (tag, body) = if compressed.len() < data.len() {
            (PayloadTag::Gzip, compressed.as_slice())
        } else {
            (PayloadTag::Raw, data)
        };

        let mut tagged = Vec::with_capacity(body.len() + 1);
        tagged.push(tag.as_byte());
        tagged.extend_from_slice(body);
        Ok(tagged)
    }

    /// Reverse [`compress`](Self::compress).
    pub fn decompress(&self, tagged: &[u8]) -> Result<Vec<u8>> {
        let (&tag_byte, body) = tagged
            .split_first()
            .ok_or_else(|| SealwireError::Decompression("empty payload".to_string()))?;

        match PayloadTag::from_byte(tag_byte) {
            Some(PayloadTag::Raw) => Ok(body.to_vec()),
            Some(PayloadTag::Gzip) => self.gunzip(body),
            None => Err(SealwireError::Decompression(format!(
                "unknown payload tag {tag_byte}"
            ))),
        }
    }

    fn gunzip(&self, body: &[u8]) -> Result<Vec<u8>> {
        let limit = self.max_decompressed_len as u64;
        let mut decoder = GzDecoder::new(body).take(limit.saturating_add(1));
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| SealwireError::Decompression(e.to_string()))?;

        if out.len() as u64 > limit {
            return Err(SealwireError::Decompression(format!(
                "decompressed payload exceeds {} bytes",
                self.max_decompressed_len
            )));
        }
        Ok(out)
    }
}
