//! Payload codecs: the compression stage and the frame codec.
//!
//! # Pipeline
//!
//! ```text
//! send:    data ─► CompressionStage::compress ─► [seal] ─► Frame::encode
//! receive: bytes ─► Frame::decode ─► [open] ─► CompressionStage::decompress
//! ```
//!
//! The sealing step lives in [`crate::crypto`]; the connection wires the
//! three together.

mod compression;
mod frame;

pub use compression::{CompressionStage, PayloadTag};
pub use frame::{
    declared_frame_len, sealed_header, Frame, FrameMode, SealedFrame, LENGTH_FIELD_SIZE,
    MIN_PLAIN_FRAME_LEN, MIN_SEALED_FRAME_LEN, PLAIN_HEADER_LEN, SEALED_HEADER_LEN,
};
