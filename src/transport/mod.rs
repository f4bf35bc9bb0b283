//! Async stream helpers for [`SecureConnection`].
//!
//! The connection itself only transforms bytes. These helpers move those
//! bytes over any `AsyncRead + AsyncWrite` stream the connection owns.
//!
//! # Handshake
//!
//! ```text
//! initiator                                 responder
//!     │  [len: u32 LE][offer]                   │
//!     │ ──────────────────────────────────────> │ accept_offer
//!     │  [len: u32 LE][response]                │
//!     │ <────────────────────────────────────── │
//! finalize_offer                                │
//! ```
//!
//! Handshake blobs are bounded by `max_handshake_len` and the whole
//! exchange by `handshake_timeout_secs`.
//!
//! # Messages
//!
//! After the handshake each message is exactly one frame. Frames are
//! self-delimiting through their leading length field, so [`send`] writes the
//! frame as-is and [`recv`] reads the length first, then the rest.
//!
//! [`send`]: SecureConnection::send
//! [`recv`]: SecureConnection::recv

mod tcp;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::{declared_frame_len, LENGTH_FIELD_SIZE};
use crate::connection::SecureConnection;
use crate::crypto::KeyAgreement;
use crate::error::{Result, SealwireError};

impl<S, A> SecureConnection<S, A>
where
    S: AsyncRead + AsyncWrite + Unpin,
    A: KeyAgreement + Default,
{
    /// Run the initiator side of the handshake over the owned stream.
    pub async fn initiate_handshake(&mut self) -> Result<()> {
        let deadline = self.transport_config().handshake_timeout();
        let max = self.transport_config().max_handshake_len;

        let exchange = async {
            let offer = self.create_offer()?;
            write_blob(self.stream_mut(), &offer).await?;

            let response = read_blob(self.stream_mut(), max).await?;
            if !self.finalize_offer(&response)? {
                return Err(SealwireError::Protocol(
                    "peer sent an unusable key response".to_string(),
                ));
            }
            Ok::<(), SealwireError>(())
        };

        tokio::time::timeout(deadline, exchange)
            .await
            .map_err(|_| SealwireError::Timeout(format!("handshake after {:?}", deadline)))?
    }

    /// Run the responder side of the handshake over the owned stream.
    pub async fn respond_handshake(&mut self) -> Result<()> {
        let deadline = self.transport_config().handshake_timeout();
        let max = self.transport_config().max_handshake_len;

        let exchange = async {
            let offer: Vec<u8> = read_blob(self.stream_mut(), max).await?;
            let Some(response) = self.accept_offer(&offer)? else {
                return Err(SealwireError::Protocol(
                    "peer sent an unusable key offer".to_string(),
                ));
            };
            write_blob(self.stream_mut(), &response).await
        };

        tokio::time::timeout(deadline, exchange)
            .await
            .map_err(|_| SealwireError::Timeout(format!("handshake after {:?}", deadline)))?
    }

    /// Encrypt `data` and write it as one frame.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.is_key_established() {
            return Err(SealwireError::NegotiationIncomplete);
        }

        let frame = self.encrypt(data)?;
        let max = self.transport_config().max_frame_len;
        if frame.len() > max {
            return Err(SealwireError::FrameTooLarge {
                len: frame.len(),
                max,
            });
        }

        let stream = self.stream_mut();
        stream.write_all(&frame).await?;
        stream.flush().await?;
        tracing::trace!(connection = self.id(), len = frame.len(), "frame sent");
        Ok(())
    }

    /// Read and decrypt one frame.
    ///
    /// Returns `Ok(None)` if the peer closed the stream cleanly between
    /// frames. A stream that ends mid-frame is an I/O error.
    pub async fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        if !self.is_key_established() {
            return Err(SealwireError::NegotiationIncomplete);
        }

        let mut prefix = [0u8; LENGTH_FIELD_SIZE];
        if !read_prefix(self.stream_mut(), &mut prefix).await? {
            tracing::debug!(connection = self.id(), "peer closed stream");
            return Ok(None);
        }

        let len = declared_frame_len(&prefix).unwrap_or(LENGTH_FIELD_SIZE);
        let max = self.transport_config().max_frame_len;
        if len > max {
            return Err(SealwireError::FrameTooLarge { len, max });
        }

        let mut frame = vec![0u8; len];
        frame[..LENGTH_FIELD_SIZE].copy_from_slice(&prefix);
        self.stream_mut()
            .read_exact(&mut frame[LENGTH_FIELD_SIZE..])
            .await?;

        tracing::trace!(connection = self.id(), len, "frame received");
        self.try_decrypt(&frame).map(Some)
    }
}

/// Fill `buf`, returning `false` on EOF before the first byte.
async fn read_prefix<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream closed inside a length prefix",
            )
            .into());
        }
        filled += n;
    }
    Ok(true)
}

async fn write_blob<W: AsyncWrite + Unpin>(writer: &mut W, blob: &[u8]) -> Result<()> {
    let len = u32::try_from(blob.len()).map_err(|_| SealwireError::FrameTooLarge {
        len: blob.len(),
        max: u32::MAX as usize,
    })?;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(blob).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_blob<R: AsyncRead + Unpin>(reader: &mut R, max: usize) -> Result<Vec<u8>> {
    let mut prefix = [0u8; LENGTH_FIELD_SIZE];
    reader.read_exact(&mut prefix).await?;

    let len = u32::from_le_bytes(prefix) as usize;
    if len > max {
        return Err(SealwireError::FrameTooLarge { len, max });
    }

    let mut blob = vec![0u8; len];
    reader.read_exact(&mut blob).await?;
    Ok(blob)
}
