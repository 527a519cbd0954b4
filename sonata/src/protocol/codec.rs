//! Length-prefixed framing.
//!
//! One frame is a 4-byte big-endian length followed by the JSON envelope.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use super::error::ProtocolError;

/// Default upper bound on a single frame (8 MiB).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// Wrap an I/O stream in the control-plane frame codec.
pub fn framed<S>(stream: S, max_frame_length: usize) -> Framed<S, LengthDelimitedCodec>
where
    S: AsyncRead + AsyncWrite,
{
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(max_frame_length)
        .new_codec();
    Framed::new(stream, codec)
}

/// Write one frame and flush it.
pub async fn write_frame<S>(
    framed: &mut Framed<S, LengthDelimitedCodec>,
    frame: Bytes,
) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    framed.send(frame).await?;
    Ok(())
}

/// Read one frame.
///
/// Returns [`ProtocolError::Closed`] if the peer disconnects first.
pub async fn read_frame<S>(
    framed: &mut Framed<S, LengthDelimitedCodec>,
) -> Result<Bytes, ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match framed.next().await {
        Some(Ok(frame)) => Ok(frame.freeze()),
        Some(Err(e)) => Err(ProtocolError::Io(e)),
        None => Err(ProtocolError::Closed),
    }
}
