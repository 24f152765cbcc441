//! Framed message transport.
//!
//! Every connection in the cluster carries length-delimited frames, each
//! frame holding one bincode-serialized message. A connection is used for
//! exactly one request/reply exchange and closed afterwards.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::protocol::ProtocolError;

/// A bidirectional frame transport over some byte stream.
pub type MessageFrames<S> = Framed<S, LengthDelimitedCodec>;

/// Wrap a byte stream in the cluster's frame transport.
pub fn frames<S: AsyncRead + AsyncWrite + Unpin>(stream: S) -> MessageFrames<S> {
    Framed::new(stream, LengthDelimitedCodec::new())
}

/// Serialize one message and send it as a single frame.
///
/// The frame is fully flushed before this returns, so a caller that sends
/// and then receives never holds an unwritten request while waiting for the
/// reply.
pub async fn send_message<S, M>(frames: &mut MessageFrames<S>, message: &M) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    M: Serialize,
{
    let payload = bincode::serialize(message).map_err(ProtocolError::Encode)?;
    frames.send(Bytes::from(payload)).await?;
    Ok(())
}

/// Receive one frame and decode it as a message.
///
/// A connection closed before a frame arrives yields
/// [`ProtocolError::ConnectionClosed`]; a malformed frame yields
/// [`ProtocolError::Decode`].
pub async fn recv_message<S, M>(frames: &mut MessageFrames<S>) -> Result<M, ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    M: DeserializeOwned,
{
    let frame = match frames.next().await {
        Some(frame) => frame?,
        None => return Err(ProtocolError::ConnectionClosed),
    };
    bincode::deserialize(&frame).map_err(ProtocolError::Decode)
}
