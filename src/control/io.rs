use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{AppError, AppResult, ProtocolError, TransportError};

pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

// One byte past the cap is enough to tell an oversized frame apart.
const FRAME_READ_LIMIT: u64 = (MAX_FRAME_BYTES as u64).saturating_add(1);

/// Reads one newline-terminated frame, without the terminator.
///
/// # Errors
///
/// Returns an error if the peer closed the connection, the read failed, or
/// the frame exceeded [`MAX_FRAME_BYTES`].
pub async fn read_frame<R>(reader: &mut R) -> AppResult<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    let mut limited = (&mut *reader).take(FRAME_READ_LIMIT);
    let bytes = limited.read_until(b'\n', &mut buffer).await.map_err(|err| {
        AppError::transport(TransportError::Io {
            context: "read control frame",
            source: err,
        })
    })?;
    if bytes == 0 {
        return Err(AppError::transport(TransportError::ConnectionClosed));
    }
    if buffer.len() > MAX_FRAME_BYTES {
        return Err(AppError::protocol(ProtocolError::FrameTooLarge {
            max_bytes: MAX_FRAME_BYTES,
        }));
    }
    if buffer.ends_with(b"\n") {
        buffer.pop();
        if buffer.ends_with(b"\r") {
            buffer.pop();
        }
    }
    Ok(buffer)
}

/// Writes one frame followed by a newline.
///
/// # Errors
///
/// Returns an error if the write fails.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = Vec::with_capacity(frame.len().saturating_add(1));
    payload.extend_from_slice(frame);
    payload.push(b'\n');
    writer.write_all(&payload).await.map_err(|err| {
        AppError::transport(TransportError::Io {
            context: "write control frame",
            source: err,
        })
    })?;
    writer.flush().await.map_err(|err| {
        AppError::transport(TransportError::Io {
            context: "flush control frame",
            source: err,
        })
    })
}

/// # Errors
///
/// Returns an error if the frame cannot be read or is not valid JSON for `T`.
pub async fn read_json<R, T>(reader: &mut R, context: &'static str) -> AppResult<T>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let frame = read_frame(reader).await?;
    serde_json::from_slice(&frame).map_err(|err| {
        AppError::protocol(ProtocolError::Deserialize {
            context,
            source: err,
        })
    })
}

/// # Errors
///
/// Returns an error if the value cannot be serialized or written.
pub async fn write_json<W, T>(writer: &mut W, value: &T, context: &'static str) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = serde_json::to_vec(value).map_err(|err| {
        AppError::protocol(ProtocolError::Serialize {
            context,
            source: err,
        })
    })?;
    write_frame(writer, &frame).await
}
