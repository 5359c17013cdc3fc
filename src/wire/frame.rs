use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::WireError;

pub const LENGTH_PREFIX_BYTES: usize = 4;
/// Frame ceiling applied by sessions unless configured otherwise.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Prefixes `body` with its big-endian `u32` byte length.
///
/// # Errors
///
/// Returns `BodyTooLong` when the body does not fit the length prefix.
pub fn encode_message(body: &str) -> Result<Vec<u8>, WireError> {
    let Ok(len) = u32::try_from(body.len()) else {
        return Err(WireError::BodyTooLong { len: body.len() });
    };
    let mut frame = Vec::with_capacity(LENGTH_PREFIX_BYTES.saturating_add(body.len()));
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(body.as_bytes());
    Ok(frame)
}

/// Decodes the first frame in `bytes`, returning the body and the number of
/// bytes consumed.
///
/// # Errors
///
/// Returns `ConnectionClosed` for an empty buffer, `TruncatedStream` when the
/// buffer ends inside the frame, `FrameTooLarge` when the declared length
/// exceeds `max_bytes`, and `InvalidUtf8` for non-text bodies.
pub fn decode_frame(bytes: &[u8], max_bytes: Option<usize>) -> Result<(String, usize), WireError> {
    if bytes.is_empty() {
        return Err(WireError::ConnectionClosed);
    }
    let Some(prefix) = bytes.get(..LENGTH_PREFIX_BYTES) else {
        return Err(WireError::TruncatedStream {
            expected: LENGTH_PREFIX_BYTES,
            received: bytes.len(),
        });
    };
    let len = declared_len(prefix, max_bytes)?;
    let end = LENGTH_PREFIX_BYTES.saturating_add(len);
    let Some(body) = bytes.get(LENGTH_PREFIX_BYTES..end) else {
        return Err(WireError::TruncatedStream {
            expected: len,
            received: bytes.len().saturating_sub(LENGTH_PREFIX_BYTES),
        });
    };
    let text = String::from_utf8(body.to_vec())
        .map_err(|source| WireError::InvalidUtf8 { source })?;
    Ok((text, end))
}

/// Reads exactly one frame from `reader`.
///
/// # Errors
///
/// Returns `ConnectionClosed` when the peer closes before any length byte,
/// `TruncatedStream` when it closes mid-frame, `FrameTooLarge` when the
/// declared length exceeds `max_bytes`, and `InvalidUtf8` or `Io` otherwise.
pub async fn read_message<R>(reader: &mut R, max_bytes: Option<usize>) -> Result<String, WireError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut prefix = [0u8; LENGTH_PREFIX_BYTES];
    let received = read_full(reader, &mut prefix, "read length prefix").await?;
    if received == 0 {
        return Err(WireError::ConnectionClosed);
    }
    if received < LENGTH_PREFIX_BYTES {
        return Err(WireError::TruncatedStream {
            expected: LENGTH_PREFIX_BYTES,
            received,
        });
    }

    let len = declared_len(&prefix, max_bytes)?;
    let mut body = vec![0u8; len];
    let received = read_full(reader, &mut body, "read message body").await?;
    if received < len {
        return Err(WireError::TruncatedStream {
            expected: len,
            received,
        });
    }
    String::from_utf8(body).map_err(|source| WireError::InvalidUtf8 { source })
}

/// Writes one frame and flushes.
///
/// # Errors
///
/// Returns an error when the body cannot be framed or the write fails.
pub async fn write_message<W>(writer: &mut W, body: &str) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = encode_message(body)?;
    writer
        .write_all(&frame)
        .await
        .map_err(|source| WireError::Io {
            context: "write message",
            source,
        })?;
    writer.flush().await.map_err(|source| WireError::Io {
        context: "flush message",
        source,
    })
}

fn declared_len(prefix: &[u8], max_bytes: Option<usize>) -> Result<usize, WireError> {
    let mut raw = [0u8; LENGTH_PREFIX_BYTES];
    raw.copy_from_slice(prefix);
    let declared = u32::from_be_bytes(raw);
    let Ok(len) = usize::try_from(declared) else {
        return Err(WireError::FrameTooLarge {
            len: usize::MAX,
            max_bytes: max_bytes.unwrap_or(usize::MAX),
        });
    };
    if let Some(max_bytes) = max_bytes
        && len > max_bytes
    {
        return Err(WireError::FrameTooLarge { len, max_bytes });
    }
    Ok(len)
}

// Unlike `read_exact`, reports how far the read got before EOF.
async fn read_full<R>(
    reader: &mut R,
    buf: &mut [u8],
    context: &'static str,
) -> Result<usize, WireError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0usize;
    while let Some(rest) = buf.get_mut(filled..) {
        if rest.is_empty() {
            break;
        }
        let read = reader
            .read(rest)
            .await
            .map_err(|source| WireError::Io { context, source })?;
        if read == 0 {
            break;
        }
        filled = filled.saturating_add(read);
    }
    Ok(filled)
}
