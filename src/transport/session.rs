use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::{debug, trace};

use crate::error::SessionError;
use crate::wire::{is_auth_approved, read_message, write_message};

/// Messages read while waiting for auth approval before giving up.
pub const DEFAULT_AUTH_READ_ATTEMPTS: usize = 3;

/// One framed connection to the server.
pub struct Session<S> {
    stream: S,
    max_frame_bytes: Option<usize>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    #[must_use]
    pub const fn new(stream: S, max_frame_bytes: Option<usize>) -> Self {
        Self {
            stream,
            max_frame_bytes,
        }
    }

    /// # Errors
    ///
    /// Returns `Send` when the frame cannot be written.
    pub async fn send(&mut self, body: &str, context: &'static str) -> Result<(), SessionError> {
        write_message(&mut self.stream, body)
            .await
            .map_err(|source| SessionError::Send { context, source })
    }

    /// # Errors
    ///
    /// Returns `Receive` when the next frame cannot be read.
    pub async fn recv(&mut self) -> Result<String, SessionError> {
        read_message(&mut self.stream, self.max_frame_bytes)
            .await
            .map_err(|source| SessionError::Receive { source })
    }

    /// Sends `identity` once, then reads up to `max_reads` messages waiting
    /// for an approved auth result. Everything else is discarded.
    ///
    /// # Errors
    ///
    /// Returns `AuthTimeout` when no approval arrives within the bound, or the
    /// underlying send/receive error.
    pub async fn authenticate(
        &mut self,
        identity: &str,
        max_reads: usize,
    ) -> Result<(), SessionError> {
        self.send(identity, "identity").await?;
        for attempt in 1..=max_reads {
            let message = self.recv().await?;
            if is_auth_approved(&message) {
                debug!("Auth approved after {} message(s)", attempt);
                return Ok(());
            }
            trace!("Discarding pre-auth message {}: {}", attempt, message);
        }
        Err(SessionError::AuthTimeout {
            attempts: max_reads,
        })
    }

    /// Splits into independently owned halves so receiving and sending can
    /// run concurrently.
    pub fn into_split(self) -> (SessionReader<S>, SessionWriter<S>) {
        let (reader, writer) = tokio::io::split(self.stream);
        (
            SessionReader {
                inner: reader,
                max_frame_bytes: self.max_frame_bytes,
            },
            SessionWriter { inner: writer },
        )
    }
}

pub struct SessionReader<S> {
    inner: ReadHalf<S>,
    max_frame_bytes: Option<usize>,
}

impl<S> SessionReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// # Errors
    ///
    /// Returns `Receive` when the next frame cannot be read.
    pub async fn recv(&mut self) -> Result<String, SessionError> {
        read_message(&mut self.inner, self.max_frame_bytes)
            .await
            .map_err(|source| SessionError::Receive { source })
    }
}

pub struct SessionWriter<S> {
    inner: WriteHalf<S>,
}

impl<S> SessionWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// # Errors
    ///
    /// Returns `Send` when the frame cannot be written.
    pub async fn send(&mut self, body: &str, context: &'static str) -> Result<(), SessionError> {
        write_message(&mut self.inner, body)
            .await
            .map_err(|source| SessionError::Send { context, source })
    }

    /// Shuts the write side down. Safe to call on an already broken stream.
    pub async fn close(&mut self) {
        if let Err(err) = self.inner.shutdown().await {
            trace!("Ignoring shutdown error: {}", err);
        }
    }
}
