use thiserror::Error;

use super::WireError;

/// Coarse failure class reported for an agent that stopped on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Connect,
    AuthTimeout,
    TruncatedStream,
    MissingAck,
    SendFailure,
    Transport,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FailureKind::Connect => "connect",
            FailureKind::AuthTimeout => "auth-timeout",
            FailureKind::TruncatedStream => "truncated-stream",
            FailureKind::MissingAck => "missing-ack",
            FailureKind::SendFailure => "send-failure",
            FailureKind::Transport => "transport",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Connection error to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to build TLS connector: {source}")]
    TlsSetup {
        #[source]
        source: native_tls::Error,
    },
    #[error("TLS handshake with {host} failed: {source}")]
    TlsHandshake {
        host: String,
        #[source]
        source: native_tls::Error,
    },
    #[error("No auth approval within {attempts} messages.")]
    AuthTimeout { attempts: usize },
    #[error("No confirm within {attempts} messages after batch {confirmation_id}.")]
    MissingAck {
        attempts: usize,
        confirmation_id: u64,
    },
    #[error("Failed to send {context}: {source}")]
    Send {
        context: &'static str,
        #[source]
        source: WireError,
    },
    #[error("Failed to receive message: {source}")]
    Receive {
        #[source]
        source: WireError,
    },
    #[error("Batch {confirmation_id} armed while an earlier batch is unconfirmed.")]
    BatchInFlight { confirmation_id: u64 },
}

impl SessionError {
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            SessionError::Connect { .. }
            | SessionError::TlsSetup { .. }
            | SessionError::TlsHandshake { .. } => FailureKind::Connect,
            SessionError::AuthTimeout { .. } => FailureKind::AuthTimeout,
            SessionError::MissingAck { .. } => FailureKind::MissingAck,
            SessionError::Send { .. } | SessionError::BatchInFlight { .. } => {
                FailureKind::SendFailure
            }
            SessionError::Receive {
                source: WireError::TruncatedStream { .. },
            } => FailureKind::TruncatedStream,
            SessionError::Receive { .. } => FailureKind::Transport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};

    #[test]
    fn truncated_receive_maps_to_truncated_kind() -> AppResult<()> {
        let err = SessionError::Receive {
            source: WireError::TruncatedStream {
                expected: 10,
                received: 2,
            },
        };
        if err.kind() != FailureKind::TruncatedStream {
            return Err(AppError::validation(format!(
                "Unexpected kind: {}",
                err.kind()
            )));
        }
        let closed = SessionError::Receive {
            source: WireError::ConnectionClosed,
        };
        if closed.kind() != FailureKind::Transport {
            return Err(AppError::validation("Expected clean close to be transport"));
        }
        Ok(())
    }

    #[test]
    fn connect_failures_share_kind() -> AppResult<()> {
        let err = SessionError::Connect {
            addr: "127.0.0.1:1".to_owned(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        if err.kind() != FailureKind::Connect {
            return Err(AppError::validation("Expected connect kind"));
        }
        Ok(())
    }
}
