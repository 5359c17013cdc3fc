use std::fmt;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::SessionError;

use super::tls::insecure_connector;

/// Byte stream an agent session runs over.
pub trait SessionStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> SessionStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

pub type BoxedStream = Box<dyn SessionStream>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opens one connection per call. Shared by every agent of a run.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<BoxedStream, SessionError>;
}

pub struct TcpConnector {
    endpoint: Endpoint,
    tls: Option<tokio_native_tls::TlsConnector>,
}

impl TcpConnector {
    /// Creates a connector for `endpoint`, wrapping every connection in TLS
    /// unless `use_tls` is false.
    ///
    /// # Errors
    ///
    /// Returns an error when the TLS backend cannot be initialised.
    pub fn new(endpoint: Endpoint, use_tls: bool) -> Result<Self, SessionError> {
        let tls = if use_tls {
            Some(insecure_connector()?)
        } else {
            None
        };
        Ok(Self { endpoint, tls })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<BoxedStream, SessionError> {
        let addr = self.endpoint.address();
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| SessionError::Connect {
                addr: addr.clone(),
                source,
            })?;
        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY on {}: {}", addr, err);
        }

        match self.tls.as_ref() {
            Some(tls) => {
                let stream = tls.connect(&self.endpoint.host, stream).await.map_err(|source| {
                    SessionError::TlsHandshake {
                        host: self.endpoint.host.clone(),
                        source,
                    }
                })?;
                Ok(Box::new(stream))
            }
            None => Ok(Box::new(stream)),
        }
    }
}
