//! Agent connections: TCP with optional TLS, the auth handshake, and framed
//! send/receive on top of the wire codec.
mod connector;
mod session;
mod tls;

pub use connector::{BoxedStream, Connector, Endpoint, SessionStream, TcpConnector};
pub use session::{DEFAULT_AUTH_READ_ATTEMPTS, Session, SessionReader, SessionWriter};
