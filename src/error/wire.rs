use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("Message body of {len} bytes does not fit a 4-byte length prefix.")]
    BodyTooLong { len: usize },
    #[error("Frame of {len} bytes exceeds max size ({max_bytes} bytes).")]
    FrameTooLarge { len: usize, max_bytes: usize },
    #[error("Connection closed.")]
    ConnectionClosed,
    #[error("Stream truncated: expected {expected} bytes, received {received}.")]
    TruncatedStream { expected: usize, received: usize },
    #[error("Message was not valid UTF-8: {source}")]
    InvalidUtf8 {
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize {context}: {source}")]
    Serialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
}
