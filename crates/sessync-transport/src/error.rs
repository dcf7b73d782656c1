/// Errors that can occur in the transport layer.
///
/// `Clone` because a single failed read is handed to every caller that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request never produced an HTTP response (DNS, refused
    /// connection, reset, TLS failure...).
    #[error("request failed: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("server responded with status {0}")]
    Status(u16),

    /// The service URL or a request path could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}
