//! Unified error type for the Sessync synchronizer.

use sessync_protocol::ProtocolError;
use sessync_session::SessionError;
use sessync_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The public synchronizer operations never return it: a failed load or
/// login is logged, handed to error telemetry, and answered with the
/// current session. It exists so the internal fetch path can use `?`,
/// and so telemetry gets one concrete error type.
///
/// `Clone` because one failed load is shared by every caller waiting
/// on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    /// The request never got a usable HTTP response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response body could not be read as a session envelope.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A profile could not be fetched or merged.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The settings could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: SyncError = TransportError::Status(504).into();
        assert!(matches!(err, SyncError::Transport(_)));
        assert!(err.to_string().contains("504"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: SyncError = ProtocolError::Decode("expected value".into()).into();
        assert!(matches!(err, SyncError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err: SyncError = SessionError::ProfileUnavailable("publisher.org".into()).into();
        assert!(matches!(err, SyncError::Session(_)));
        assert!(err.to_string().contains("publisher.org"));
    }
}
