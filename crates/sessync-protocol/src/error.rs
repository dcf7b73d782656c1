//! Error types for the protocol layer.
//!
//! Each crate in Sessync defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in reading or merging a
//! record, not in the network or in the listeners.

/// Errors that can occur in the protocol layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    ///
    /// Stored as a string so the error stays `Clone`; shared read
    /// results hand the same error to every waiting caller.
    #[error("encode failed: {0}")]
    Encode(String),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: an HTML error page from a gateway, a truncated
    /// body, or a field with the wrong JSON type.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The record is well-formed JSON but not the shape we expect,
    /// e.g. a snapshot that serializes to something other than an object.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl ProtocolError {
    pub(crate) fn encode(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }

    pub(crate) fn decode(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
