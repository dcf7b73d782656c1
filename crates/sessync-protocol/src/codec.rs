//! Codec trait and the JSON implementation.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The synchronizer doesn't care HOW response bodies are serialized; it
//! just needs something that implements the [`Codec`] trait. The session
//! server speaks JSON, so [`JsonCodec`] is the default.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → the synchronizer is shared across tokio tasks, and
///   so is its codec.
/// - `'static` → the codec owns everything it needs; it can live inside
///   long-lived shared state.
///
/// `DeserializeOwned` (vs plain `Deserialize`) means the decoded value
/// doesn't borrow from the input bytes, so the response body can be
/// dropped right after decoding.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use sessync_protocol::{Codec, JsonCodec, ResponseEnvelope};
///
/// let codec = JsonCodec;
/// let body = br#"{"model": {"userid": "acct:alice@example.org", "csrf": "t"}}"#;
///
/// let envelope: ResponseEnvelope = codec.decode(body).unwrap();
/// let model = envelope.model.unwrap();
/// assert_eq!(model.userid.unwrap().as_str(), "acct:alice@example.org");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        // `from_slice` parses the borrowed body without copying it first.
        serde_json::from_slice(data).map_err(ProtocolError::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Credentials, ResponseEnvelope};

    #[test]
    fn test_decode_non_json_body_returns_decode_error() {
        // Gateways answer timeouts with HTML, not JSON.
        let result: Result<ResponseEnvelope, _> =
            JsonCodec.decode(b"<html>Gateway Timeout</html>");

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_empty_body_returns_decode_error() {
        let result: Result<ResponseEnvelope, _> = JsonCodec.decode(b"");

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_credentials_produces_json_object() {
        let creds = Credentials::new("alice", "s3cret");

        let bytes = JsonCodec.encode(&creds).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["username"], "alice");
        assert_eq!(json["password"], "s3cret");
    }
}
