//! Session endpoint abstraction for Sessync.
//!
//! Provides the [`SessionEndpoint`] trait that hides how a
//! [`SessionRequest`] reaches the server, and the typed request builders
//! for each session operation.
//!
//! # Feature Flags
//!
//! - `http` (default): HTTP endpoint via `reqwest`

mod error;
#[cfg(feature = "http")]
mod http;
mod request;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::HttpEndpoint;
pub use request::{
    CSRF_RESPONSE_HEADER, FORM_ID_PARAM, Method, Operation, SessionRequest, XSRF_HEADER,
};

use std::future::Future;
use std::sync::Arc;

/// What came back from the server, before any decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body. May be empty or non-JSON on gateway errors.
    pub body: Vec<u8>,
    /// A rotated anti-forgery token, if the response carried one.
    pub xsrf_token: Option<String>,
}

impl RawResponse {
    /// A 200 response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            xsrf_token: None,
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends session requests to the server.
///
/// The returned future must be `Send`: in-flight reads are shared
/// between callers that may live on different tokio worker threads.
///
/// A non-2xx status is NOT an error at this level; it comes back as a
/// [`RawResponse`] and the caller decides. `Err` means no response at all.
pub trait SessionEndpoint: Send + Sync + 'static {
    /// Sends one request and returns the raw response.
    fn send(
        &self,
        request: SessionRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

impl<E: SessionEndpoint> SessionEndpoint for Arc<E> {
    fn send(
        &self,
        request: SessionRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_response_is_success_for_2xx_only() {
        assert!(RawResponse::ok("{}").is_success());
        assert!(RawResponse { status: 204, body: vec![], xsrf_token: None }.is_success());
        assert!(!RawResponse { status: 504, body: vec![], xsrf_token: None }.is_success());
        assert!(!RawResponse { status: 302, body: vec![], xsrf_token: None }.is_success());
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(
            TransportError::Status(504).to_string(),
            "server responded with status 504"
        );
        assert_eq!(TransportError::Timeout.to_string(), "request timed out");
    }
}
