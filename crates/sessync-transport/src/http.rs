//! HTTP session endpoint implementation using `reqwest`.

use std::time::Duration;

use reqwest::Url;
use reqwest::header::HeaderMap;

use crate::{
    CSRF_RESPONSE_HEADER, Method, RawResponse, SessionEndpoint, SessionRequest, TransportError,
    XSRF_HEADER,
};

/// An [`SessionEndpoint`] that talks to the session server over HTTP.
///
/// Keeps a cookie jar so the server's session cookie survives between
/// requests, the same way a browser would.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: reqwest::Client,
    base: Url,
}

impl HttpEndpoint {
    /// Creates an endpoint rooted at `service_url`.
    ///
    /// # Errors
    /// - [`TransportError::InvalidUrl`]: `service_url` doesn't parse
    /// - [`TransportError::Network`]: the HTTP client couldn't be built
    pub fn new(service_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        // `Url::join` replaces the last path segment unless the base ends
        // with a slash, so `https://host/api` would lose `api`.
        let mut normalized = service_url.to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base =
            Url::parse(&normalized).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self { client, base })
    }

    /// The service URL all request paths are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

impl SessionEndpoint for HttpEndpoint {
    async fn send(&self, request: SessionRequest) -> Result<RawResponse, TransportError> {
        let url = self
            .base
            .join(&request.path_and_query())
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        tracing::debug!(operation = %request.operation, %url, "sending session request");

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let xsrf_token = rotated_token(response.headers());
        let body = response.bytes().await.map_err(classify)?.to_vec();

        tracing::debug!(operation = %request.operation, status, "session response received");

        Ok(RawResponse {
            status,
            body,
            xsrf_token,
        })
    }
}

fn rotated_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(XSRF_HEADER)
        .or_else(|| headers.get(CSRF_RESPONSE_HEADER))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}
