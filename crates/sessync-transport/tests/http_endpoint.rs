//! Integration tests for the HTTP session endpoint.
//!
//! These tests spin up a tiny one-shot HTTP server on a local port and
//! point a real `HttpEndpoint` at it, so request headers and response
//! handling are checked over an actual socket.

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use sessync_transport::{
        HttpEndpoint, SessionEndpoint, SessionRequest, TransportError,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one request with `response`, returning the raw
    /// request head it received.
    async fn serve_once(response: String) -> (String, tokio::task::JoinHandle<String>) {
        // Port 0 lets the OS pick a free port.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            // Read until the end of the headers; the test requests have no body
            // worth inspecting beyond what arrives with them.
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        });

        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_load_sends_headers_and_reads_body() {
        let body = r#"{"model":{"userid":null,"csrf":"abc"}}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nX-XSRF-TOKEN: rotated\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let (url, server) = serve_once(response).await;
        let endpoint = HttpEndpoint::new(&url, Duration::from_secs(5)).unwrap();

        let raw = endpoint
            .send(SessionRequest::load(Some("tok".into())))
            .await
            .expect("should get a response");

        assert_eq!(raw.status, 200);
        assert_eq!(raw.body, body.as_bytes());
        assert_eq!(raw.xsrf_token.as_deref(), Some("rotated"));

        let head = server.await.unwrap().to_lowercase();
        assert!(head.starts_with("get /app http/1.1"), "got: {head}");
        assert!(head.contains("x-xsrf-token: tok"));
        assert!(head.contains("accept: application/json"));
    }

    #[tokio::test]
    async fn test_gateway_error_is_returned_as_status_not_error() {
        let (url, server) = serve_once(
            "HTTP/1.1 504 Gateway Timeout\r\nContent-Length: 7\r\nConnection: close\r\n\r\ntimeout"
                .to_string(),
        )
        .await;
        let endpoint = HttpEndpoint::new(&url, Duration::from_secs(5)).unwrap();

        let raw = endpoint
            .send(SessionRequest::logout(None))
            .await
            .expect("a 504 is still a response");

        assert_eq!(raw.status, 504);
        assert!(!raw.is_success());
        assert_eq!(raw.body, b"timeout");

        let head = server.await.unwrap().to_lowercase();
        assert!(head.starts_with("post /app?__formid__=logout"), "got: {head}");
    }

    #[tokio::test]
    async fn test_refused_connection_returns_network_error() {
        // Bind then drop to find a port nobody is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint =
            HttpEndpoint::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();

        let result = endpoint.send(SessionRequest::load(None)).await;

        assert!(
            matches!(result, Err(TransportError::Network(_))),
            "expected network error, got {result:?}"
        );
    }
}
