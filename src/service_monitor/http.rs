//! HTTP probe: GET the url, compare the status, optionally match the body.
use regex::Regex;
use reqwest::Client;
use tracing::{error, info};

use super::error::CheckError;
use super::models::HttpTarget;

pub const REQUEST_FAILED: &str = "request failed";
pub const CONTENT_MISMATCH: &str = "response content mismatch";

/// Runs one HTTP check with `client`, whose timeout bounds the whole exchange.
///
/// The response is owned by this function, so its body is released on every
/// return path whether or not it was read.
pub async fn check(client: &Client, target: &HttpTarget) -> Result<(), CheckError> {
    let response = client.get(&target.url).send().await.map_err(|e| {
        error!(monitor = %target.name, url = %target.url, error = %e, "HTTP request failed.");
        CheckError::Connection(REQUEST_FAILED.to_string())
    })?;

    let expected = target.expected_status();
    let status = response.status().as_u16();
    if status != expected {
        error!(
            monitor = %target.name,
            url = %target.url,
            expected,
            status,
            "HTTP status code mismatch."
        );
        return Err(CheckError::Validation(format!(
            "unexpected status code: expected {expected}, got {status}"
        )));
    }

    if let Some(pattern) = target.content_pattern() {
        let matcher = Regex::new(pattern).map_err(|e| {
            error!(monitor = %target.name, pattern, error = %e, "Invalid content_match pattern.");
            CheckError::Validation(format!("invalid content_match pattern: {e}"))
        })?;

        let body = response.text().await.map_err(|e| {
            error!(
                monitor = %target.name,
                url = %target.url,
                error = %e,
                "Failed to read response body."
            );
            CheckError::Validation(format!("failed to read response body: {e}"))
        })?;

        if !matcher.is_match(&body) {
            error!(
                monitor = %target.name,
                url = %target.url,
                pattern,
                "HTTP response content mismatch."
            );
            return Err(CheckError::Validation(CONTENT_MISMATCH.to_string()));
        }
    }

    info!(monitor = %target.name, url = %target.url, status, "HTTP check succeeded.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap()
    }

    fn target(url: String) -> HttpTarget {
        HttpTarget {
            name: "api".to_string(),
            url,
            ..Default::default()
        }
    }

    async fn server_with(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_default_expectation_is_200() {
        let server = server_with(200, "").await;
        let result = check(&client(), &target(format!("{}/health", server.uri()))).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_status_mismatch_is_validation_failure() {
        let server = server_with(503, "").await;
        let result = check(&client(), &target(format!("{}/health", server.uri()))).await;
        assert_eq!(
            result,
            Err(CheckError::Validation(
                "unexpected status code: expected 200, got 503".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_configured_status_is_honoured() {
        let server = server_with(404, "").await;
        let mut t = target(format!("{}/health", server.uri()));
        t.status_code = Some(404);
        assert_eq!(check(&client(), &t).await, Ok(()));
    }

    #[tokio::test]
    async fn test_content_match_success_and_mismatch() {
        let healthy = server_with(200, "SERVICE OK").await;
        let mut t = target(format!("{}/health", healthy.uri()));
        t.content_match = "OK".to_string();
        assert_eq!(check(&client(), &t).await, Ok(()));

        let down = server_with(200, "DOWN").await;
        t.url = format!("{}/health", down.uri());
        assert_eq!(
            check(&client(), &t).await,
            Err(CheckError::Validation(CONTENT_MISMATCH.to_string()))
        );
    }

    #[tokio::test]
    async fn test_malformed_pattern_is_reported() {
        let server = server_with(200, "SERVICE OK").await;
        let mut t = target(format!("{}/health", server.uri()));
        t.content_match = "(unclosed".to_string();
        let err = check(&client(), &t).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.detail().starts_with("invalid content_match pattern"));
    }

    #[tokio::test]
    async fn test_unreachable_url_is_connection_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = check(&client(), &target(format!("http://{addr}/health"))).await;
        assert_eq!(result, Err(CheckError::Connection(REQUEST_FAILED.to_string())));
    }

    /// Serves one response that promises 100 body bytes, sends 5, then hangs up.
    async fn truncated_body_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nOK OK")
                .await
                .unwrap();
        });
        format!("http://{addr}/health")
    }

    #[tokio::test]
    async fn test_truncated_body_fails_without_matching() {
        let mut t = target(truncated_body_server().await);
        t.content_match = "OK".to_string();

        let err = check(&client(), &t).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(
            err.detail().starts_with("failed to read response body"),
            "got {err:?}"
        );
    }
}
