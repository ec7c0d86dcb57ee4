use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, error, info};

use super::error::CheckError;
use super::models::{TcpTarget, parse_port};

pub const CONNECTION_ERROR: &str = "connection error";

/// Bare TCP dial; nothing is written. The stream is shut down as soon as the
/// connect succeeds.
pub async fn check(target: &TcpTarget, timeout: Duration) -> Result<(), CheckError> {
    let port = parse_port(&target.port)?;

    let mut stream = dial(&target.host, port, timeout).await.map_err(|detail| {
        error!(
            monitor = %target.name,
            host = %target.host,
            port,
            error = %detail,
            "TCP connect failed."
        );
        CheckError::Connection(CONNECTION_ERROR.to_string())
    })?;

    if let Err(e) = stream.shutdown().await {
        // The connect already proved reachability.
        debug!(monitor = %target.name, error = %e, "TCP shutdown after probe failed.");
    }

    info!(monitor = %target.name, host = %target.host, port, "TCP connect succeeded.");
    Ok(())
}

/// Connects within `timeout`, flattening refusal and expiry into one message.
async fn dial(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, String> {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("connect timed out after {}ms", timeout.as_millis())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn target(port: u16) -> TcpTarget {
        TcpTarget {
            name: "svc".to_string(),
            host: "127.0.0.1".to_string(),
            port: port.to_string(),
        }
    }

    #[tokio::test]
    async fn test_listening_port_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = check(&target(port), Duration::from_secs(2)).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_closed_port_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = check(&target(port), Duration::from_secs(2)).await;
        assert_eq!(
            result,
            Err(CheckError::Connection(CONNECTION_ERROR.to_string()))
        );
    }

    #[tokio::test]
    async fn test_invalid_port_is_rejected_before_dialing() {
        let mut t = target(1);
        t.port = "ssh".to_string();
        let err = check(&t, Duration::from_secs(2)).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_target");
    }
}
