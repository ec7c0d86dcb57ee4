//! Redis probe.
//!
//! Liveness is proven with a write (`SET GO_TEST_KEY 123456`), not a PING, so
//! every successful check leaves the probe key on the target.
use redis::Cmd;
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tracing::{error, info};

use super::error::CheckError;
use super::models::{RedisTarget, parse_port};

pub const PROBE_KEY: &str = "GO_TEST_KEY";
pub const PROBE_VALUE: i64 = 123456;
pub const CONNECTION_ERROR: &str = "connection error";

pub async fn check(target: &RedisTarget, timeout: Duration) -> Result<(), CheckError> {
    let port = parse_port(&target.port)?;

    // Credentials are sent with an explicit AUTH below, never in the
    // connection info, so a rejection can be told apart from a dial failure.
    let mut conn = connect(&target.host, port, timeout).await.map_err(|detail| {
        error!(
            monitor = %target.name,
            host = %target.host,
            port,
            error = %detail,
            "Redis connect failed."
        );
        CheckError::Connection(CONNECTION_ERROR.to_string())
    })?;

    if let Some(password) = target.auth_password() {
        let mut auth = redis::cmd("AUTH");
        auth.arg(password);
        run(&auth, &mut conn, timeout).await.map_err(|detail| {
            error!(
                monitor = %target.name,
                host = %target.host,
                port,
                error = %detail,
                "Redis AUTH failed."
            );
            CheckError::Auth(format!("authentication failed: {detail}"))
        })?;
    }

    let mut probe = redis::cmd("SET");
    probe.arg(PROBE_KEY).arg(PROBE_VALUE);
    run(&probe, &mut conn, timeout).await.map_err(|detail| {
        error!(
            monitor = %target.name,
            host = %target.host,
            port,
            error = %detail,
            "Redis write probe failed."
        );
        CheckError::Validation(format!("write probe failed: {detail}"))
    })?;

    info!(monitor = %target.name, host = %target.host, port, "Redis is running.");
    Ok(())
}

async fn connect(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<MultiplexedConnection, String> {
    let client = redis::Client::open((host, port)).map_err(|e| e.to_string())?;
    match tokio::time::timeout(timeout, client.get_multiplexed_async_connection()).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("connect timed out after {}ms", timeout.as_millis())),
    }
}

async fn run(
    cmd: &Cmd,
    conn: &mut MultiplexedConnection,
    timeout: Duration,
) -> Result<(), String> {
    let query = async {
        let reply: redis::RedisResult<()> = cmd.query_async(conn).await;
        reply
    };
    match tokio::time::timeout(timeout, query).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("no reply within {}ms", timeout.as_millis())),
    }
}
