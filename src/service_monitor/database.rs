//! MySQL probe: open one connection and run the validation query.
use sqlx::Connection;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use std::time::Duration;
use tracing::{error, info, warn};

use super::error::CheckError;
use super::models::{MysqlTarget, parse_port};

pub const VALIDATION_QUERY: &str = "select 1";
pub const CONNECTION_ERROR: &str = "connection error";
pub const VALIDATION_FAILED: &str = "validation query failed";
pub const CHARSET: &str = "utf8";

fn connect_options(target: &MysqlTarget, port: u16) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&target.host)
        .port(port)
        .username(&target.user)
        .password(&target.password)
        .charset(CHARSET)
}

pub async fn check(target: &MysqlTarget, timeout: Duration) -> Result<(), CheckError> {
    let port = parse_port(&target.port)?;
    let options = connect_options(target, port);

    let connect = MySqlConnection::connect_with(&options);
    let mut conn = match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            error!(
                monitor = %target.name,
                host = %target.host,
                port,
                error = %e,
                "MySQL connect failed."
            );
            return Err(CheckError::Connection(CONNECTION_ERROR.to_string()));
        }
        Err(_) => {
            error!(monitor = %target.name, host = %target.host, port, "MySQL connect timed out.");
            return Err(CheckError::Connection(CONNECTION_ERROR.to_string()));
        }
    };

    // `execute` drains the result set before returning, so nothing is left
    // pending on the connection whichever way the query goes.
    let query_result =
        tokio::time::timeout(timeout, sqlx::query(VALIDATION_QUERY).execute(&mut conn)).await;

    let outcome = match query_result {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => {
            error!(
                monitor = %target.name,
                host = %target.host,
                port,
                error = %e,
                "MySQL validation query failed."
            );
            Err(CheckError::Validation(VALIDATION_FAILED.to_string()))
        }
        Err(_) => {
            error!(
                monitor = %target.name,
                host = %target.host,
                port,
                "MySQL validation query timed out."
            );
            Err(CheckError::Validation(VALIDATION_FAILED.to_string()))
        }
    };

    match tokio::time::timeout(timeout, conn.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(monitor = %target.name, error = %e, "MySQL connection did not close cleanly.")
        }
        Err(_) => warn!(monitor = %target.name, "MySQL connection close timed out."),
    }

    if outcome.is_ok() {
        info!(monitor = %target.name, host = %target.host, port, "MySQL is running.");
    }
    outcome
}
