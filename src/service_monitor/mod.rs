//! Per-protocol health checks.
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

pub mod database;
pub mod error;
pub mod http;
pub mod kv_store;
pub mod models;
pub mod tcp;

pub use error::CheckError;
pub use models::{HttpTarget, MysqlTarget, ProtocolKind, RedisTarget, TargetSpec, TcpTarget};

/// Result of checking one target. There is no degraded state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Success,
    Failure(CheckError),
}

impl From<Result<(), CheckError>> for CheckOutcome {
    fn from(result: Result<(), CheckError>) -> Self {
        match result {
            Ok(()) => CheckOutcome::Success,
            Err(e) => CheckOutcome::Failure(e),
        }
    }
}

/// Something that can check a target.
#[async_trait]
pub trait Check: Send + Sync {
    async fn check(&self, target: &TargetSpec) -> CheckOutcome;
}

/// Dispatches each target to its protocol checker. Every network call made
/// through it is bounded by `timeout`.
pub struct ServiceChecker {
    http_client: Client,
    timeout: Duration,
}

impl ServiceChecker {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            timeout,
        })
    }
}

#[async_trait]
impl Check for ServiceChecker {
    async fn check(&self, target: &TargetSpec) -> CheckOutcome {
        if let Err(e) = target.validate() {
            warn!(
                monitor = %target.name(),
                kind = %target.kind(),
                error = %e,
                "Target definition is invalid."
            );
            return CheckOutcome::Failure(e);
        }

        let result = match target {
            TargetSpec::Http(t) => http::check(&self.http_client, t).await,
            TargetSpec::Mysql(t) => database::check(t, self.timeout).await,
            TargetSpec::Redis(t) => kv_store::check(t, self.timeout).await,
            TargetSpec::Tcp(t) => tcp::check(t, self.timeout).await,
        };
        result.into()
    }
}
