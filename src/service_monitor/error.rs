use thiserror::Error;

/// Why a single target failed its check. The payload is the human-readable
/// detail that ends up in the alert body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// Transport could not be established (refused, unreachable, timed out).
    #[error("{0}")]
    Connection(String),
    /// Credentials were rejected by the target.
    #[error("{0}")]
    Auth(String),
    /// The target answered but the protocol-level probe failed.
    #[error("{0}")]
    Validation(String),
    /// The target definition itself is unusable.
    #[error("{0}")]
    InvalidTarget(String),
}

impl CheckError {
    pub fn kind(&self) -> &'static str {
        match self {
            CheckError::Connection(_) => "connection",
            CheckError::Auth(_) => "auth",
            CheckError::Validation(_) => "validation",
            CheckError::InvalidTarget(_) => "invalid_target",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            CheckError::Connection(d)
            | CheckError::Auth(d)
            | CheckError::Validation(d)
            | CheckError::InvalidTarget(d) => d,
        }
    }
}
