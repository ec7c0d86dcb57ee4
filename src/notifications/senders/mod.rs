use async_trait::async_trait;
use thiserror::Error;

pub mod dingtalk;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Notification rejected by provider (errcode {errcode}): {errmsg}")]
    Rejected { errcode: i64, errmsg: String },
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// A sink that delivers one plain-text message to a group chat.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sends `message`.
    ///
    /// # Arguments
    ///
    /// * `access_token` - The per-robot token identifying the target chat.
    /// * `message` - The alert text, sent as-is.
    async fn send(&self, access_token: &str, message: &str) -> Result<(), SenderError>;
}
