use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::{NotificationSender, SenderError};

pub const DEFAULT_ROBOT_URL: &str = "https://oapi.dingtalk.com/robot/send";

/// A sender for pushing text messages through a DingTalk group robot.
pub struct DingTalkSender {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct DingTalkText<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct DingTalkMessage<'a> {
    msgtype: &'a str,
    text: DingTalkText<'a>,
}

/// Body the robot API answers with; `errcode` 0 means accepted.
#[derive(Deserialize, Debug)]
struct DingTalkResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl DingTalkSender {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SenderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl NotificationSender for DingTalkSender {
    async fn send(&self, access_token: &str, message: &str) -> Result<(), SenderError> {
        let payload = DingTalkMessage {
            msgtype: "text",
            text: DingTalkText { content: message },
        };

        // `json` sets `Content-Type: application/json` and escapes the text.
        let response = self
            .client
            .post(&self.base_url)
            .query(&[("access_token", access_token)])
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        info!(status = %status, body = %body, "DingTalk robot responded.");

        if !status.is_success() {
            return Err(SenderError::SendFailed(format!(
                "DingTalk API returned non-success status: {status}. Body: {body}"
            )));
        }

        match serde_json::from_str::<DingTalkResponse>(&body) {
            Ok(reply) if reply.errcode != 0 => Err(SenderError::Rejected {
                errcode: reply.errcode,
                errmsg: reply.errmsg,
            }),
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "DingTalk response body is not the expected JSON.");
                Ok(())
            }
        }
    }
}
