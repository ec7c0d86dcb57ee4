use tracing::{error, info};

use super::senders::NotificationSender;
use crate::alerting::FailureRecord;

/// What happened to an alert. Delivery problems end up here instead of
/// being returned as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Nothing to report; the sender was not called.
    Skipped,
    Delivered,
    Failed,
}

/// Joins records as `title\ncontent\n` each, in order.
pub fn format_alert(records: &[FailureRecord]) -> String {
    let mut content = String::new();
    for record in records {
        content.push_str(&record.title);
        content.push('\n');
        content.push_str(&record.content);
        content.push('\n');
    }
    content
}

/// Turns a run's failures into one message and hands it to the sender,
/// best effort.
pub struct AlertDispatcher<S> {
    sender: S,
}

impl<S: NotificationSender> AlertDispatcher<S> {
    pub fn new(sender: S) -> Self {
        Self { sender }
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub async fn send(&self, records: &[FailureRecord], webhook_token: &str) -> DeliveryStatus {
        if records.is_empty() {
            info!("No failures recorded; no alert sent.");
            return DeliveryStatus::Skipped;
        }

        let message = format_alert(records);
        match self.sender.send(webhook_token, &message).await {
            Ok(()) => {
                info!(failures = records.len(), "Alert delivered.");
                DeliveryStatus::Delivered
            }
            Err(e) => {
                error!(failures = records.len(), error = %e, "Failed to deliver alert.");
                DeliveryStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::SenderError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, access_token: &str, message: &str) -> Result<(), SenderError> {
            self.calls
                .lock()
                .unwrap()
                .push((access_token.to_string(), message.to_string()));
            if self.fail {
                Err(SenderError::SendFailed("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_format_alert_preserves_order() {
        let records = vec![FailureRecord::new("A", "x"), FailureRecord::new("B", "y")];
        assert_eq!(format_alert(&records), "A\nx\nB\ny\n");
        assert_eq!(format_alert(&[]), "");
    }

    #[tokio::test]
    async fn test_empty_records_never_reach_sender() {
        let dispatcher = AlertDispatcher::new(RecordingSender::default());

        let status = dispatcher.send(&[], "token").await;
        assert_eq!(status, DeliveryStatus::Skipped);
        assert!(dispatcher.sender().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_are_sent_once_with_token() {
        let dispatcher = AlertDispatcher::new(RecordingSender::default());
        let records = vec![FailureRecord::new("A", "x"), FailureRecord::new("B", "y")];

        let status = dispatcher.send(&records, "token").await;
        assert_eq!(status, DeliveryStatus::Delivered);
        assert_eq!(
            *dispatcher.sender().calls.lock().unwrap(),
            vec![("token".to_string(), "A\nx\nB\ny\n".to_string())]
        );
    }

    #[tokio::test]
    async fn test_sender_error_is_swallowed() {
        let dispatcher = AlertDispatcher::new(RecordingSender {
            fail: true,
            ..Default::default()
        });

        let status = dispatcher
            .send(&[FailureRecord::new("A", "x")], "token")
            .await;
        assert_eq!(status, DeliveryStatus::Failed);
        assert_eq!(dispatcher.sender().calls.lock().unwrap().len(), 1);
    }
}
