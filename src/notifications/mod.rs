pub mod dispatcher;
pub mod senders;

pub use dispatcher::{AlertDispatcher, DeliveryStatus, format_alert};
pub use senders::{NotificationSender, SenderError};
