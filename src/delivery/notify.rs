//! Notifier for headless runs: the notification goes to the log.

use super::{DeliveryError, Notification, Notifier};
use async_trait::async_trait;

#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), DeliveryError> {
        log::info!("[NOTIFY] {}: {}", notification.title, notification.body);
        Ok(())
    }
}
