//! Result delivery: clipboard write, then user notification.
//!
//! Both steps are best-effort: a failure is reported back to the caller
//! for logging, but never turns a successful conversion into an error.

mod clipboard;
mod notify;

pub use clipboard::SystemClipboard;
pub use notify::LogNotifier;

use async_trait::async_trait;
use std::sync::Arc;

pub const NOTIFICATION_TITLE: &str = "LaTeX Copied!";
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    /// The "copied" notification for `latex`, body cut to `preview_chars`.
    pub fn copied(latex: &str, preview_chars: usize) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body: preview(latex, preview_chars),
        }
    }
}

/// First `limit` characters of `text`, with `...` appended if cut.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("Notification failed: {0}")]
    Notification(String),
}

/// Plain-text clipboard. Each write replaces the previous contents.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), DeliveryError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), DeliveryError>;
}

/// Outcome of each delivery step, for logging.
#[derive(Debug)]
pub struct DeliveryReport {
    pub clipboard: Result<(), DeliveryError>,
    pub notification: Result<(), DeliveryError>,
}

pub struct DeliverySink {
    clipboard: Arc<dyn Clipboard>,
    notifier: Arc<dyn Notifier>,
    preview_chars: usize,
}

impl DeliverySink {
    pub fn new(
        clipboard: Arc<dyn Clipboard>,
        notifier: Arc<dyn Notifier>,
        preview_chars: usize,
    ) -> Self {
        Self {
            clipboard,
            notifier,
            preview_chars,
        }
    }

    pub fn clipboard(&self) -> &Arc<dyn Clipboard> {
        &self.clipboard
    }

    /// Copy `latex` to the clipboard, then notify the user.
    pub async fn deliver(&self, latex: &str) -> DeliveryReport {
        let clipboard = Arc::clone(&self.clipboard);
        let text = latex.to_string();
        let clipboard_result = tokio::task::spawn_blocking(move || clipboard.write_text(&text))
            .await
            .unwrap_or_else(|e| Err(DeliveryError::Clipboard(format!("task failed: {}", e))));

        match &clipboard_result {
            Ok(()) => log::info!("[DELIVERY] Copied {} chars to clipboard", latex.len()),
            Err(e) => log::error!("[DELIVERY] {}", e),
        }

        let notification_result = self
            .notifier
            .notify(Notification::copied(latex, self.preview_chars))
            .await;
        if let Err(e) = &notification_result {
            log::warn!("[DELIVERY] {}", e);
        }

        DeliveryReport {
            clipboard: clipboard_result,
            notification: notification_result,
        }
    }
}
