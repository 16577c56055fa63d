//! System clipboard via `arboard`.

use super::{Clipboard, DeliveryError};
use std::sync::Mutex;

/// Lazily opened system clipboard, kept open for the process lifetime.
///
/// On X11/Wayland the copying process owns the selection, so dropping the
/// handle right after writing can lose the contents.
#[derive(Default)]
pub struct SystemClipboard {
    handle: Mutex<Option<arboard::Clipboard>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), DeliveryError> {
        let mut guard = self
            .handle
            .lock()
            .map_err(|e| DeliveryError::Clipboard(e.to_string()))?;

        if guard.is_none() {
            let clipboard =
                arboard::Clipboard::new().map_err(|e| DeliveryError::Clipboard(e.to_string()))?;
            *guard = Some(clipboard);
        }

        match guard.as_mut() {
            Some(clipboard) => clipboard
                .set_text(text)
                .map_err(|e| DeliveryError::Clipboard(e.to_string())),
            None => Err(DeliveryError::Clipboard("not initialised".to_string())),
        }
    }
}
