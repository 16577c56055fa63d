//! Capture trigger: the single entry point for "begin capture".
//!
//! The global shortcut, the tray icon, the frontend button and the
//! headless CLI all hold a clone of the same [`CaptureTrigger`].

use tokio::sync::mpsc;

#[derive(Debug)]
pub(crate) enum Command {
    RequestCapture,
}

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("Capture pipeline is not running")]
    PipelineStopped,
}

#[derive(Debug, Clone)]
pub struct CaptureTrigger {
    tx: mpsc::UnboundedSender<Command>,
}

impl CaptureTrigger {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    /// Ask the pipeline to start a session.
    ///
    /// Never blocks, so it is safe to call from OS event callbacks.
    /// Whether the session actually starts (credential present, pipeline
    /// idle) is decided by the pipeline and reported through its events.
    pub fn request_capture(&self) -> Result<(), TriggerError> {
        self.tx
            .send(Command::RequestCapture)
            .map_err(|_| TriggerError::PipelineStopped)
    }
}
