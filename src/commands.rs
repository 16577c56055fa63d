//! Tauri commands and desktop-only collaborators.
//!
//! The webview settings panel calls these; every capture request funnels
//! into the same [`CaptureTrigger`](crate::pipeline::CaptureTrigger) the
//! shortcut and tray use.

use crate::credential::CredentialStore;
use crate::delivery::{DeliveryError, Notification, Notifier};
use crate::pipeline::{PipelineHandle, PipelineServices, PipelineSnapshot};
use async_trait::async_trait;
use std::sync::Arc;
use tauri_plugin_notification::NotificationExt;

/// Managed state shared by commands, tray and shortcut handlers.
pub struct DesktopState {
    pub handle: PipelineHandle,
    pub services: PipelineServices,
}

/// Native notifications through `tauri-plugin-notification`.
pub struct TauriNotifier {
    app: tauri::AppHandle,
}

impl TauriNotifier {
    pub fn new(app: tauri::AppHandle) -> Self {
        Self { app }
    }
}

#[async_trait]
impl Notifier for TauriNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), DeliveryError> {
        self.app
            .notification()
            .builder()
            .title(notification.title)
            .body(notification.body)
            .sound("default")
            .show()
            .map_err(|e| DeliveryError::Notification(e.to_string()))
    }
}

/// Tauri command: start a capture, same as pressing the shortcut.
#[tauri::command]
pub fn request_capture(state: tauri::State<'_, DesktopState>) -> Result<(), String> {
    state
        .handle
        .trigger()
        .request_capture()
        .map_err(|e| e.to_string())
}

/// Tauri command: current processing flag, last result and last error.
#[tauri::command]
pub fn pipeline_snapshot(state: tauri::State<'_, DesktopState>) -> PipelineSnapshot {
    state.handle.snapshot()
}

#[tauri::command]
pub fn api_key_configured(store: tauri::State<'_, Arc<CredentialStore>>) -> bool {
    store.is_configured()
}

/// Tauri command: save (or, when empty, remove) the API key.
///
/// Returns whether a key is configured afterwards.
#[tauri::command]
pub fn set_api_key(
    store: tauri::State<'_, Arc<CredentialStore>>,
    api_key: String,
) -> Result<bool, String> {
    store.set_api_key(&api_key).map_err(|e| e.to_string())
}

/// Tauri command: copy the last successful result to the clipboard again.
#[tauri::command]
pub async fn copy_last_result(state: tauri::State<'_, DesktopState>) -> Result<bool, String> {
    let Some(latex) = state.handle.snapshot().last_result else {
        return Ok(false);
    };
    let clipboard = Arc::clone(state.services.delivery.clipboard());
    tokio::task::spawn_blocking(move || clipboard.write_text(&latex))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;
    Ok(true)
}
