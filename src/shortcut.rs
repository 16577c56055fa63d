//! Global shortcut: Cmd+Shift+L (Ctrl+Shift+L off macOS) starts a capture.

use crate::commands::DesktopState;
use tauri::{AppHandle, Manager, Runtime};
use tauri_plugin_global_shortcut::{
    Code, GlobalShortcutExt, Modifiers, Shortcut, ShortcutState,
};

pub const CAPTURE_SHORTCUT_LABEL: &str = if cfg!(target_os = "macos") {
    "Cmd+Shift+L"
} else {
    "Ctrl+Shift+L"
};

fn capture_shortcut() -> Shortcut {
    let primary = if cfg!(target_os = "macos") {
        Modifiers::SUPER
    } else {
        Modifiers::CONTROL
    };
    Shortcut::new(Some(primary | Modifiers::SHIFT), Code::KeyL)
}

/// Plugin whose handler forwards key presses to the capture trigger.
pub fn plugin<R: Runtime>() -> tauri::plugin::TauriPlugin<R> {
    let capture = capture_shortcut();
    tauri_plugin_global_shortcut::Builder::new()
        .with_handler(move |app, shortcut, event| {
            if shortcut != &capture || event.state() != ShortcutState::Pressed {
                return;
            }
            log::info!("[SHORTCUT] {} pressed — requesting capture", CAPTURE_SHORTCUT_LABEL);
            match app.try_state::<DesktopState>() {
                Some(state) => {
                    if let Err(e) = state.handle.trigger().request_capture() {
                        log::error!("[SHORTCUT] {}", e);
                    }
                }
                None => log::warn!("[SHORTCUT] Pipeline not ready yet"),
            }
        })
        .build()
}

/// Register the capture shortcut with the OS.
pub fn register<R: Runtime>(app: &AppHandle<R>) -> Result<(), Box<dyn std::error::Error>> {
    app.global_shortcut().register(capture_shortcut())?;
    log::info!("[SHORTCUT] Registered {}", CAPTURE_SHORTCUT_LABEL);
    Ok(())
}
