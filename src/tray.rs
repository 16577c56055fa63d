//! System tray setup and click handler.
//!
//! The tray icon is the visible entry point for latexscan. Left-click
//! opens the settings panel (status, last result, API key); the menu
//! offers a capture, the same as the global shortcut.

use crate::commands::DesktopState;
use crate::config::SETTINGS_WINDOW;
use crate::shortcut::CAPTURE_SHORTCUT_LABEL;
use tauri::{
    menu::{MenuBuilder, MenuItemBuilder},
    tray::TrayIconBuilder,
    AppHandle, Manager, Runtime,
};

/// Sets up the system tray icon with a click handler.
///
/// Left-click: opens the settings panel.
/// Right-click: context menu with Capture, Settings and Quit.
pub fn setup_tray(app: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    let capture_item = MenuItemBuilder::with_id(
        "capture",
        format!("Capture LaTeX ({})", CAPTURE_SHORTCUT_LABEL),
    )
    .build(app)?;
    let settings_item = MenuItemBuilder::with_id("settings", "Settings…").build(app)?;
    let quit_item = MenuItemBuilder::with_id("quit", "Quit latexscan").build(app)?;
    let menu = MenuBuilder::new(app)
        .item(&capture_item)
        .item(&settings_item)
        .separator()
        .item(&quit_item)
        .build()?;

    let mut builder = TrayIconBuilder::new()
        .tooltip(format!("latexscan: {} to snip math", CAPTURE_SHORTCUT_LABEL))
        .menu(&menu)
        .show_menu_on_left_click(false)
        .on_tray_icon_event(|tray_icon, event| {
            if let tauri::tray::TrayIconEvent::Click {
                button: tauri::tray::MouseButton::Left,
                button_state: tauri::tray::MouseButtonState::Up,
                ..
            } = event
            {
                show_settings(tray_icon.app_handle());
            }
        })
        .on_menu_event(|app, event| match event.id().as_ref() {
            "capture" => request_capture(app),
            "settings" => show_settings(app),
            "quit" => {
                log::info!("Quit requested from tray menu");
                app.exit(0);
            }
            _ => {}
        });

    if let Some(icon) = app.default_window_icon() {
        builder = builder.icon(icon.clone());
    }

    let _tray = builder.build(app)?;

    Ok(())
}

/// Bring the settings window to the front.
pub fn show_settings<R: Runtime>(app: &AppHandle<R>) {
    let Some(window) = app.get_webview_window(SETTINGS_WINDOW) else {
        log::error!("Settings window `{}` is not configured", SETTINGS_WINDOW);
        return;
    };
    let shown = window
        .unminimize()
        .and_then(|_| window.show())
        .and_then(|_| window.set_focus());
    if let Err(e) = shown {
        log::warn!("Failed to show settings: {}", e);
    }
}

fn request_capture(app: &AppHandle) {
    let Some(state) = app.try_state::<DesktopState>() else {
        log::warn!("Capture requested before the pipeline started");
        return;
    };
    if let Err(e) = state.handle.trigger().request_capture() {
        log::error!("Failed to request capture: {}", e);
    }
}
