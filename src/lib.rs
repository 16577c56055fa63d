//! latexscan: snip a screen region, get its math as LaTeX.
//!
//! The capture pipeline and its collaborators are plain library code:
//! - Configuration and credentials (config.rs, credential.rs)
//! - Interactive region capture (capture/)
//! - Remote LaTeX conversion (llm/)
//! - Clipboard + notification delivery (delivery/)
//! - The state machine tying them together (pipeline/)
//!
//! With the `desktop` feature the Tauri shell adds the tray icon, the
//! global shortcut and native notifications (tray.rs, shortcut.rs,
//! commands.rs). Without it, `headless` provides a one-shot CLI.

pub mod capture;
pub mod config;
pub mod credential;
pub mod delivery;
pub mod headless;
pub mod llm;
pub mod pipeline;
pub mod safety;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
mod shortcut;
#[cfg(feature = "desktop")]
mod tray;

use capture::{CaptureError, InteractiveCapture};
use config::AppConfig;
use delivery::{DeliverySink, Notifier, SystemClipboard};
use llm::GeminiConverterFactory;
use pipeline::PipelineServices;
use std::sync::Arc;

/// Wire the production collaborators for `config`.
///
/// Only the notifier differs between the desktop shell and headless mode.
pub fn build_services(
    config: &AppConfig,
    notifier: Arc<dyn Notifier>,
) -> Result<PipelineServices, CaptureError> {
    let capture = InteractiveCapture::from_config(config)?;
    Ok(PipelineServices {
        capture: Arc::new(capture),
        converters: Arc::new(GeminiConverterFactory::new(config.service.clone())),
        delivery: Arc::new(DeliverySink::new(
            Arc::new(SystemClipboard::new()),
            notifier,
            config.preview_chars,
        )),
    })
}

/// Entry point, called by the Tauri runtime.
#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use credential::CredentialStore;
    use tauri::{Emitter, Manager};

    env_logger::init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("[CONFIG] {}", e);
            std::process::exit(2);
        }
    };

    tauri::Builder::default()
        .plugin(tauri_plugin_notification::init())
        .plugin(shortcut::plugin())
        // Closing the settings panel hides it; the app lives in the tray.
        .on_window_event(|window, event| {
            if let tauri::WindowEvent::CloseRequested { api, .. } = event {
                if window.label() == config::SETTINGS_WINDOW {
                    api.prevent_close();
                    let _ = window.hide();
                }
            }
        })
        .manage(Arc::new(CredentialStore::from_environment()))
        .invoke_handler(tauri::generate_handler![
            commands::request_capture,
            commands::pipeline_snapshot,
            commands::api_key_configured,
            commands::set_api_key,
            commands::copy_last_result,
        ])
        .setup(move |app| {
            log::info!("latexscan starting up");

            let notifier = Arc::new(commands::TauriNotifier::new(app.handle().clone()));
            let services = build_services(&config, notifier)?;
            let credentials = app.state::<Arc<CredentialStore>>().subscribe();

            let (coordinator, handle) =
                pipeline::PipelineCoordinator::new(services.clone(), credentials);
            tauri::async_runtime::spawn(coordinator.run());

            // Mirror every snapshot to the webview.
            let mut snapshots = handle.watch_snapshots();
            let emitter = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                while snapshots.changed().await.is_ok() {
                    let snapshot = snapshots.borrow_and_update().clone();
                    let _ = emitter.emit("pipeline-state", &snapshot);
                }
            });

            // Without a key nothing can be captured; open the panel to ask for one.
            let mut events = handle.subscribe();
            let settings = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                use tokio::sync::broadcast::error::RecvError;
                loop {
                    match events.recv().await {
                        Ok(event) if event.needs_credential() => tray::show_settings(&settings),
                        Ok(_) | Err(RecvError::Lagged(_)) => {}
                        Err(RecvError::Closed) => break,
                    }
                }
            });

            app.manage(commands::DesktopState { handle, services });

            tray::setup_tray(app.handle())?;
            shortcut::register(app.handle())?;

            log::info!("Tray and shortcut ready — waiting for captures");
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("Error running latexscan");
}
