//! The Tauri config and settings panel agree with the Rust side.

use latexscan_lib::config::SETTINGS_WINDOW;
use latexscan_lib::pipeline::{PipelineEvent, Rejection};
use serde_json::Value;

fn tauri_conf() -> Value {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tauri.conf.json");
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn settings_window_is_declared_and_starts_hidden() {
    let conf = tauri_conf();
    let windows = conf["app"]["windows"].as_array().unwrap();
    let settings = windows
        .iter()
        .find(|w| w["label"] == SETTINGS_WINDOW)
        .expect("settings window missing from tauri.conf.json");
    assert_eq!(settings["visible"], false);
}

#[test]
fn capabilities_cover_the_settings_window() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/capabilities/default.json");
    let caps: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    let windows = caps["windows"].as_array().unwrap();
    assert!(windows.iter().any(|w| w == SETTINGS_WINDOW));
}

#[test]
fn settings_panel_can_edit_the_key() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/ui/index.html");
    let html = std::fs::read_to_string(path).unwrap();
    assert!(html.contains(r#"invoke("set_api_key""#));
    assert!(html.contains(r#"listen("pipeline-state""#));
}

#[test]
fn only_missing_key_rejections_open_settings() {
    assert!(PipelineEvent::Rejected {
        reason: Rejection::MissingCredential
    }
    .needs_credential());
    assert!(!PipelineEvent::Rejected {
        reason: Rejection::Busy
    }
    .needs_credential());
}
