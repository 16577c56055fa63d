//! One-shot command-line mode: capture a region, print its LaTeX.
//!
//! Used when the crate is built without the `desktop` feature. The
//! session goes through the same pipeline entry point as the hotkey.

use crate::config::AppConfig;
use crate::credential::CredentialStore;
use crate::delivery::LogNotifier;
use crate::pipeline::{self, PipelineEvent, PipelineHandle, PipelineState, Rejection, TriggerError};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// How a single session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureReport {
    Latex(String),
    Cancelled,
    Failed(String),
}

/// Trigger one capture and wait until the pipeline is idle again.
pub async fn capture_once(handle: &PipelineHandle) -> Result<CaptureReport, TriggerError> {
    let mut events = handle.subscribe();
    handle.trigger().request_capture()?;

    let mut terminal = None;
    loop {
        match events.recv().await {
            Ok(PipelineEvent::Rejected { reason }) => {
                let message = match reason {
                    Rejection::MissingCredential => handle
                        .snapshot()
                        .last_error
                        .unwrap_or_else(|| "Missing API key".to_string()),
                    Rejection::Busy => "A capture is already in progress".to_string(),
                };
                return Ok(CaptureReport::Failed(message));
            }
            Ok(PipelineEvent::Transition(t)) if t.to.is_terminal() => terminal = Some(t.to),
            Ok(PipelineEvent::Transition(t)) if t.to == PipelineState::Idle => break,
            Ok(PipelineEvent::Transition(_)) => {}
            Err(RecvError::Lagged(n)) => log::warn!("[HEADLESS] Missed {} pipeline events", n),
            Err(RecvError::Closed) => return Err(TriggerError::PipelineStopped),
        }
    }

    let snapshot = handle.snapshot();
    Ok(match terminal {
        Some(PipelineState::Succeeded) => {
            CaptureReport::Latex(snapshot.last_result.unwrap_or_default())
        }
        Some(PipelineState::Failed) => CaptureReport::Failed(
            snapshot
                .last_error
                .unwrap_or_else(|| "Capture failed".to_string()),
        ),
        _ => CaptureReport::Cancelled,
    })
}

pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!("latexscan v{}", version);
    println!("Snip a screen region and copy its math as LaTeX");
    println!();
    println!("USAGE:");
    println!("    latexscan [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help            Print this help message");
    println!("    -v, --version         Print version information");
    println!();
    println!("Runs one capture: pick a region, the LaTeX is copied to the clipboard");
    println!("and printed on stdout. Build with `--features desktop` for the tray app");
    println!("with the Cmd/Ctrl+Shift+L global shortcut.");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    GEMINI_API_KEY               - API key (otherwise read from the OS keychain)");
    println!("    LATEXSCAN_API_ENDPOINT       - Service base URL");
    println!("    LATEXSCAN_MODEL              - Model name (default: {})", crate::config::DEFAULT_MODEL);
    println!("    LATEXSCAN_CAPTURE_COMMAND    - Region picker command, {{output}} = file path");
    println!("                                   (quote arguments containing spaces)");
    println!("    LATEXSCAN_PREVIEW_CHARS      - Notification preview length (default: 100)");
    println!("    RUST_LOG                     - Log level (error/warn/info/debug/trace)");
}

pub fn print_version() {
    println!("latexscan v{}", env!("CARGO_PKG_VERSION"));
}

/// Entry point for the headless binary. Returns the process exit code.
pub fn main() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("-h") | Some("--help") => {
            print_help();
            return 0;
        }
        Some("-v") | Some("--version") => {
            print_version();
            return 0;
        }
        Some(other) => {
            eprintln!("Unknown argument: {} (see --help)", other);
            return 2;
        }
        None => {}
    }

    env_logger::init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return 2;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return 1;
        }
    };

    runtime.block_on(async move {
        let credentials = Arc::new(CredentialStore::from_environment());
        let services = match crate::build_services(&config, Arc::new(LogNotifier)) {
            Ok(services) => services,
            Err(e) => {
                eprintln!("{}", e);
                return 1;
            }
        };
        let handle = pipeline::spawn(services, credentials.subscribe());

        match capture_once(&handle).await {
            Ok(CaptureReport::Latex(latex)) => {
                println!("{}", latex);
                0
            }
            Ok(CaptureReport::Cancelled) => 0,
            Ok(CaptureReport::Failed(message)) => {
                eprintln!("{}", message);
                1
            }
            Err(e) => {
                eprintln!("{}", e);
                1
            }
        }
    })
}
