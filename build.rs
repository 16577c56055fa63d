//! Build script for latexscan.
//!
//! Only the `desktop` feature needs a build step: Tauri generates its
//! context (config, capabilities, icons) at compile time. Headless builds
//! have nothing to generate.

fn main() {
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
