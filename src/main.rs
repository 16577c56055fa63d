// Prevents additional console window on Windows in release builds.
#![cfg_attr(
    all(feature = "desktop", not(debug_assertions)),
    windows_subsystem = "windows"
)]

fn main() {
    #[cfg(feature = "desktop")]
    latexscan_lib::run();

    #[cfg(not(feature = "desktop"))]
    std::process::exit(latexscan_lib::headless::main());
}
