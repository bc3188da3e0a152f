//! Chrome/Chromium executable discovery.

use std::path::{Path, PathBuf};

use tracing::info;

use super::{BrowserError, BrowserResult};

/// Environment variable naming the browser executable (container deployments).
pub const CHROME_BIN_ENV: &str = "CHROME_BIN";

/// Well-known install locations, checked in order.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/snap/bin/chromium",
    "/opt/google/chrome/google-chrome",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Executable names looked up on `PATH`.
const CHROME_COMMANDS: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
];

/// Locate a browser executable.
///
/// Order: `CHROME_BIN`, the configured path, well-known locations, `PATH`.
/// A configured or environment path that does not exist is skipped.
pub fn find_chrome(configured: Option<&Path>) -> BrowserResult<PathBuf> {
    let from_env = std::env::var(CHROME_BIN_ENV).ok().filter(|v| !v.is_empty());
    find_chrome_with(from_env.as_deref().map(Path::new), configured, CHROME_PATHS)
}

fn find_chrome_with(
    from_env: Option<&Path>,
    configured: Option<&Path>,
    known: &[&str],
) -> BrowserResult<PathBuf> {
    if let Some(path) = from_env.filter(|p| p.exists()) {
        info!("Using Chrome from {}: {}", CHROME_BIN_ENV, path.display());
        return Ok(path.to_path_buf());
    }

    if let Some(path) = configured.filter(|p| p.exists()) {
        info!("Using configured Chrome: {}", path.display());
        return Ok(path.to_path_buf());
    }

    for candidate in known {
        let path = Path::new(candidate);
        if path.exists() {
            info!("Found Chrome at: {}", candidate);
            return Ok(path.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            info!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    Err(BrowserError::Launch(
        "Chrome/Chromium not found. Install it or set CHROME_BIN:\n\
         - Arch/Manjaro: sudo pacman -S chromium\n\
         - Ubuntu/Debian: sudo apt install chromium-browser\n\
         - Fedora: sudo dnf install chromium"
            .to_string(),
    ))
}
