//! Scripts that keep the automated tab's fingerprint close to a desktop Chrome.
//!
//! Applied after each navigation; failures are ignored since the page may
//! still be transitioning.

#![cfg_attr(not(feature = "browser"), allow(dead_code))]

/// User agent presented by every session.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Window size used for headless sessions, so responsive layouts render the
/// desktop grid the selectors are written against.
pub const WINDOW_SIZE: (u32, u32) = (1920, 1080);

/// Chrome arguments that suppress automation markers and container issues.
pub const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-background-networking",
    "--disable-sync",
    "--no-sandbox",
    "--disable-gpu",
];

pub const STEALTH_SCRIPTS: &[&str] = &[
    // navigator.webdriver is the first thing bot checks read
    r#"
    Object.defineProperty(Navigator.prototype, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    r#"
    if (!window.chrome) {
        window.chrome = { runtime: {}, app: {}, csi: function() {}, loadTimes: function() {} };
    }
    "#,
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en', 'ne'],
        configurable: true
    });
    "#,
    r#"
    if (navigator.plugins.length === 0) {
        Object.defineProperty(navigator, 'plugins', {
            get: () => [
                { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer' },
                { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai' }
            ],
            configurable: true
        });
    }
    "#,
];
