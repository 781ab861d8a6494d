use crate::input::{BackendKind, Pacing};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Options for launching a new Chrome/Chromium instance
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a visible window. OS-level input needs a headed browser.
    pub headless: bool,

    pub window_width: u32,

    pub window_height: u32,

    /// Chrome binary to use instead of the auto-detected one
    pub chrome_path: Option<PathBuf>,

    /// Persistent profile directory
    pub user_data_dir: Option<PathBuf>,

    pub sandbox: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            chrome_path: None,
            user_data_dir: None,
            sandbox: true,
        }
    }
}

impl LaunchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }
}

/// Options for attaching to an already running browser
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// DevTools WebSocket URL
    pub ws_url: String,

    /// Connection timeout in milliseconds
    pub timeout: u64,
}

impl ConnectionOptions {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self { ws_url: ws_url.into(), timeout: 30_000 }
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Vertical band of the viewport that is safe to click in.
///
/// Pages with a fixed header or search bar cover the top of the viewport; elements whose
/// center falls above `top` or below `bottom` are scrolled before being clicked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafeRegion {
    pub top: f64,
    pub bottom: f64,
}

impl Default for SafeRegion {
    fn default() -> Self {
        Self { top: 100.0, bottom: 1000.0 }
    }
}

impl SafeRegion {
    pub fn contains(&self, y: f64) -> bool {
        y >= self.top && y <= self.bottom
    }
}

/// Tunables for the interaction engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Character budget of one summary chunk
    pub chunk_limit: usize,

    /// Maximum number of links listed in a page summary
    pub link_cap: usize,

    /// Links whose top edge is above this line are treated as fixed header chrome
    pub link_top_band: f64,

    /// Width and height an element must exceed to count as visible
    pub visibility_threshold: f64,

    pub safe_region: SafeRegion,

    /// Share of the intended text that must land for OS-level typing to be accepted
    pub type_accept_ratio: f64,

    /// Per-character delay of the high-level typing fallback
    pub fallback_key_delay_ms: u64,

    pub new_context_poll_interval_ms: u64,

    pub new_context_poll_attempts: u32,

    /// How long a high-level modified click gets to produce a new tab
    pub api_click_wait_ms: u64,

    /// Time a freshly opened tab is given to render before it is captured
    pub new_context_settle_ms: u64,

    pub locate_timeout_ms: u64,

    pub scroll_timeout_ms: u64,

    /// Where diagnostic screenshots are written
    pub screenshot_dir: PathBuf,

    pub pacing: Pacing,

    /// Backends tried, in order, when clicking at a point
    pub click_order: Vec<BackendKind>,

    /// Backend that injects keystrokes when typing; the API backend is always the fallback
    pub key_backend: BackendKind,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            chunk_limit: 2000,
            link_cap: 30,
            link_top_band: 30.0,
            visibility_threshold: 5.0,
            safe_region: SafeRegion::default(),
            type_accept_ratio: 0.8,
            fallback_key_delay_ms: 80,
            new_context_poll_interval_ms: 500,
            new_context_poll_attempts: 12,
            api_click_wait_ms: 3000,
            new_context_settle_ms: 6000,
            locate_timeout_ms: 5000,
            scroll_timeout_ms: 2000,
            screenshot_dir: PathBuf::from("/workspace"),
            pacing: Pacing::Human,
            click_order: vec![BackendKind::Protocol, BackendKind::Os],
            key_backend: BackendKind::Os,
        }
    }
}

impl InteractionConfig {
    /// Defaults, with the screenshot directory taken from `SCREENSHOT_DIR` when set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("SCREENSHOT_DIR") {
            if !dir.trim().is_empty() {
                config.screenshot_dir = PathBuf::from(dir.trim());
            }
        }
        config
    }

    /// Configuration for tests and scripted runs: no human pacing, short waits
    pub fn instant() -> Self {
        Self {
            new_context_poll_interval_ms: 1,
            new_context_poll_attempts: 3,
            api_click_wait_ms: 1,
            new_context_settle_ms: 0,
            pacing: Pacing::Instant,
            ..Self::default()
        }
    }

    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        self.screenshot_dir.join(name)
    }

    pub fn fallback_key_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_key_delay_ms)
    }

    pub fn new_context_poll_interval(&self) -> Duration {
        Duration::from_millis(self.new_context_poll_interval_ms)
    }

    pub fn api_click_wait(&self) -> Duration {
        Duration::from_millis(self.api_click_wait_ms)
    }

    pub fn new_context_settle(&self) -> Duration {
        Duration::from_millis(self.new_context_settle_ms)
    }

    pub fn locate_timeout(&self) -> Duration {
        Duration::from_millis(self.locate_timeout_ms)
    }

    pub fn scroll_timeout(&self) -> Duration {
        Duration::from_millis(self.scroll_timeout_ms)
    }
}
