use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

pub const DEFAULT_AXE_SCRIPT_URL: &str =
    "https://cdn.jsdelivr.net/npm/axe-core@4.10.2/axe.min.js";

/// WCAG 2.0/2.1 level A and AA plus best-practice rules.
pub const DEFAULT_RULE_TAGS: [&str; 5] =
    ["wcag2a", "wcag2aa", "wcag21a", "wcag21aa", "best-practice"];

pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 720;

pub const DEFAULT_MAX_PAGES: usize = 20;
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_SETTLE_QUIET_WINDOW: Duration = Duration::from_millis(600);
pub const DEFAULT_SETTLE_CEILING: Duration = Duration::from_secs(5);
pub const DEFAULT_CLICK_SETTLE_CEILING: Duration = Duration::from_secs(3);
pub const DEFAULT_CLICK_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_SECOND_LEVEL_CLICKS: usize = 5;
pub const DEFAULT_RETURN_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_BACK_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(5);
