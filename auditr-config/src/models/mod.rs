pub mod sources;

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::*;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub browser: BrowserConfig,
    pub checker: CheckerConfig,
    pub audit: AuditConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// `None` runs the service on in-memory stores.
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn is_wildcard_included(&self) -> bool {
        self.allowed_origins
            .iter()
            .any(|origin| origin.trim() == "*")
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
        }
    }
}

/// How audit browsers are launched.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Chrome/Chromium binary; autodetected when unset.
    pub executable: Option<PathBuf>,
    pub no_sandbox: bool,
    /// Fixed viewport used for headless sessions only.
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            no_sandbox: true,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Local axe-core bundle; takes precedence over `axe_script_url`.
    pub axe_script_path: Option<PathBuf>,
    pub axe_script_url: String,
    pub rule_tags: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            axe_script_path: None,
            axe_script_url: DEFAULT_AXE_SCRIPT_URL.to_string(),
            rule_tags: DEFAULT_RULE_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Budgets and timings for a single audit run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    /// Page budget shared by every discovery phase.
    pub max_pages: usize,
    pub navigation_timeout: Duration,
    pub auth_timeout: Duration,
    /// DOM must stay mutation-free this long to count as settled.
    pub settle_quiet_window: Duration,
    /// Upper bound for settle detection after a full navigation.
    pub settle_ceiling: Duration,
    /// Upper bound for settle detection after a click.
    pub click_settle_ceiling: Duration,
    pub click_delay: Duration,
    pub second_level_clicks: usize,
    pub return_navigation_timeout: Duration,
    pub back_navigation_timeout: Duration,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            settle_quiet_window: DEFAULT_SETTLE_QUIET_WINDOW,
            settle_ceiling: DEFAULT_SETTLE_CEILING,
            click_settle_ceiling: DEFAULT_CLICK_SETTLE_CEILING,
            click_delay: DEFAULT_CLICK_DELAY,
            second_level_clicks: DEFAULT_SECOND_LEVEL_CLICKS,
            return_navigation_timeout: DEFAULT_RETURN_NAVIGATION_TIMEOUT,
            back_navigation_timeout: DEFAULT_BACK_NAVIGATION_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
