use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::util::{parse_bool_var, parse_csv_var, parse_duration_var, parse_var};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub cors: FileCorsConfig,
    #[serde(default)]
    pub browser: FileBrowserConfig,
    #[serde(default)]
    pub checker: FileCheckerConfig,
    #[serde(default)]
    pub audit: FileAuditConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileBrowserConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_sandbox: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_args: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCheckerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axe_script_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axe_script_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_tags: Option<Vec<String>>,
}

/// Audit tuning; durations are humantime strings (`"30s"`, `"5m"`).
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAuditConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<usize>,
    #[serde(
        default,
        with = "crate::util::humantime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub navigation_timeout: Option<Duration>,
    #[serde(
        default,
        with = "crate::util::humantime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_timeout: Option<Duration>,
    #[serde(
        default,
        with = "crate::util::humantime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub settle_quiet_window: Option<Duration>,
    #[serde(
        default,
        with = "crate::util::humantime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub settle_ceiling: Option<Duration>,
    #[serde(
        default,
        with = "crate::util::humantime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub click_settle_ceiling: Option<Duration>,
    #[serde(
        default,
        with = "crate::util::humantime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub click_delay: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_level_clicks: Option<usize>,
    #[serde(
        default,
        with = "crate::util::humantime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub return_navigation_timeout: Option<Duration>,
    #[serde(
        default,
        with = "crate::util::humantime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub back_navigation_timeout: Option<Duration>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub database_url: Option<String>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub chrome_executable: Option<PathBuf>,
    pub chrome_no_sandbox: Option<bool>,
    pub chrome_extra_args: Option<Vec<String>>,
    pub axe_script_path: Option<PathBuf>,
    pub axe_script_url: Option<String>,
    pub axe_rule_tags: Option<Vec<String>>,
    pub audit_max_pages: Option<usize>,
    pub audit_navigation_timeout: Option<Duration>,
    pub audit_auth_timeout: Option<Duration>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: std::env::var("AUDITR_CONFIG_PATH")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            server_host: std::env::var("SERVER_HOST").ok(),
            server_port: parse_var("SERVER_PORT"),
            database_url: std::env::var("DATABASE_URL").ok(),
            cors_allowed_origins: parse_csv_var("CORS_ALLOWED_ORIGINS"),
            chrome_executable: std::env::var("CHROME_EXECUTABLE")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            chrome_no_sandbox: parse_bool_var("CHROME_NO_SANDBOX"),
            chrome_extra_args: parse_csv_var("CHROME_EXTRA_ARGS"),
            axe_script_path: std::env::var("AXE_SCRIPT_PATH")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            axe_script_url: std::env::var("AXE_SCRIPT_URL")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            axe_rule_tags: parse_csv_var("AXE_RULE_TAGS"),
            audit_max_pages: parse_var("AUDIT_MAX_PAGES"),
            audit_navigation_timeout: parse_duration_var(
                "AUDIT_NAVIGATION_TIMEOUT",
            ),
            audit_auth_timeout: parse_duration_var("AUDIT_AUTH_TIMEOUT"),
        }
    }
}
