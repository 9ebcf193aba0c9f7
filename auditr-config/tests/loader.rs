use std::{fs, time::Duration};

use auditr_config::{ConfigLoadError, ConfigLoader};
use once_cell::sync::Lazy;
use tempfile::tempdir;
use tokio::sync::Mutex;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const MANAGED_VARS: &[&str] = &[
    "AUDITR_CONFIG_PATH",
    "SERVER_HOST",
    "SERVER_PORT",
    "DATABASE_URL",
    "CORS_ALLOWED_ORIGINS",
    "CHROME_EXECUTABLE",
    "CHROME_NO_SANDBOX",
    "CHROME_EXTRA_ARGS",
    "AXE_SCRIPT_PATH",
    "AXE_SCRIPT_URL",
    "AXE_RULE_TAGS",
    "AUDIT_MAX_PAGES",
    "AUDIT_NAVIGATION_TIMEOUT",
    "AUDIT_AUTH_TIMEOUT",
];

fn clear_env() {
    for key in MANAGED_VARS {
        unsafe { std::env::remove_var(key) };
    }
}

#[tokio::test]
async fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();

    let load = ConfigLoader::new()
        .without_env_file()
        .load()
        .expect("load defaults");
    let config = load.config;

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 3001);
    assert!(config.database.url.is_none());
    assert_eq!(config.cors.allowed_origins, vec!["http://localhost:5173"]);
    assert_eq!(config.audit.max_pages, 20);
    assert_eq!(config.audit.navigation_timeout, Duration::from_secs(30));
    assert_eq!(config.audit.auth_timeout, Duration::from_secs(300));
    assert_eq!(config.checker.rule_tags.len(), 5);

    let messages: Vec<_> = load
        .warnings
        .items
        .iter()
        .map(|w| w.message.as_str())
        .collect();
    assert!(messages.iter().any(|m| m.contains("No auditr.toml")));
    assert!(messages.iter().any(|m| m.contains("DATABASE_URL")));
}

#[tokio::test]
async fn file_values_parse_humantime_durations() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("auditr.toml");
    fs::write(
        &path,
        r#"
[server]
port = 8080

[database]
url = "postgresql://auditr@localhost:5432/auditr"

[audit]
max_pages = 7
auth_timeout = "90s"
settle_quiet_window = "250ms"
second_level_clicks = 2

[checker]
rule_tags = ["wcag2a"]
"#,
    )
    .expect("write config");

    let config = ConfigLoader::new()
        .without_env_file()
        .with_config_path(&path)
        .load()
        .expect("load file")
        .config;

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.audit.max_pages, 7);
    assert_eq!(config.audit.auth_timeout, Duration::from_secs(90));
    assert_eq!(config.audit.settle_quiet_window, Duration::from_millis(250));
    assert_eq!(config.audit.second_level_clicks, 2);
    assert_eq!(config.audit.navigation_timeout, Duration::from_secs(30));
    assert_eq!(config.checker.rule_tags, vec!["wcag2a"]);
    assert_eq!(config.metadata.config_path.as_deref(), Some(path.as_path()));
}

#[tokio::test]
async fn environment_overrides_file() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("auditr.toml");
    fs::write(&path, "[server]\nport = 8080\n[audit]\nmax_pages = 7\n")
        .expect("write config");

    unsafe {
        std::env::set_var("SERVER_PORT", "9090");
        std::env::set_var("AUDIT_MAX_PAGES", "3");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "http://a.test, http://b.test");
        std::env::set_var("AUDIT_AUTH_TIMEOUT", "2m");
    }

    let config = ConfigLoader::new()
        .without_env_file()
        .with_config_path(&path)
        .load()
        .expect("load")
        .config;
    clear_env();

    assert_eq!(config.server.port, 9090);
    assert_eq!(config.audit.max_pages, 3);
    assert_eq!(config.audit.auth_timeout, Duration::from_secs(120));
    assert_eq!(
        config.cors.allowed_origins,
        vec!["http://a.test", "http://b.test"]
    );
}

#[tokio::test]
async fn explicit_missing_file_is_an_error() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();

    let dir = tempdir().expect("tempdir");
    let err = ConfigLoader::new()
        .without_env_file()
        .with_config_path(dir.path().join("nope.toml"))
        .load()
        .expect_err("missing file");
    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[tokio::test]
async fn zero_page_budget_is_rejected() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("auditr.toml");
    fs::write(&path, "[audit]\nmax_pages = 0\n").expect("write config");

    let err = ConfigLoader::new()
        .without_env_file()
        .with_config_path(&path)
        .load()
        .expect_err("invalid budget");
    assert!(matches!(
        err,
        ConfigLoadError::InvalidValue {
            field: "audit.max_pages",
            ..
        }
    ));
}

#[tokio::test]
async fn malformed_duration_reports_parse_error() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("auditr.toml");
    fs::write(&path, "[audit]\nauth_timeout = \"soon\"\n").expect("write config");

    let err = ConfigLoader::new()
        .without_env_file()
        .with_config_path(&path)
        .load()
        .expect_err("bad duration");
    assert!(matches!(err, ConfigLoadError::Parse { .. }));
}
