pub mod error;

use once_cell::sync::Lazy;
use std::{fs, path::PathBuf};
use url::Url;

use crate::constants::{DEFAULT_HOST, DEFAULT_PORT};
use crate::models::{
    AuditConfig, BrowserConfig, CheckerConfig, Config, ConfigMetadata,
    CorsConfig, DatabaseConfig, ServerConfig,
    sources::{EnvConfig, FileConfig},
};
use crate::validation::{self, ConfigWarnings};

use error::ConfigLoadError;

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("auditr.toml"),
        PathBuf::from("config/auditr.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Skip `.env` discovery entirely.
    pub skip_env_file: bool,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn without_env_file(mut self) -> Self {
        self.options.skip_env_file = true;
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = self.load_env_file()?;
        let env_config = EnvConfig::gather();

        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let (config, warnings) = self.compose_config(
            file_config,
            env_config,
            config_path,
            env_file_loaded,
        )?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        if self.options.skip_env_file {
            return Ok(false);
        }
        let loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true),
            None => dotenvy::dotenv().map(|_| true),
        };
        match loaded {
            Ok(loaded) => Ok(loaded),
            Err(dotenvy::Error::Io(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = if let Some(explicit) = &self.options.config_path
        {
            (explicit.clone(), true)
        } else if let Some(from_env) = &env_config.config_path {
            (from_env.clone(), true)
        } else {
            match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(found) => (found.clone(), false),
                None => return Ok((None, None)),
            }
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
        env_file_loaded: bool,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if config_path.is_none() {
            warnings.push_with_hint(
                "No auditr.toml detected; falling back to environment variables",
                "Create auditr.toml or set AUDITR_CONFIG_PATH",
            );
        }

        let FileConfig {
            server: file_server,
            database: file_database,
            cors: file_cors,
            browser: file_browser,
            checker: file_checker,
            audit: file_audit,
        } = file_config.unwrap_or_default();

        let server = ServerConfig {
            host: env
                .server_host
                .clone()
                .filter(|value| !value.trim().is_empty())
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let database_url = env
            .database_url
            .clone()
            .or(file_database.url)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        if let Some(url) = database_url.as_deref() {
            Url::parse(url).map_err(|source| {
                ConfigLoadError::InvalidDatabaseUrl { source }
            })?;
        }
        let database = DatabaseConfig { url: database_url };

        let cors = CorsConfig {
            allowed_origins: env
                .cors_allowed_origins
                .clone()
                .or(file_cors.allowed_origins)
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        let browser_defaults = BrowserConfig::default();
        let browser = BrowserConfig {
            executable: env.chrome_executable.clone().or(file_browser.executable),
            no_sandbox: env
                .chrome_no_sandbox
                .or(file_browser.no_sandbox)
                .unwrap_or(browser_defaults.no_sandbox),
            viewport_width: file_browser
                .viewport_width
                .unwrap_or(browser_defaults.viewport_width),
            viewport_height: file_browser
                .viewport_height
                .unwrap_or(browser_defaults.viewport_height),
            extra_args: env
                .chrome_extra_args
                .clone()
                .or(file_browser.extra_args)
                .unwrap_or_default(),
        };

        let checker_defaults = CheckerConfig::default();
        let checker = CheckerConfig {
            axe_script_path: env
                .axe_script_path
                .clone()
                .or(file_checker.axe_script_path),
            axe_script_url: env
                .axe_script_url
                .clone()
                .or(file_checker.axe_script_url)
                .unwrap_or(checker_defaults.axe_script_url),
            rule_tags: env
                .axe_rule_tags
                .clone()
                .or(file_checker.rule_tags)
                .unwrap_or(checker_defaults.rule_tags),
        };

        let defaults = AuditConfig::default();
        let audit = AuditConfig {
            max_pages: env
                .audit_max_pages
                .or(file_audit.max_pages)
                .unwrap_or(defaults.max_pages),
            navigation_timeout: env
                .audit_navigation_timeout
                .or(file_audit.navigation_timeout)
                .unwrap_or(defaults.navigation_timeout),
            auth_timeout: env
                .audit_auth_timeout
                .or(file_audit.auth_timeout)
                .unwrap_or(defaults.auth_timeout),
            settle_quiet_window: file_audit
                .settle_quiet_window
                .unwrap_or(defaults.settle_quiet_window),
            settle_ceiling: file_audit
                .settle_ceiling
                .unwrap_or(defaults.settle_ceiling),
            click_settle_ceiling: file_audit
                .click_settle_ceiling
                .unwrap_or(defaults.click_settle_ceiling),
            click_delay: file_audit.click_delay.unwrap_or(defaults.click_delay),
            second_level_clicks: file_audit
                .second_level_clicks
                .unwrap_or(defaults.second_level_clicks),
            return_navigation_timeout: file_audit
                .return_navigation_timeout
                .unwrap_or(defaults.return_navigation_timeout),
            back_navigation_timeout: file_audit
                .back_navigation_timeout
                .unwrap_or(defaults.back_navigation_timeout),
        };

        if audit.max_pages == 0 {
            return Err(ConfigLoadError::InvalidValue {
                field: "audit.max_pages",
                reason: "must be at least 1".into(),
            });
        }
        if audit.navigation_timeout.is_zero() {
            return Err(ConfigLoadError::InvalidValue {
                field: "audit.navigation_timeout",
                reason: "must be greater than zero".into(),
            });
        }

        let config = Config {
            server,
            database,
            cors,
            browser,
            checker,
            audit,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        };

        warnings.extend(validation::collect_warnings(&config));

        Ok((config, warnings))
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
