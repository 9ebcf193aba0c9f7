//! Shared configuration library for auditr.
//!
//! Configuration is composed from a TOML file, the process environment
//! (after `.env` has been loaded) and built-in defaults. The server and the
//! audit engine both consume the typed [`Config`] produced here.
#![allow(missing_docs)]

pub mod constants;
pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::{
    AuditConfig, BrowserConfig, CheckerConfig, Config, ConfigMetadata,
    CorsConfig, DatabaseConfig, ServerConfig,
};
pub use validation::{ConfigWarning, ConfigWarnings};
