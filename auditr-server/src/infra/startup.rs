//! Process wiring: tracing, stores and the audit engine.

use std::sync::Arc;

use anyhow::Context;
use auditr_config::Config;
use auditr_core::{
    AuditOrchestrator, AuditStore, InMemoryAuditStore, InMemoryProjectStore,
    ProjectStore,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::browser::ChromiumLauncher;
use crate::checker::AxeChecker;
use crate::infra::app_state::AppState;

const DEFAULT_LOG_FILTER: &str = "info,auditr_core=info,tower_http=warn";

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub struct Stores {
    pub projects: Arc<dyn ProjectStore>,
    pub audits: Arc<dyn AuditStore>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            projects: Arc::new(InMemoryProjectStore::new()),
            audits: Arc::new(InMemoryAuditStore::new()),
        }
    }
}

#[cfg(feature = "database")]
async fn connect_pool(database_url: &str) -> anyhow::Result<sqlx::PgPool> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to PostgreSQL")
}

/// Apply the embedded schema migrations.
#[cfg(feature = "database")]
pub async fn run_migrations(config: &Config) -> anyhow::Result<()> {
    let database_url = config
        .database
        .url
        .as_deref()
        .context("DATABASE_URL is required to run migrations")?;
    let pool = connect_pool(database_url).await?;
    auditr_core::MIGRATOR
        .run(&pool)
        .await
        .context("database migration failed")?;
    Ok(())
}

#[cfg(not(feature = "database"))]
pub async fn run_migrations(_config: &Config) -> anyhow::Result<()> {
    anyhow::bail!("auditr-server was built without the `database` feature")
}

/// Postgres stores when a database URL is configured, in-memory otherwise.
pub async fn connect_stores(config: &Config) -> anyhow::Result<Stores> {
    let Some(database_url) = config.database.url.as_deref() else {
        warn!("no DATABASE_URL configured; audits are kept in memory only");
        return Ok(Stores::in_memory());
    };

    #[cfg(feature = "database")]
    {
        let pool = connect_pool(database_url).await?;
        auditr_core::MIGRATOR
            .run(&pool)
            .await
            .context("database migration failed")?;
        info!("connected to PostgreSQL and applied migrations");
        Ok(Stores {
            projects: Arc::new(auditr_core::PostgresProjectStore::new(pool.clone())),
            audits: Arc::new(auditr_core::PostgresAuditStore::new(pool)),
        })
    }

    #[cfg(not(feature = "database"))]
    {
        let _ = database_url;
        warn!("DATABASE_URL ignored: built without the `database` feature");
        Ok(Stores::in_memory())
    }
}

/// Build the handler state backed by Chromium and axe-core.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let stores = connect_stores(config).await?;

    let orchestrator = AuditOrchestrator::builder(config.audit.clone())
        .with_projects(Arc::clone(&stores.projects))
        .with_audits(stores.audits)
        .with_launcher(Arc::new(ChromiumLauncher::new(config.browser.clone())))
        .with_checker(Arc::new(AxeChecker::new(config.checker.clone())))
        .with_rule_tags(config.checker.rule_tags.clone())
        .build()
        .context("failed to assemble the audit engine")?;

    info!(
        max_pages = config.audit.max_pages,
        auth_timeout = %humantime::format_duration(config.audit.auth_timeout),
        "audit engine ready"
    );
    Ok(AppState::new(stores.projects, orchestrator))
}
