//! # auditr core
//!
//! The audit engine behind the auditr service: it drives a controlled
//! browser across a target site, discovers pages (including client-side
//! routes that never show up as links), runs an accessibility rule engine
//! on each page and folds the findings into the RGAA criteria catalog.
//!
//! ## Feature Flags
//!
//! - `database`: PostgreSQL stores and the embedded migrations (default)
//! - `test-support`: scripted browser and checker fakes in [`testing`]
//!
//! ## Architecture
//!
//! - [`orchestrator`]: audit lifecycle, one background task per audit
//! - [`auth_signal`]: hand-off between a paused audit and a login confirmation
//! - [`discovery`]: bounded same-origin page discovery
//! - [`scanner`]: per-page navigation and rule checking
//! - [`aggregate`]: criterion outcomes, summary and raw findings
//! - [`catalog`]: the criteria reference table
//! - [`browser`] / [`checker`]: capability traits implemented by the server
//! - [`store`]: persistence ports and implementations

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod aggregate;
pub mod auth_signal;
pub mod browser;
pub mod catalog;
pub mod checker;
pub mod discovery;
pub mod error;
pub mod orchestrator;
pub mod scanner;
pub mod store;

/// Scripted browser and checker fakes
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
#[allow(missing_docs)]
pub mod testing;

/// Embedded migrations for the PostgreSQL stores.
#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use auth_signal::{AuthSignalError, AuthSignalRegistry, AuthWaiter};
pub use browser::{
    BrowserError, BrowserLauncher, BrowserPage, BrowserSession, LaunchOptions,
};
pub use catalog::{Catalog, criteria_for_rule};
pub use checker::{AccessibilityChecker, CheckerError, CheckerReport, RuleFinding};
pub use error::{AuditError, Result};
pub use orchestrator::{AuditOrchestrator, AuditOrchestratorBuilder, AuditTicket};
pub use scanner::{PageFindings, PageScan, PageScanner};
pub use store::{
    AuditStore, InMemoryAuditStore, InMemoryProjectStore, ProjectStore,
    StoreError, StoreResult,
};
#[cfg(feature = "database")]
pub use store::{PostgresAuditStore, PostgresProjectStore};
