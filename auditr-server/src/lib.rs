//! # auditr server
//!
//! HTTP surface of the auditr accessibility auditing service. Projects and
//! audits are managed over a JSON API under `/api/v1`; audits themselves run
//! in the background on a Chromium instance driven by [`auditr_core`].
//!
//! - [`routes`]: router assembly, CORS and request tracing
//! - [`handlers`]: request handlers per resource
//! - [`infra`]: shared state, error mapping and process wiring
//! - [`browser`] / [`checker`]: Chromium and axe-core backends

pub mod browser;
pub mod checker;
pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
