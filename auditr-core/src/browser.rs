//! Browser capability seams.
//!
//! The engine never talks to a concrete browser. It drives these traits, and
//! the server wires in a Chrome DevTools implementation while tests use the
//! scripted fakes from `testing`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by a browser backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    /// The browser process could not start.
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// A load did not finish in time.
    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout {
        /// Target address.
        url: String,
        /// Budget that ran out.
        timeout_ms: u64,
    },

    /// A load failed.
    #[error("navigation to {url} failed: {reason}")]
    Navigation {
        /// Target address.
        url: String,
        /// Backend message.
        reason: String,
    },

    /// A page script threw or returned something unusable.
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// The DevTools connection misbehaved.
    #[error("browser protocol error: {0}")]
    Protocol(String),

    /// The session was already closed.
    #[error("browser session closed")]
    Closed,
}

impl BrowserError {
    /// Timeout while loading `url`.
    pub fn navigation_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        BrowserError::NavigationTimeout {
            url: url.into(),
            timeout_ms: timeout.as_millis().try_into().unwrap_or(u64::MAX),
        }
    }

    /// Failed load of `url`.
    pub fn navigation(url: impl Into<String>, reason: impl ToString) -> Self {
        BrowserError::Navigation {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// How a browser session is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Headful sessions are used when a human has to log in.
    pub headless: bool,
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start a browser with `options`.
    async fn launch(
        &self,
        options: LaunchOptions,
    ) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// One running browser instance, exclusively owned by a single audit.
#[async_trait]
pub trait BrowserSession: Send {
    /// Open a fresh tab.
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, BrowserError>;

    /// Release the browser. Called exactly once on every exit path.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// One tab. Methods take `&self` so discovery and scanning can share it.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait for the load to finish, bounded by `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Evaluate a JavaScript expression in the page. Promises are awaited and
    /// the result is returned by value.
    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError>;

    /// Dispatch a mouse click at viewport coordinates.
    async fn click_at(&self, x: f64, y: f64) -> Result<(), BrowserError>;

    /// Document title of the current page.
    async fn title(&self) -> Result<String, BrowserError>;

    /// Current address, including client-side route changes.
    async fn url(&self) -> Result<String, BrowserError>;

    /// Step back one history entry, bounded by `timeout`.
    async fn go_back(&self, timeout: Duration) -> Result<(), BrowserError>;

    /// Close the page.
    async fn close(&self) -> Result<(), BrowserError>;
}
