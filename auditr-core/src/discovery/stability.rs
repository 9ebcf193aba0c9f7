//! Waiting for client-rendered pages to settle.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::browser::BrowserPage;

/// Decides when a page has stopped re-rendering.
#[async_trait]
pub trait StabilityDetector: Send + Sync {
    /// Resolve once the page looks settled or `ceiling` has elapsed. Never
    /// fails: a page that cannot be observed is treated as settled after a
    /// short pause.
    async fn wait_for_settle(&self, page: &dyn BrowserPage, ceiling: Duration);
}

/// Waits for a quiet window with no DOM mutations, observed in-page.
#[derive(Debug, Clone)]
pub struct MutationStabilityDetector {
    quiet_window: Duration,
    fallback_pause: Duration,
}

const FIRST_CHECK_DELAY_MS: u128 = 400;

impl MutationStabilityDetector {
    /// Settle once no DOM mutation has been seen for `quiet_window`.
    pub fn new(quiet_window: Duration) -> Self {
        Self {
            quiet_window,
            fallback_pause: Duration::from_secs(1),
        }
    }

    /// Pause used when the page cannot be observed.
    pub fn with_fallback_pause(mut self, pause: Duration) -> Self {
        self.fallback_pause = pause;
        self
    }

    fn script(&self, ceiling: Duration) -> String {
        format!(
            r#"new Promise((resolve) => {{
  const root = document.body || document.documentElement;
  let last = Date.now();
  let done = false;
  const finish = (observer) => {{ if (!done) {{ done = true; if (observer) {{ observer.disconnect(); }} resolve(true); }} }};
  if (!root) {{ resolve(true); return; }}
  const observer = new MutationObserver(() => {{ last = Date.now(); }});
  observer.observe(root, {{ childList: true, subtree: true, attributes: true }});
  const check = () => {{
    if (done) {{ return; }}
    if (Date.now() - last > {quiet}) {{ finish(observer); }} else {{ requestAnimationFrame(check); }}
  }};
  setTimeout(check, {first});
  setTimeout(() => finish(observer), {ceiling});
}})"#,
            quiet = self.quiet_window.as_millis(),
            first = FIRST_CHECK_DELAY_MS,
            ceiling = ceiling.as_millis(),
        )
    }
}

impl Default for MutationStabilityDetector {
    fn default() -> Self {
        Self::new(Duration::from_millis(600))
    }
}

#[async_trait]
impl StabilityDetector for MutationStabilityDetector {
    async fn wait_for_settle(&self, page: &dyn BrowserPage, ceiling: Duration) {
        let script = self.script(ceiling);
        // The in-page promise resolves by `ceiling`; the outer bound covers a
        // page that stops answering.
        let guard = ceiling + self.fallback_pause;
        match tokio::time::timeout(guard, page.evaluate(&script)).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                debug!(error = %err, "settle observation failed; pausing instead");
                tokio::time::sleep(self.fallback_pause).await;
            }
            Err(_) => {
                debug!(ceiling_ms = ceiling.as_millis() as u64, "settle observation hung");
            }
        }
    }
}
