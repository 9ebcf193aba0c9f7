//! Chrome DevTools Protocol backend for the engine's browser traits.

use std::time::Duration;

use async_trait::async_trait;
use auditr_config::BrowserConfig;
use auditr_core::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession, LaunchOptions};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    GetNavigationHistoryParams, NavigateToHistoryEntryParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::layout::Point;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const SANDBOX_ARGS: [&str; 2] = ["--no-sandbox", "--disable-setuid-sandbox"];
const COMMON_ARGS: [&str; 2] = ["--disable-dev-shm-usage", "--disable-gpu"];

fn protocol(err: impl ToString) -> BrowserError {
    BrowserError::Protocol(err.to_string())
}

/// Launches one Chromium process per audit.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn cdp_config(&self, options: LaunchOptions) -> Result<CdpConfig, BrowserError> {
        let mut builder = CdpConfig::builder();

        if options.headless {
            builder = builder
                .window_size(self.config.viewport_width, self.config.viewport_height)
                .viewport(Viewport {
                    width: self.config.viewport_width,
                    height: self.config.viewport_height,
                    ..Viewport::default()
                });
        } else {
            // A person drives the login, so use the real window size.
            builder = builder
                .with_head()
                .viewport(Option::<Viewport>::None)
                .arg("--start-maximized");
        }

        if self.config.no_sandbox {
            for arg in SANDBOX_ARGS {
                builder = builder.arg(arg);
            }
        }
        for arg in COMMON_ARGS {
            builder = builder.arg(arg);
        }
        for arg in &self.config.extra_args {
            builder = builder.arg(arg.clone());
        }
        if let Some(executable) = &self.config.executable {
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(BrowserError::Launch)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(
        &self,
        options: LaunchOptions,
    ) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let config = self.cdp_config(options)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "CDP handler stopped");
                    break;
                }
            }
        });

        debug!(headless = options.headless, "chromium launched");
        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
            closed: false,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    closed: bool,
}

impl std::fmt::Debug for ChromiumSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumSession")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(protocol)?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = self.browser.close().await.map(|_| ()).map_err(protocol);
        if let Err(err) = self.browser.wait().await {
            warn!(error = %err, "chromium did not exit cleanly");
        }
        self.handler_task.abort();
        result
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

#[derive(Debug, Clone)]
struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(BrowserError::navigation(url, err)),
            Err(_) => Err(BrowserError::navigation_timeout(url, timeout)),
        }
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(BrowserError::Script)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|err| BrowserError::Script(err.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), BrowserError> {
        self.page
            .click(Point { x, y })
            .await
            .map(|_| ())
            .map_err(protocol)
    }

    async fn title(&self) -> Result<String, BrowserError> {
        let title = self.page.get_title().await.map_err(protocol)?;
        Ok(title.unwrap_or_default())
    }

    async fn url(&self) -> Result<String, BrowserError> {
        let url = self.page.url().await.map_err(protocol)?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn go_back(&self, timeout: Duration) -> Result<(), BrowserError> {
        let history = self
            .page
            .execute(GetNavigationHistoryParams::default())
            .await
            .map_err(protocol)?;
        let current = usize::try_from(history.result.current_index).unwrap_or(0);
        let Some(previous) = current
            .checked_sub(1)
            .and_then(|idx| history.result.entries.get(idx))
        else {
            return Err(BrowserError::navigation("about:back", "no history entry"));
        };

        let url = previous.url.clone();
        let navigate = self
            .page
            .execute(NavigateToHistoryEntryParams::new(previous.id));
        match tokio::time::timeout(timeout, navigate).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(BrowserError::navigation(url, err)),
            Err(_) => Err(BrowserError::navigation_timeout(url, timeout)),
        }
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.page.clone().close().await.map_err(protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headful_launch_keeps_the_real_window() {
        let launcher = ChromiumLauncher::new(BrowserConfig {
            executable: Some("/usr/bin/chromium".into()),
            ..BrowserConfig::default()
        });
        assert!(launcher.cdp_config(LaunchOptions { headless: false }).is_ok());
        assert!(launcher.cdp_config(LaunchOptions { headless: true }).is_ok());
    }
}
