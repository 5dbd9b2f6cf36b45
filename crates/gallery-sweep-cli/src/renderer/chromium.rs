//! Chromium-based renderer using chromiumoxide.

use super::{NavigationResult, RenderedPage, Renderer};
use crate::config::Viewport;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use gallery_sweep::{DomSnapshot, IdleOutcome, PageHandle, SweepError, SweepResult, SNAPSHOT_SCRIPT};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Quiet period that counts as "network idle".
const IDLE_QUIET_MS: u64 = 1000;

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    // 1. --chromium / SWEEP_CHROMIUM_PATH
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!("configured Chromium path does not exist: {}", path.display());
    }

    // 2. System PATH
    for name in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Options fixed at browser launch.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub executable: Option<PathBuf>,
    pub viewport: Viewport,
    pub user_agent: String,
    /// Upper bound on any single browser command, navigation included.
    pub request_timeout: Duration,
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let chrome_path = find_chromium(options.executable.as_deref()).context(
            "Chromium not found. Install Chrome/Chromium or pass --chromium <path>.",
        )?;
        tracing::debug!("using Chromium at {}", chrome_path.display());

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(options.viewport.width, options.viewport.height)
            .viewport(None)
            .request_timeout(options.request_timeout)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--mute-audio")
            .arg(format!("--user-agent={}", options.user_agent))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler event error: {e}");
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn open_page(&self) -> Result<Box<dyn RenderedPage>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        Ok(Box::new(ChromiumPage { page }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.context("failed to close Chromium")?;
        self.handler.abort();
        Ok(())
    }
}

/// A single Chromium tab.
pub struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    async fn run_script(&self, script: String) -> SweepResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| SweepError::Page(format!("JS execution failed: {e}")))?;

        result
            .into_value()
            .map_err(|e| SweepError::Page(format!("failed to convert JS result: {e:?}")))
    }
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn snapshot(&self) -> SweepResult<DomSnapshot> {
        let value = self.run_script(SNAPSHOT_SCRIPT.to_string()).await?;
        serde_json::from_value(value).map_err(|e| SweepError::Snapshot(e.to_string()))
    }

    async fn scroll_by_viewport(&self, fraction: f64) -> SweepResult<()> {
        let script = format!(
            "(() => {{ window.scrollBy(0, Math.round(window.innerHeight * {fraction})); return window.scrollY; }})()"
        );
        self.run_script(script).await.map(|_| ())
    }

    async fn scroll_to_top(&self) -> SweepResult<()> {
        self.run_script("(() => { window.scrollTo(0, 0); return 0; })()".to_string())
            .await
            .map(|_| ())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> SweepResult<IdleOutcome> {
        let timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;
        let script = network_idle_script(timeout_ms);

        // The script bounds itself; the outer timeout covers a wedged renderer.
        let slack = timeout + Duration::from_millis(2 * IDLE_QUIET_MS);
        let evaluated = match tokio::time::timeout(slack, self.page.evaluate(script)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) if is_command_timeout(&e) => {
                tracing::warn!("network idle check timed out in the browser: {e}");
                return Ok(IdleOutcome::TimedOut);
            }
            Ok(Err(e)) => return Err(SweepError::Page(format!("JS execution failed: {e}"))),
            Err(_) => return Ok(IdleOutcome::TimedOut),
        };

        let info: serde_json::Value = evaluated
            .into_value()
            .map_err(|e| SweepError::Page(format!("failed to convert JS result: {e:?}")))?;
        Ok(idle_outcome(&info))
    }
}

#[async_trait]
impl RenderedPage for ChromiumPage {
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult> {
        let start = Instant::now();

        self.page
            .goto(url)
            .await
            .with_context(|| format!("failed to load {url}"))?;
        let _ = self.page.wait_for_navigation().await;

        let load_time_ms = start.elapsed().as_millis() as u64;
        let final_url = self
            .current_url()
            .await
            .unwrap_or_else(|_| url.to_string());

        Ok(NavigationResult {
            final_url,
            load_time_ms,
        })
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await.context("failed to close page")?;
        Ok(())
    }
}

fn is_command_timeout(err: &CdpError) -> bool {
    matches!(err, CdpError::Timeout)
}

/// Read the idle script's report.
fn idle_outcome(info: &serde_json::Value) -> IdleOutcome {
    let ok = info.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
    let waited = info.get("waitedMs").and_then(|v| v.as_u64()).unwrap_or(0);
    let resources = info
        .get("resourceCount")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    tracing::debug!("network idle check: ok={ok} resources={resources} waited={waited}ms");

    if ok {
        IdleOutcome::Settled
    } else {
        IdleOutcome::TimedOut
    }
}

/// Resource-count polling: idle once the count holds steady for `IDLE_QUIET_MS`
/// with the document fully loaded.
fn network_idle_script(timeout_ms: u64) -> String {
    format!(
        r#"(async () => {{
            const timeoutMs = {timeout_ms};
            const idleMs = {IDLE_QUIET_MS};
            const interval = 250;
            const start = Date.now();
            let lastCount = 0;
            let stableMs = 0;
            try {{ lastCount = performance.getEntriesByType('resource').length; }} catch (_) {{ lastCount = 0; }}
            while (Date.now() - start < timeoutMs) {{
                await new Promise(r => setTimeout(r, interval));
                let curCount = lastCount;
                try {{ curCount = performance.getEntriesByType('resource').length; }} catch (_) {{ curCount = lastCount; }}
                if (document.readyState === 'complete' && curCount === lastCount) {{
                    stableMs += interval;
                    if (stableMs >= idleMs) {{
                        return {{ ok: true, resourceCount: curCount, waitedMs: Date.now() - start }};
                    }}
                }} else {{
                    stableMs = 0;
                }}
                lastCount = curCount;
            }}
            return {{ ok: false, resourceCount: lastCount, waitedMs: Date.now() - start }};
        }})()"#
    )
}
