//! Browser process for a scrape run, via `chromiumoxide`.
//!
//! One [`BrowserSession`] owns one Chromium-family process and the single tab
//! a job lives in. [`wait_until_stable`] is the post-navigation settle check.

use anyhow::{anyhow, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::core::config::chrome_executable_override;

// The selector table describes the desktop layout, so only desktop UAs.
const DESKTOP_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
];

pub fn random_user_agent() -> &'static str {
    DESKTOP_USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

// ── Executable discovery ─────────────────────────────────────────────────────

const PATH_NAMES: &[&str] = &[
    "google-chrome",
    "chromium",
    "chromium-browser",
    "brave-browser",
    "chrome",
];

#[cfg(target_os = "linux")]
const INSTALL_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];
#[cfg(target_os = "macos")]
const INSTALL_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
];
#[cfg(target_os = "windows")]
const INSTALL_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const INSTALL_PATHS: &[&str] = &[];

/// First hit of `lookup` over `names`, else the first install path that
/// exists.
fn locate<F>(names: &[&str], installs: &[&str], lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    names.iter().find_map(|n| lookup(*n)).or_else(|| {
        installs
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
    })
}

/// `CHROME_EXECUTABLE`, else PATH, else the platform's usual install paths.
pub fn find_chrome_executable() -> Option<String> {
    if let Some(p) = chrome_executable_override() {
        return Some(p);
    }
    locate(PATH_NAMES, INSTALL_PATHS, |n| which::which(n).ok())
        .map(|p| p.to_string_lossy().into_owned())
}

// ── Session ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headful: bool,
    pub width: u32,
    pub height: u32,
    pub user_agent: String,
}

impl LaunchOptions {
    pub fn new(headful: bool) -> Self {
        Self {
            headful,
            width: 1366,
            height: 900,
            user_agent: random_user_agent().to_string(),
        }
    }

    fn browser_config(&self, exe: &Path) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(exe)
            .viewport(Viewport {
                width: self.width,
                height: self.height,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .window_size(self.width, self.height)
            .args([
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--no-first-run",
                "--mute-audio",
                "--disable-blink-features=AutomationControlled",
            ])
            .arg(format!("--user-agent={}", self.user_agent));
        if self.headful {
            builder = builder.with_head();
        }
        builder
            .build()
            .map_err(|e| anyhow!("invalid browser config: {}", e))
    }
}

/// One browser process and the tab the job lives in.
///
/// Only the tab survives between pipeline steps; everything the job knows is
/// in the job store.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: tokio::task::JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let exe = find_chrome_executable().ok_or_else(|| {
            anyhow!("no Chrome/Chromium found; set CHROME_EXECUTABLE to the browser binary")
        })?;
        info!(
            "browser: launching {} ({})",
            exe,
            if options.headful { "headful" } else { "headless" }
        );

        let config = options.browser_config(Path::new(&exe))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow!("browser: launch of {} failed: {}", exe, e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser: CDP handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow!("browser: could not open the job tab: {}", e))?;

        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("browser: close failed: {}", e);
        }
        self.handler_task.abort();
        info!("browser: shut down");
    }
}

// ── Settle check ─────────────────────────────────────────────────────────────

const SETTLE_POLL: Duration = Duration::from_millis(250);

const LOAD_PROBE: &str = "JSON.stringify({ \
     ready: document.readyState === 'complete', \
     resources: performance.getEntriesByType('resource').length })";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
struct LoadProbe {
    ready: bool,
    resources: u64,
}

async fn probe(page: &Page) -> LoadProbe {
    page.evaluate(LOAD_PROBE)
        .await
        .ok()
        .and_then(|v| v.into_value::<String>().ok())
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Return once the document is complete and no new resource entry has
/// appeared for `quiet`, or after `timeout`. Never fails: a page that keeps
/// loading is still worth inspecting.
pub async fn wait_until_stable(page: &Page, quiet: Duration, timeout: Duration) -> Result<()> {
    let start = Instant::now();
    let mut last = LoadProbe::default();
    let mut quiet_since = Instant::now();

    while start.elapsed() < timeout {
        let now = probe(page).await;
        if !now.ready || now != last {
            last = now;
            quiet_since = Instant::now();
        } else if quiet_since.elapsed() >= quiet {
            debug!(
                "browser: settled in {}ms ({} resources)",
                start.elapsed().as_millis(),
                now.resources
            );
            return Ok(());
        }
        tokio::time::sleep(SETTLE_POLL).await;
    }
    debug!("browser: still loading after {}ms", timeout.as_millis());
    Ok(())
}
