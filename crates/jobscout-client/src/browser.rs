//! Headless Chromium executor (behind the `browser` feature).
//!
//! A fixed number of Chromium processes are launched at startup; each fetch
//! leases one, opens a stealth tab, behaves a little like a person, and
//! returns the rendered DOM. In challenge mode the tab is polled until the
//! anti-bot interstitial clears or the challenge timeout runs out.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use jobscout_core::classifier::ResponseClassifier;
use jobscout_core::error::AppError;
use jobscout_core::fetch::{FetchMode, RawResponse, StrategyKind};
use jobscout_core::traits::FetchExecutor;
use jobscout_core::util::host_of;
use rand::Rng;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::fingerprint::SessionFingerprints;
use crate::guard::validate_target;
use crate::timing::{BrowserBehavior, pick_duration};

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Number of Chromium processes in the pool.
    pub pool_size: usize,
    pub chrome_bin: Option<PathBuf>,
    pub navigation_timeout: Duration,
    /// Upper bound on waiting for a challenge page to clear.
    pub challenge_timeout: Duration,
    pub challenge_poll_interval: Duration,
    /// A cleared challenge page must be at least this long.
    pub min_content_chars: usize,
    pub behavior: BrowserBehavior,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            pool_size: 2,
            chrome_bin: None,
            navigation_timeout: Duration::from_secs(30),
            challenge_timeout: Duration::from_secs(30),
            challenge_poll_interval: Duration::from_secs(2),
            min_content_chars: 1000,
            behavior: BrowserBehavior::default(),
        }
    }
}

/// Bounded set of launched browsers, handed out one lease at a time.
#[derive(Clone)]
pub struct BrowserPool {
    idle: Arc<Mutex<Vec<Arc<Browser>>>>,
    permits: Arc<Semaphore>,
}

/// Exclusive use of one browser; returned to the pool on drop.
pub struct BrowserLease {
    browser: Option<Arc<Browser>>,
    idle: Arc<Mutex<Vec<Arc<Browser>>>>,
    _permit: OwnedSemaphorePermit,
}

impl BrowserLease {
    fn browser(&self) -> Result<&Browser, AppError> {
        self.browser
            .as_deref()
            .ok_or_else(|| AppError::ExecutorUnavailable("browser lease is empty".into()))
    }
}

impl Drop for BrowserLease {
    fn drop(&mut self) {
        if let Some(browser) = self.browser.take() {
            self.idle
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(browser);
        }
    }
}

impl BrowserPool {
    /// Launch `config.pool_size` headless browsers.
    pub async fn launch(config: &BrowserConfig) -> Result<Self, AppError> {
        let size = config.pool_size.max(1);
        let mut browsers = Vec::with_capacity(size);
        for _ in 0..size {
            browsers.push(Arc::new(launch_browser(config).await?));
        }
        tracing::info!(size, "Browser pool ready");
        Ok(Self {
            idle: Arc::new(Mutex::new(browsers)),
            permits: Arc::new(Semaphore::new(size)),
        })
    }

    pub async fn lease(&self) -> Result<BrowserLease, AppError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| AppError::ExecutorUnavailable("browser pool closed".into()))?;
        let browser = self.idle.lock().unwrap_or_else(|p| p.into_inner()).pop();
        Ok(BrowserLease {
            browser,
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }
}

async fn launch_browser(config: &BrowserConfig) -> Result<Browser, AppError> {
    let mut builder = ChromeConfig::builder().no_sandbox().disable_default_args();
    if let Some(bin) = config.chrome_bin.clone().or_else(find_chrome_binary) {
        tracing::info!("Using Chrome binary: {}", bin.display());
        builder = builder.chrome_executable(bin);
    }

    let chrome_config = builder
        .arg("--headless=new")
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-popup-blocking")
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--no-first-run")
        .build()
        .map_err(|e| AppError::ConfigError(format!("Browser config error: {e}")))?;

    let (browser, mut handler) = Browser::launch(chrome_config)
        .await
        .map_err(|e| AppError::ExecutorUnavailable(format!("Failed to launch browser: {e}")))?;

    // The CDP handler must be polled continuously for the connection to work.
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                tracing::warn!("Browser CDP handler error: {event:?}");
                break;
            }
        }
    });

    Ok(browser)
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// Snap's `/snap/bin/chromium` wrapper strips unknown flags, so the real
/// binary inside the snap is preferred. `None` lets chromiumoxide search.
fn find_chrome_binary() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Executor that renders pages in a leased headless browser.
#[derive(Clone)]
pub struct BrowserExecutor {
    pool: BrowserPool,
    config: Arc<BrowserConfig>,
    fingerprints: SessionFingerprints,
    classifier: ResponseClassifier,
}

impl BrowserExecutor {
    pub fn new(pool: BrowserPool, config: BrowserConfig, fingerprints: SessionFingerprints) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            fingerprints,
            classifier: ResponseClassifier::default(),
        }
    }

    /// Launch the pool and build the executor in one step.
    pub async fn launch(config: BrowserConfig, fingerprints: SessionFingerprints) -> Result<Self, AppError> {
        let pool = BrowserPool::launch(&config).await?;
        Ok(Self::new(pool, config, fingerprints))
    }

    async fn render(&self, browser: &Browser, url: &str, mode: FetchMode) -> Result<String, AppError> {
        let fingerprint = self.fingerprints.for_domain(&host_of(url).unwrap_or_default());
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to open tab: {e}")))?;

        let result = async {
            page.enable_stealth_mode_with_agent(&fingerprint.user_agent)
                .await
                .map_err(|e| AppError::HttpError(format!("Stealth setup failed: {e}")))?;
            let (width, height) = fingerprint.viewport;
            let metrics = SetDeviceMetricsOverrideParams::new(width as i64, height as i64, 1.0, false);
            if let Err(e) = page.execute(metrics).await {
                tracing::debug!(error = %e, "Viewport override failed");
            }

            page.goto(url)
                .await
                .map_err(|e| AppError::HttpError(format!("Failed to navigate to {url}: {e}")))?;
            simulate_reader(&page, &self.config.behavior, fingerprint.viewport).await;

            match mode {
                FetchMode::SolveChallenge => self.wait_for_challenge(&page, url).await,
                FetchMode::Normal => page
                    .content()
                    .await
                    .map_err(|e| AppError::HttpError(format!("Failed to read page content: {e}"))),
            }
        }
        .await;

        let _ = page.close().await;
        result
    }

    /// Poll until the page no longer looks like an interstitial.
    async fn wait_for_challenge(&self, page: &Page, url: &str) -> Result<String, AppError> {
        let started = Instant::now();
        loop {
            let html = page
                .content()
                .await
                .map_err(|e| AppError::HttpError(format!("Failed to read page content: {e}")))?;
            let cleared = html.len() > self.config.min_content_chars
                && self.classifier.classify(&html, 200, url).is_none();
            if cleared {
                tracing::info!(url, elapsed_ms = started.elapsed().as_millis() as u64, "Challenge cleared");
                return Ok(html);
            }
            if started.elapsed() + self.config.challenge_poll_interval > self.config.challenge_timeout {
                tracing::warn!(url, "Challenge did not clear in time");
                return Ok(html);
            }
            tokio::time::sleep(self.config.challenge_poll_interval).await;
        }
    }
}

/// Scroll, wiggle the mouse and sometimes pause to read.
async fn simulate_reader(page: &Page, behavior: &BrowserBehavior, viewport: (u32, u32)) {
    for _ in 0..behavior.scroll_count() {
        let dy = rand::thread_rng().gen_range(200..700);
        let _ = page.evaluate(format!("window.scrollBy(0, {dy})")).await;
        tokio::time::sleep(pick_duration(&(Duration::from_millis(200)..Duration::from_millis(700)))).await;
    }
    for _ in 0..behavior.mouse_move_count() {
        let (x, y) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(0..viewport.0.max(1)), rng.gen_range(0..viewport.1.max(1)))
        };
        let script = format!(
            "document.dispatchEvent(new MouseEvent('mousemove', {{clientX: {x}, clientY: {y}, bubbles: true}}))"
        );
        let _ = page.evaluate(script).await;
        tokio::time::sleep(pick_duration(&(Duration::from_millis(50)..Duration::from_millis(250)))).await;
    }
    if let Some(pause) = behavior.reading_pause() {
        tokio::time::sleep(pause).await;
    }
}

impl FetchExecutor for BrowserExecutor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Browser
    }

    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<RawResponse, AppError> {
        validate_target(url).await?;
        let lease = self.pool.lease().await?;
        let budget = match mode {
            FetchMode::Normal => self.config.navigation_timeout,
            FetchMode::SolveChallenge => self.config.navigation_timeout + self.config.challenge_timeout,
        };

        let html = tokio::time::timeout(budget, self.render(lease.browser()?, url, mode))
            .await
            .map_err(|_| AppError::Timeout(budget.as_secs()))??;
        tracing::debug!(url, ?mode, bytes = html.len(), "Browser fetch");
        Ok(RawResponse::new(html, 200))
    }
}
