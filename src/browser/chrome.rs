// src/browser/chrome.rs
//! [`BrowserDriver`] over the Chrome DevTools Protocol.

use super::selectors::VISIBLE_POSTS_JS;
use super::{BrowserDriver, KeyStroke, Locator, VisiblePost};
use crate::constants::ELEMENT_POLL_INTERVAL;
use crate::error::AppError;
use crate::text::is_effectively_empty;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// CDP modifier bits.
const MODIFIER_CTRL: i64 = 2;
const MODIFIER_META: i64 = 4;

/// Where and how to start Chrome.
#[derive(Debug, Clone)]
pub struct ChromeLaunch {
    /// Persistent user-data directory; keeps the login across runs.
    pub profile_dir: PathBuf,
    /// Explicit browser binary, otherwise a well-known location is searched.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    /// Diagnostics go to `<work_dir>/error_screenshots`.
    pub work_dir: PathBuf,
}

/// A live browser with a single working tab.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    diagnostics_dir: PathBuf,
}

impl ChromeSession {
    pub async fn launch(launch: &ChromeLaunch) -> Result<Self, AppError> {
        std::fs::create_dir_all(&launch.profile_dir)?;
        remove_stale_singleton_lock(&launch.profile_dir);

        let executable = launch
            .executable
            .clone()
            .or_else(find_chrome_executable)
            .ok_or_else(|| {
                AppError::Browser(
                    "Browser executable not found (tried Chrome, Chromium, Brave)".to_string(),
                )
            })?;

        log::info!(
            "Launching {} with profile {}",
            executable.display(),
            launch.profile_dir.display()
        );

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .user_data_dir(&launch.profile_dir)
            .window_size(1280, 1024)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--lang=ja-JP");
        if !launch.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(AppError::Browser)?;

        let (browser, handler) = Browser::launch(config).await?;
        let handler_task = spawn_handler_task(handler);
        let page = browser.new_page("about:blank").await?;

        Ok(Self {
            browser,
            page,
            handler_task,
            diagnostics_dir: launch.work_dir.join("error_screenshots"),
        })
    }

    /// Closes the browser and stops the event handler.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            log::debug!("Browser close: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            log::debug!("Browser wait: {}", e);
        }
        self.handler_task.abort();
    }

    async fn element(&self, locator: &Locator) -> Result<Element, AppError> {
        let Locator::Css(selector) = locator;
        self.page
            .find_element(selector.as_str())
            .await
            .map_err(|_| AppError::ElementNotFound(selector.clone()))
    }

    async fn dispatch_key(
        &self,
        key: &str,
        code: &str,
        key_code: i64,
        modifiers: i64,
        text: Option<&str>,
        command: Option<&str>,
    ) -> Result<(), AppError> {
        for (kind, is_down) in [
            (DispatchKeyEventType::KeyDown, true),
            (DispatchKeyEventType::KeyUp, false),
        ] {
            let mut builder = DispatchKeyEventParams::builder()
                .r#type(kind)
                .key(key)
                .code(code)
                .windows_virtual_key_code(key_code)
                .modifiers(modifiers);
            if is_down {
                if let Some(text) = text {
                    builder = builder.text(text);
                }
                if let Some(command) = command {
                    builder = builder.command(command);
                }
            }
            let params = builder.build().map_err(AppError::Browser)?;
            self.page.execute(params).await?;
        }
        Ok(())
    }
}

fn primary_modifier() -> i64 {
    if cfg!(target_os = "macos") {
        MODIFIER_META
    } else {
        MODIFIER_CTRL
    }
}

#[async_trait::async_trait]
impl BrowserDriver for ChromeSession {
    async fn goto(&self, url: &str) -> Result<(), AppError> {
        log::debug!("Navigating to {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AppError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<bool, AppError> {
        let Locator::Css(selector) = locator;
        let deadline = Instant::now() + timeout;
        loop {
            if self.page.find_element(selector.as_str()).await.is_ok() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(ELEMENT_POLL_INTERVAL).await;
        }
    }

    async fn click(&self, locator: &Locator) -> Result<(), AppError> {
        self.element(locator).await?.click().await?;
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), AppError> {
        let element = self.element(locator).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn paste_text(&self, locator: &Locator, text: &str) -> Result<(), AppError> {
        let element = self.element(locator).await?;
        element.click().await?;

        let owned = text.to_string();
        let copied = tokio::task::spawn_blocking(move || crate::clipboard::copy_text(&owned))
            .await
            .map_err(|e| AppError::Clipboard(e.to_string()))
            .and_then(|r| r);

        if copied.is_ok() {
            self.press(KeyStroke::Paste).await?;
            tokio::time::sleep(Duration::from_millis(500)).await;
            let current = element.inner_text().await?.unwrap_or_default();
            if !is_effectively_empty(&current) {
                return Ok(());
            }
            log::debug!("Paste left the input empty; typing instead");
        }
        element.type_str(text).await?;
        Ok(())
    }

    async fn press(&self, key: KeyStroke) -> Result<(), AppError> {
        match key {
            KeyStroke::Enter => self.dispatch_key("Enter", "Enter", 13, 0, Some("\r"), None).await,
            KeyStroke::SubmitShortcut => {
                self.dispatch_key("Enter", "Enter", 13, primary_modifier(), None, None)
                    .await
            }
            KeyStroke::Paste => {
                self.dispatch_key("v", "KeyV", 86, primary_modifier(), None, Some("paste"))
                    .await
            }
        }
    }

    async fn text_of(&self, locator: &Locator) -> Result<Option<String>, AppError> {
        let Locator::Css(selector) = locator;
        match self.page.find_element(selector.as_str()).await {
            Ok(element) => Ok(Some(element.inner_text().await?.unwrap_or_default())),
            Err(_) => Ok(None),
        }
    }

    async fn upload_file(&self, locator: &Locator, path: &Path) -> Result<(), AppError> {
        let element = self.element(locator).await?;
        let params = SetFileInputFilesParams::builder()
            .files(vec![path.to_string_lossy().to_string()])
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(AppError::Browser)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn visible_posts(&self) -> Result<Vec<VisiblePost>, AppError> {
        let value = self.page.evaluate(VISIBLE_POSTS_JS).await?;
        value
            .into_value::<Vec<VisiblePost>>()
            .map_err(|e| AppError::MalformedResponse(format!("visible posts: {}", e)))
    }

    async fn save_diagnostics(&self, label: &str) -> Result<Vec<PathBuf>, AppError> {
        std::fs::create_dir_all(&self.diagnostics_dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let base = self.diagnostics_dir.join(format!("{}_{}", label, stamp));
        let mut saved = Vec::new();

        let html_path = base.with_extension("html");
        match self.page.content().await {
            Ok(html) => {
                std::fs::write(&html_path, html)?;
                saved.push(html_path);
            }
            Err(e) => log::warn!("Could not read page source: {}", e),
        }

        let png_path = base.with_extension("png");
        let params = ScreenshotParams::builder().full_page(true).build();
        match self.page.save_screenshot(params, &png_path).await {
            Ok(_) => saved.push(png_path),
            Err(e) => log::warn!("Could not capture screenshot: {}", e),
        }
        Ok(saved)
    }
}

fn spawn_handler_task(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                log::debug!("CDP handler event error: {}", e);
            }
        }
    })
}

/// A crashed run leaves `SingletonLock` behind and Chrome then refuses the
/// profile.
fn remove_stale_singleton_lock(profile_dir: &Path) {
    let lock = profile_dir.join("SingletonLock");
    if std::fs::symlink_metadata(&lock).is_ok() {
        match std::fs::remove_file(&lock) {
            Ok(()) => log::info!("Removed stale profile lock {}", lock.display()),
            Err(e) => log::warn!("Could not remove {}: {}", lock.display(), e),
        }
    }
}

fn find_chrome_executable() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
        if Path::new(&p).exists() {
            return Some(PathBuf::from(p));
        }
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ]
    };

    candidates
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}
