// src/browser/mod.rs
//! Browser automation against the social-media site.
//!
//! Everything above this module talks to a [`BrowserDriver`]. The real
//! implementation is [`ChromeSession`] (Chrome over CDP); tests use a
//! scripted driver. Elements are addressed through [`Locator`]s taken from the
//! ordered lists in [`selectors`], and fallbacks are expressed as a
//! [`StrategyChain`].

mod chrome;
#[cfg(test)]
pub(crate) mod fake;
mod login;
pub mod selectors;
mod strategy;

pub use chrome::{ChromeLaunch, ChromeSession};
pub use login::{ensure_authenticated, SessionState};
pub use strategy::{Action, ChainOutcome, Step, StrategyChain};

use crate::constants::{ELEMENT_TIMEOUT, LOGIN_PROBE_TIMEOUT, MEDIA_ATTACH_TIMEOUT};
use crate::error::AppError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How an element is found on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css `{}`", selector),
        }
    }
}

/// Key presses sent to the focused element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyStroke {
    Enter,
    /// Ctrl+Enter (Cmd+Enter on macOS): submit the compose box.
    SubmitShortcut,
    /// Ctrl+V (Cmd+V on macOS).
    Paste,
}

/// A post rendered on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VisiblePost {
    pub url: String,
    pub author: String,
    pub text: String,
}

/// Waits used by the login machine and the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Pause after an action for the page to react.
    pub settle: Duration,
    /// Short probe for the authenticated-only element.
    pub probe: Duration,
    /// Wait for an element that should appear.
    pub element: Duration,
    /// Wait for the attachment preview after upload.
    pub media: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(3),
            probe: LOGIN_PROBE_TIMEOUT,
            element: ELEMENT_TIMEOUT,
            media: MEDIA_ATTACH_TIMEOUT,
        }
    }
}

impl Timing {
    /// No waiting at all, for scripted drivers.
    pub const fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            probe: Duration::ZERO,
            element: Duration::ZERO,
            media: Duration::ZERO,
        }
    }
}

/// The operations the login machine and the composer need from a browser.
#[async_trait::async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), AppError>;

    async fn current_url(&self) -> Result<String, AppError>;

    /// Polls until the element exists or `timeout` passes. A zero timeout
    /// checks once.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<bool, AppError>;

    async fn click(&self, locator: &Locator) -> Result<(), AppError>;

    /// Focuses the element and types `text` key by key.
    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), AppError>;

    /// Focuses the element and pastes `text` through the system clipboard,
    /// typing it instead when the clipboard is unavailable.
    async fn paste_text(&self, locator: &Locator, text: &str) -> Result<(), AppError>;

    async fn press(&self, key: KeyStroke) -> Result<(), AppError>;

    /// Visible text of the element, `None` when it is not on the page.
    async fn text_of(&self, locator: &Locator) -> Result<Option<String>, AppError>;

    /// Sets the file of an `<input type=file>`.
    async fn upload_file(&self, locator: &Locator, path: &Path) -> Result<(), AppError>;

    /// Posts currently rendered on the page, in document order.
    async fn visible_posts(&self) -> Result<Vec<VisiblePost>, AppError>;

    /// Saves page source and a screenshot for later debugging.
    async fn save_diagnostics(&self, label: &str) -> Result<Vec<PathBuf>, AppError>;
}

/// Saves diagnostics, logging instead of failing.
pub async fn capture_diagnostics<D: BrowserDriver + ?Sized>(driver: &D, label: &str) {
    match driver.save_diagnostics(label).await {
        Ok(paths) => {
            for path in paths {
                log::info!("Saved diagnostic {}", path.display());
            }
        }
        Err(e) => log::warn!("Could not save diagnostics for {}: {}", label, e),
    }
}
