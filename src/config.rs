// src/config.rs
//! Command-line surface and per-account configuration.
//!
//! The accounts file is read once at process start into an explicit
//! [`RunContext`] that is handed to every component.

use crate::error::AppError;
use crate::types::{ApiKey, CharLimitRange, NotionId, ValidatedUrl};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the accounts JSON file
    #[arg(long, global = true, env = "NOTION2POST_CONFIG", default_value = "accounts.json")]
    pub config: PathBuf,

    /// Directory for the log file
    #[arg(long, global = true, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Promote used rows when the pool runs dry, then post one item (two child processes)
    Run(Target),
    /// Reset used rows back to pending when fewer than the threshold remain
    Promote(Target),
    /// Post the least recently used pending row as a thread
    Post(Target),
    /// Create the content database in Notion
    InitDb(InitDbArgs),
    /// Check that the integration can read a Notion page
    Check(CheckArgs),
}

/// Selects the account and content database for a run.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Account name (a key in the accounts file)
    #[arg(long, default_value = "default")]
    pub account: String,

    /// Which content database to use
    #[arg(long, value_enum, default_value_t = ContentMode::Question)]
    pub mode: ContentMode,
}

#[derive(Args, Debug, Clone)]
pub struct InitDbArgs {
    /// Account name (a key in the accounts file)
    #[arg(long, default_value = "default")]
    pub account: String,

    /// Parent page URL or ID; defaults to the account's notion_parent_page_id
    #[arg(long, conflicts_with = "workspace")]
    pub parent_page: Option<String>,

    /// Create a new parent page at the workspace root first
    #[arg(long, default_value_t = false)]
    pub workspace: bool,

    /// Title of the new database
    #[arg(long, default_value = "Post queue")]
    pub title: String,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Account name (a key in the accounts file)
    #[arg(long, default_value = "default")]
    pub account: String,

    /// Page URL or ID to retrieve
    #[arg(long)]
    pub page: String,
}

/// Content database selector.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    Question,
    Joboffer,
}

impl ContentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentMode::Question => "question",
            ContentMode::Joboffer => "joboffer",
        }
    }
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Accounts file
// ---------------------------------------------------------------------------

/// The whole accounts file: account name → settings.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct AccountsFile {
    accounts: HashMap<String, AccountConfig>,
}

impl AccountsFile {
    /// Reads and parses the accounts file. Any failure is a configuration error.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::InvalidConfiguration {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&raw, path)
    }

    pub fn parse(raw: &str, path: &Path) -> Result<Self, AppError> {
        serde_json::from_str(raw).map_err(|e| AppError::InvalidConfiguration {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Takes the named account out of the file.
    pub fn into_account(mut self, name: &str) -> Result<AccountConfig, AppError> {
        self.accounts
            .remove(name)
            .ok_or_else(|| AppError::UnknownAccount(name.to_string()))
    }
}

/// Settings for one account as written in the accounts file.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub notion_token: Option<String>,
    #[serde(default)]
    pub database_ids: HashMap<ContentMode, String>,
    #[serde(default)]
    pub notion_parent_page_id: Option<String>,
    #[serde(default)]
    pub properties: PropertyNames,
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default)]
    pub google_sheets: Option<SheetsConfig>,
    #[serde(default)]
    pub site: Option<SiteConfig>,
    #[serde(default)]
    pub posting: PostingConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub slack_webhook_url: Option<String>,
}

/// Which backend holds the content rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Notion,
    GoogleSheets,
}

/// Property (or column) names, so the schema is not hard-coded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PropertyNames {
    pub title: String,
    pub status: String,
    pub pending: String,
    pub used: String,
    pub body: String,
    pub media: String,
    pub last_posted: String,
    pub times_posted: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            title: "Name".to_string(),
            status: "Status".to_string(),
            pending: "Pending".to_string(),
            used: "Used".to_string(),
            body: "Body".to_string(),
            media: "Media".to_string(),
            last_posted: "Last Posted".to_string(),
            times_posted: "Times Posted".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub worksheet: String,
    /// Path to the service account JSON key, relative to the accounts file.
    pub service_account_key: PathBuf,
    /// Column used as the row label in logs; falls back to the row number.
    #[serde(default)]
    pub id_column: Option<String>,
}

/// Login and addressing for the social-media site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub base_url: Option<ValidatedUrl>,
}

impl SiteConfig {
    /// Site root without a trailing slash, for joining paths.
    pub fn base(&self) -> &str {
        self.base_url
            .as_ref()
            .map(ValidatedUrl::base)
            .unwrap_or(crate::constants::DEFAULT_SITE_URL)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base(), path)
    }

    /// The account's own profile timeline.
    pub fn profile_url(&self) -> String {
        format!("{}/{}", self.base(), self.username)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostingConfig {
    pub char_limit: CharLimitRange,
    pub media_filename: String,
    pub require_media: bool,
    pub submit_attempts: u32,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            char_limit: CharLimitRange::default(),
            media_filename: "temp_media".to_string(),
            require_media: true,
            submit_attempts: crate::constants::SUBMIT_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Root for per-account profiles; defaults to `.cache` next to the accounts file.
    pub profile_root: Option<PathBuf>,
    /// Chrome/Chromium binary; auto-detected when absent.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    /// Working directory for downloads and diagnostics.
    pub work_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved run context
// ---------------------------------------------------------------------------

/// Fully resolved settings for one process.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub account_name: String,
    pub mode: Option<ContentMode>,
    pub account: AccountConfig,
    /// Directory of the accounts file; relative paths resolve against it.
    pub config_dir: PathBuf,
    pub slack_webhook_url: Option<String>,
}

impl RunContext {
    /// Loads the accounts file and selects one account, applying environment
    /// overrides (`NOTION_API_KEY`, `SLACK_WEBHOOK_URL`).
    pub fn resolve(
        config_path: &Path,
        account_name: &str,
        mode: Option<ContentMode>,
    ) -> Result<Self, AppError> {
        let mut account = AccountsFile::load(config_path)?.into_account(account_name)?;

        if let Ok(token) = std::env::var("NOTION_API_KEY") {
            account.notion_token = Some(token);
        }
        let slack_webhook_url = std::env::var("SLACK_WEBHOOK_URL")
            .ok()
            .or_else(|| account.slack_webhook_url.clone())
            .filter(|url| !url.trim().is_empty());

        let config_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        log::debug!("Resolved account '{}' from {}", account_name, config_path.display());

        Ok(Self {
            account_name: account_name.to_string(),
            mode,
            account,
            config_dir,
            slack_webhook_url,
        })
    }

    /// The validated Notion token.
    pub fn notion_token(&self) -> Result<ApiKey, AppError> {
        let token = self.account.notion_token.as_deref().ok_or_else(|| {
            AppError::MissingConfiguration(format!(
                "notion_token for account '{}' (or NOTION_API_KEY)",
                self.account_name
            ))
        })?;
        Ok(ApiKey::new(token)?)
    }

    /// The content database for the selected mode.
    pub fn database_id(&self) -> Result<NotionId, AppError> {
        let mode = self.mode.ok_or_else(|| {
            AppError::MissingConfiguration("no --mode selected for this command".to_string())
        })?;
        let raw = self.account.database_ids.get(&mode).ok_or_else(|| {
            AppError::MissingConfiguration(format!(
                "database_ids.{} for account '{}'",
                mode, self.account_name
            ))
        })?;
        NotionId::parse(raw).map_err(|e| AppError::InvalidId(e.to_string()))
    }

    pub fn site(&self) -> Result<&SiteConfig, AppError> {
        self.account.site.as_ref().ok_or_else(|| {
            AppError::MissingConfiguration(format!("site credentials for account '{}'", self.account_name))
        })
    }

    pub fn sheets(&self) -> Result<&SheetsConfig, AppError> {
        self.account.google_sheets.as_ref().ok_or_else(|| {
            AppError::MissingConfiguration(format!("google_sheets for account '{}'", self.account_name))
        })
    }

    /// Resolves a possibly relative path against the accounts file directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    /// Persistent browser profile for this account.
    pub fn profile_dir(&self) -> PathBuf {
        let root = self
            .account
            .browser
            .profile_root
            .as_deref()
            .map(|p| self.resolve_path(p))
            .unwrap_or_else(|| self.config_dir.join(".cache"));
        root.join(format!("chrome_profile_{}", self.account_name))
    }

    /// Working directory for downloads and diagnostics.
    pub fn work_dir(&self) -> PathBuf {
        self.account
            .browser
            .work_dir
            .as_deref()
            .map(|p| self.resolve_path(p))
            .unwrap_or_else(|| self.config_dir.join("work"))
    }
}
