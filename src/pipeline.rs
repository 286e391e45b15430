// src/pipeline.rs
//! One posting run: pick a record, publish it, report the outcome.
//!
//! The stages are behind capability traits ([`PostSource`], [`Publisher`]) so
//! the run can be exercised without a browser or a network.

use crate::api::{NotionContentSource, NotionHttpClient};
use crate::browser::{ensure_authenticated, ChromeLaunch, ChromeSession, Timing};
use crate::compose::{random_chunk_limit, ThreadComposer, ThreadReport};
use crate::config::{PostingConfig, RunContext, SiteConfig, SourceKind};
use crate::error::AppError;
use crate::media::fetch_media;
use crate::notify::Notifier;
use crate::sheets::{GoogleAuth, ServiceAccountKey, SheetsContentSource};
use crate::source::PostSource;
use crate::status::StatusUpdater;
use crate::types::PostRecord;
use std::path::PathBuf;

/// Turns a record into live posts.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, record: &PostRecord) -> Result<ThreadReport, AppError>;
}

/// Opens the content source configured for the account.
pub fn open_source(ctx: &RunContext, http: &reqwest::Client) -> Result<Box<dyn PostSource>, AppError> {
    let account = &ctx.account;
    let require_media = account.posting.require_media;
    match account.source {
        SourceKind::Notion => {
            let client = NotionHttpClient::new(&ctx.notion_token()?)?;
            Ok(Box::new(NotionContentSource::new(
                client,
                ctx.database_id()?,
                account.properties.clone(),
                require_media,
            )))
        }
        SourceKind::GoogleSheets => {
            let sheets = ctx.sheets()?;
            let key = ServiceAccountKey::load(&ctx.resolve_path(&sheets.service_account_key))?;
            let auth = GoogleAuth::new(http.clone(), key);
            log::debug!("Using service account {}", auth.client_email());
            Ok(Box::new(SheetsContentSource::new(
                http.clone(),
                auth,
                sheets.spreadsheet_id.clone(),
                sheets.worksheet.clone(),
                sheets.id_column.clone(),
                account.properties.clone(),
                require_media,
            )))
        }
    }
}

/// Publishes through a real Chrome session with the account's profile.
pub struct BrowserPublisher {
    http: reqwest::Client,
    site: SiteConfig,
    posting: PostingConfig,
    launch: ChromeLaunch,
    timing: Timing,
}

impl BrowserPublisher {
    pub fn from_context(ctx: &RunContext, http: reqwest::Client) -> Result<Self, AppError> {
        let work_dir = ctx.work_dir();
        Ok(Self {
            http,
            site: ctx.site()?.clone(),
            posting: ctx.account.posting.clone(),
            launch: ChromeLaunch {
                profile_dir: ctx.profile_dir(),
                executable: ctx
                    .account
                    .browser
                    .executable
                    .as_deref()
                    .map(|p| ctx.resolve_path(p)),
                headless: ctx.account.browser.headless,
                work_dir,
            },
            timing: Timing::default(),
        })
    }

    fn work_dir(&self) -> &PathBuf {
        &self.launch.work_dir
    }

    async fn publish_in(
        &self,
        session: &ChromeSession,
        record: &PostRecord,
        media: Option<&std::path::Path>,
    ) -> Result<ThreadReport, AppError> {
        ensure_authenticated(session, &self.site, &self.timing)
            .await
            .require_authenticated(&self.site)?;

        let limit = random_chunk_limit(self.posting.char_limit);
        log::info!("Chunk limit for this run: {}", limit);
        ThreadComposer::new(session, &self.site, self.posting.submit_attempts)
            .with_timing(self.timing)
            .publish(&record.body, limit, media)
            .await
    }
}

#[async_trait::async_trait]
impl Publisher for BrowserPublisher {
    async fn publish(&self, record: &PostRecord) -> Result<ThreadReport, AppError> {
        // Held until the end of this function; dropping it removes the file.
        let media = match record.media_url.as_deref() {
            Some(url) => {
                let media =
                    fetch_media(&self.http, url, self.work_dir(), &self.posting.media_filename).await;
                if media.is_none() {
                    log::warn!("Continuing without media for {}", record.label);
                }
                media
            }
            None => None,
        };

        let session = ChromeSession::launch(&self.launch).await?;
        let result = self
            .publish_in(&session, record, media.as_ref().map(|m| m.path()))
            .await;
        session.close().await;
        result
    }
}

/// How a posting run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// No eligible record, or the source could not be read.
    NothingToPost,
    Posted(ThreadReport),
    Failed(AppError),
}

impl RunOutcome {
    /// Process exit code: only a failed publish is an error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::NothingToPost | RunOutcome::Posted(_) => 0,
            RunOutcome::Failed(_) => 1,
        }
    }
}

/// Select, publish, report.
pub struct PostingRun<'a> {
    pub source: &'a dyn PostSource,
    pub publisher: &'a dyn Publisher,
    pub notifier: &'a Notifier,
    /// Account identity used in notifications.
    pub username: &'a str,
}

impl PostingRun<'_> {
    pub async fn execute(&self) -> RunOutcome {
        let record = match self.source.next_pending().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                log::info!("No pending records in {}", self.source.describe());
                return RunOutcome::NothingToPost;
            }
            Err(e) if e.is_transient() => {
                log::warn!("{} is unavailable; skipping this run: {}", self.source.describe(), e);
                return RunOutcome::NothingToPost;
            }
            Err(e) => {
                log::error!("Reading {} failed; skipping this run: {}", self.source.describe(), e);
                return RunOutcome::NothingToPost;
            }
        };

        log::info!(
            "Selected {} (posted {} time(s), last {}): {}",
            record.label,
            record.times_posted,
            record
                .last_posted
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string()),
            record.excerpt(40)
        );

        let outcome = self.publisher.publish(&record).await;
        StatusUpdater::new(self.source, self.notifier, self.username)
            .report(&record, &outcome)
            .await;

        match outcome {
            Ok(report) => RunOutcome::Posted(report),
            Err(e) => RunOutcome::Failed(e),
        }
    }
}
