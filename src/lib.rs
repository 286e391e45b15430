// src/lib.rs
//! notion2post library: posts pending Notion or Google Sheets rows to a
//! social-media site as threads.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ValidationError`
//! - **Configuration**: `Cli`, `AccountsFile`, `RunContext`
//! - **Content sources**: `PostSource`, `NotionContentSource`, `SheetsContentSource`
//! - **Browser**: `BrowserDriver`, `ChromeSession`, `StrategyChain`
//! - **Posting**: `ThreadComposer`, `StatusUpdater`, `PostingRun`
//! - **Orchestration**: `run_sequence`

pub mod api;
pub mod browser;
mod clipboard;
pub mod compose;
pub mod config;
pub mod constants;
pub mod error;
pub mod error_recovery;
pub mod media;
pub mod notify;
pub mod orchestrator;
pub mod pipeline;
pub mod sheets;
pub mod source;
pub mod status;
pub mod text;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, NotionErrorCode, Result};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{AccountConfig, AccountsFile, Cli, Command, ContentMode, RunContext};

// --- Domain Types ---
pub use crate::types::{ApiKey, CharLimitRange, NotionId, PostRecord, RowRef, ValidatedUrl};

// --- Content Sources ---
pub use crate::api::{NotionContentSource, NotionHttpClient};
pub use crate::sheets::SheetsContentSource;
pub use crate::source::{replenish_pool, select_oldest, PostSource, PromotionReport};

// --- Browser ---
pub use crate::browser::{BrowserDriver, ChromeSession, SessionState, StrategyChain};

// --- Posting ---
pub use crate::compose::{ThreadComposer, ThreadReport};
pub use crate::notify::Notifier;
pub use crate::pipeline::{BrowserPublisher, PostingRun, Publisher, RunOutcome};
pub use crate::status::StatusUpdater;

// --- Orchestration ---
pub use crate::orchestrator::{run_sequence, ChildArgs, SequenceStep};
