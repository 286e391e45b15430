// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the concept it constrains. Reading them in
//! order tells how a posting run behaves: how much it fetches from Notion,
//! how long it waits for the site, how often it retries.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// How many objects the Notion API returns per page of results (API maximum).
pub const NOTION_API_PAGE_SIZE: usize = 100;

/// Notion API version header sent with every request.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Base URL of the Notion REST API.
pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";

// ---------------------------------------------------------------------------
// Content pool
// ---------------------------------------------------------------------------

/// When fewer pending records than this remain, used records are recycled.
pub const MINIMUM_PENDING_THRESHOLD: usize = 1;

/// Default chunk size range; the per-run limit is drawn from it.
pub const DEFAULT_CHAR_LIMIT_MIN: usize = 135;
pub const DEFAULT_CHAR_LIMIT_MAX: usize = 150;

/// Characters of the normalized chunk compared against visible posts.
pub const MATCH_PREFIX_CHARS: usize = 20;

// ---------------------------------------------------------------------------
// Media download
// ---------------------------------------------------------------------------

/// Upper bound on a single media download.
pub const MEDIA_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(20);

/// Extension used when neither the content type nor the URL names one.
pub const DEFAULT_MEDIA_EXTENSION: &str = ".jpg";

// ---------------------------------------------------------------------------
// Browser automation
// ---------------------------------------------------------------------------

/// Social-media site root used when an account does not configure one.
pub const DEFAULT_SITE_URL: &str = "https://x.com";

/// Submission attempts per chunk before the thread is abandoned.
pub const SUBMIT_ATTEMPTS: u32 = 3;

/// Short probe for the authenticated-only element.
pub const LOGIN_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait for an element that is expected to appear.
pub const ELEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Wait for the attachment preview after a media upload.
pub const MEDIA_ATTACH_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between element polls.
pub const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Upper bound on a webhook post; notifications never hold up a run.
pub const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;

// ---------------------------------------------------------------------------
// Google Sheets
// ---------------------------------------------------------------------------

/// Root of the Sheets v4 spreadsheets resource.
pub const GOOGLE_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// OAuth scope requested for the service account.
pub const GOOGLE_SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Token endpoint used when the key file does not name one.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Lifetime requested for the signed assertion (Google's maximum).
pub const GOOGLE_ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Cached access tokens are refreshed this long before they expire.
pub const GOOGLE_TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// How timestamps are written into and read from the sheet.
pub const SHEETS_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
