// src/api/parser.rs
//! Response parsing with notion-client types.
//!
//! Successful bodies are deserialized into the requested type; error bodies are
//! mapped onto [`NotionClientError::NotionApi`] when Notion sent its JSON
//! error shape, or onto a status-only [`AppError::NotionService`] otherwise.

use super::client::ApiResponse;
use super::responses::{NotionError, NotionPage};
use crate::config::PropertyNames;
use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::{AppError, NotionClientError};
use crate::types::{NotionId, PostRecord, RowRef};
use chrono::{DateTime, FixedOffset};
use notion_client::objects::file::File as NcFile;
use notion_client::objects::page::PageProperty;
use notion_client::objects::property::DateOrDateTime;
use notion_client::objects::rich_text::RichText;
use reqwest::StatusCode;

/// Parse any Notion API response
pub fn parse_api_response<T>(result: ApiResponse<String>) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    if result.status.is_success() {
        parse_success(&result.data, &result.url)
    } else {
        parse_error(&result.data, result.status, &result.url)
    }
}

fn preview(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        let head: String = body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

fn parse_success<T>(body: &str, url: &str) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(body).map_err(|e| {
        log::error!("Failed to parse response from {}: {}", url, e);
        NotionClientError::Deserialization {
            source: e,
            body: preview(body),
        }
        .into()
    })
}

fn parse_error<T>(body: &str, status: StatusCode, url: &str) -> Result<T, AppError> {
    if let Ok(notion_error) = serde_json::from_str::<NotionError>(body) {
        return Err(NotionClientError::NotionApi {
            status: notion_error.status,
            code: notion_error.code,
            message: notion_error.message,
            request_id: notion_error.request_id,
        }
        .into());
    }

    Err(AppError::NotionService {
        code: crate::error::NotionErrorCode::from_http_status(status.as_u16()),
        message: format!("HTTP {} from {}: {}", status, url, preview(body)),
        status,
    })
}

// ---------------------------------------------------------------------------
// Property extraction
// ---------------------------------------------------------------------------

/// Concatenated plain text of a rich-text array.
pub fn plain_text(items: &[RichText]) -> String {
    items
        .iter()
        .map(|item| match item {
            RichText::Text { plain_text, .. } => plain_text.clone().unwrap_or_default(),
            RichText::Mention { plain_text, .. } => plain_text.clone(),
            RichText::Equation { plain_text, .. } => plain_text.clone(),
            _ => String::new(),
        })
        .collect()
}

/// Text of a title or rich-text property.
fn text_of(property: Option<&PageProperty>) -> String {
    match property {
        Some(PageProperty::Title { title, .. }) => plain_text(title),
        Some(PageProperty::RichText { rich_text, .. }) => plain_text(rich_text),
        _ => String::new(),
    }
}

/// URL of the first file in a files property.
fn first_file_url(property: Option<&PageProperty>) -> Option<String> {
    match property {
        Some(PageProperty::Files { files, .. }) => files.first().map(|f| match &f.file {
            NcFile::External { external } => external.url.clone(),
            NcFile::File { file } => file.url.clone(),
        }),
        _ => None,
    }
}

fn date_of(property: Option<&PageProperty>) -> Option<DateTime<FixedOffset>> {
    match property {
        Some(PageProperty::Date { date: Some(d), .. }) => d.start.as_ref().map(|start| match start {
            DateOrDateTime::DateTime(dt) => dt.fixed_offset(),
            DateOrDateTime::Date(day) => day.and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset(),
        }),
        _ => None,
    }
}

fn count_of(property: Option<&PageProperty>) -> u32 {
    match property {
        Some(PageProperty::Number {
            number: Some(n), ..
        }) => n.as_f64().filter(|v| *v > 0.0).map(|v| v as u32).unwrap_or(0),
        _ => 0,
    }
}

/// Converts one database row into a post record.
///
/// Returns `None` when the body is effectively empty, or when media is
/// required and the row has none.
pub fn page_to_record(
    page: &NotionPage,
    props: &PropertyNames,
    require_media: bool,
) -> Result<Option<PostRecord>, AppError> {
    let id = NotionId::parse(&page.id).map_err(|e| AppError::InvalidId(e.to_string()))?;
    let body = text_of(page.properties.get(&props.body));
    if crate::text::is_effectively_empty(&body) {
        log::warn!("Skipping {}: empty {}", id.to_hyphenated(), props.body);
        return Ok(None);
    }

    let media_url = first_file_url(page.properties.get(&props.media));
    if require_media && media_url.is_none() {
        log::warn!("Skipping {}: no {}", id.to_hyphenated(), props.media);
        return Ok(None);
    }

    let title = text_of(page.properties.get(&props.title));
    let label = if title.trim().is_empty() {
        id.to_hyphenated()
    } else {
        title.trim().to_string()
    };

    Ok(Some(PostRecord {
        row: RowRef::NotionPage(id),
        body,
        media_url,
        last_posted: date_of(page.properties.get(&props.last_posted)),
        times_posted: count_of(page.properties.get(&props.times_posted)),
        label,
    }))
}

/// Parses raw query rows into post records.
///
/// Rows that notion-client cannot deserialize, or that fail the content
/// criteria, are logged and skipped.
pub fn parse_post_records(
    rows: Vec<serde_json::Value>,
    props: &PropertyNames,
    require_media: bool,
) -> Vec<PostRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let page: NotionPage = match serde_json::from_value(row) {
                Ok(page) => page,
                Err(e) => {
                    log::error!("Failed to parse database row: {}. Skipping.", e);
                    return None;
                }
            };
            match page_to_record(&page, props, require_media) {
                Ok(record) => record,
                Err(e) => {
                    log::error!("Failed to convert row {}: {}. Skipping.", page.id, e);
                    None
                }
            }
        })
        .collect()
}

/// Page IDs of raw query rows.
pub fn parse_row_ids(rows: &[serde_json::Value]) -> Vec<NotionId> {
    rows.iter()
        .filter_map(|row| row.get("id").and_then(|id| id.as_str()))
        .filter_map(|id| match NotionId::parse(id) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("Ignoring row with invalid id {}: {}", id, e);
                None
            }
        })
        .collect()
}
