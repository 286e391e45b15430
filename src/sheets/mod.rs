// src/sheets/mod.rs
//! Google Sheets worksheet as a [`PostSource`].
//!
//! The first row is the header; columns are found by the configured property
//! names. Row numbers in [`RowRef::SheetRow`] are 1-based sheet rows, so the
//! first data row is row 2. Without a status column every row that meets the
//! content criteria is pending, and status writes are skipped.

mod auth;

pub use auth::{signed_assertion, AssertionClaims, GoogleAuth, ServiceAccountKey};

use crate::config::PropertyNames;
use crate::constants::{ERROR_BODY_PREVIEW_LENGTH, GOOGLE_SHEETS_API_BASE, SHEETS_TIMESTAMP_FORMAT};
use crate::error::AppError;
use crate::source::PostSource;
use crate::types::{PostRecord, RowRef};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// A1 column letters for a zero-based column index.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Quotes a worksheet name for use in an A1 range.
fn quoted_sheet(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

/// Reads a timestamp cell. Empty or unparseable cells yield `None`.
pub fn parse_sheet_timestamp(cell: &str) -> Option<DateTime<FixedOffset>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
        return Some(dt);
    }
    let local = |naive: NaiveDateTime| {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.fixed_offset())
    };
    for format in [SHEETS_TIMESTAMP_FORMAT, "%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(cell, format) {
            return local(naive);
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(day) = NaiveDate::parse_from_str(cell, format) {
            return local(day.and_time(chrono::NaiveTime::MIN));
        }
    }
    log::warn!("Unparseable timestamp '{}' treated as never posted", cell);
    None
}

fn parse_counter(cell: &str) -> u32 {
    let cell = cell.trim();
    cell.parse::<u32>()
        .ok()
        .or_else(|| cell.parse::<f64>().ok().filter(|v| *v > 0.0).map(|v| v as u32))
        .unwrap_or(0)
}

/// The worksheet contents with a resolved header.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl SheetTable {
    /// Builds the table from a values response; the first row is the header.
    pub fn from_values(values: Vec<Vec<Value>>) -> Self {
        let mut rows = values.into_iter().map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
        });
        let header = rows.next().unwrap_or_default();
        let columns = header
            .into_iter()
            .enumerate()
            .filter(|(_, name)| !name.trim().is_empty())
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        Self {
            columns,
            rows: rows.collect(),
        }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    fn require_column(&self, name: &str) -> Result<usize, AppError> {
        self.column(name).ok_or_else(|| {
            AppError::MissingConfiguration(format!("column '{}' in the worksheet header", name))
        })
    }

    fn cell<'a>(&'a self, row: &'a [String], column: Option<usize>) -> &'a str {
        column
            .and_then(|c| row.get(c))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Rows whose status cell equals `status` (any row when the sheet has no
    /// status column) and that meet the content criteria.
    pub fn records(
        &self,
        props: &PropertyNames,
        id_column: Option<&str>,
        status: &str,
        require_media: bool,
    ) -> Result<Vec<PostRecord>, AppError> {
        let body_col = self.require_column(&props.body)?;
        let media_col = self.column(&props.media);
        if require_media && media_col.is_none() {
            return Err(AppError::MissingConfiguration(format!(
                "column '{}' in the worksheet header",
                props.media
            )));
        }
        let status_col = self.column(&props.status);
        let label_col = id_column.and_then(|name| self.column(name));
        let last_col = self.column(&props.last_posted);
        let count_col = self.column(&props.times_posted);

        let mut records = Vec::new();
        for (index, row) in self.rows.iter().enumerate() {
            let sheet_row = index as u32 + 2;
            if status_col.is_some() && self.cell(row, status_col).trim() != status {
                continue;
            }
            let body = self.cell(row, Some(body_col));
            if crate::text::is_effectively_empty(body) {
                continue;
            }
            let media = self.cell(row, media_col).trim();
            if require_media && media.is_empty() {
                log::debug!("Row {} has no media; skipped", sheet_row);
                continue;
            }
            let label = match self.cell(row, label_col).trim() {
                "" => format!("row {}", sheet_row),
                value => value.to_string(),
            };
            records.push(PostRecord {
                row: RowRef::SheetRow(sheet_row),
                body: body.to_string(),
                media_url: (!media.is_empty()).then(|| media.to_string()),
                last_posted: parse_sheet_timestamp(self.cell(row, last_col)),
                times_posted: parse_counter(self.cell(row, count_col)),
                label,
            });
        }
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Content rows stored in one worksheet.
pub struct SheetsContentSource {
    http: reqwest::Client,
    auth: GoogleAuth,
    spreadsheet_id: String,
    worksheet: String,
    id_column: Option<String>,
    properties: PropertyNames,
    require_media: bool,
    base_url: String,
}

impl SheetsContentSource {
    pub fn new(
        http: reqwest::Client,
        auth: GoogleAuth,
        spreadsheet_id: impl Into<String>,
        worksheet: impl Into<String>,
        id_column: Option<String>,
        properties: PropertyNames,
        require_media: bool,
    ) -> Self {
        Self {
            http,
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: worksheet.into(),
            id_column,
            properties,
            require_media,
            base_url: GOOGLE_SHEETS_API_BASE.to_string(),
        }
    }

    /// `.../spreadsheets/{id}/values/{range}` with the range percent-encoded.
    fn values_url(&self, range: &str) -> Result<url::Url, AppError> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| AppError::InternalError {
                message: format!("bad Sheets base URL: {}", e),
                source: None,
            })?;
        url.path_segments_mut()
            .map_err(|_| AppError::InternalError {
                message: "Sheets base URL cannot carry a path".to_string(),
                source: None,
            })?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(range);
        Ok(url)
    }

    async fn check(&self, response: reqwest::Response, endpoint: &str) -> Result<String, AppError> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect());
        Err(AppError::GoogleService {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch_table(&self) -> Result<SheetTable, AppError> {
        let url = self.values_url(&quoted_sheet(&self.worksheet))?;
        let token = self.auth.access_token().await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let body = self.check(response, "values.get").await?;
        let range: ValueRange = serde_json::from_str(&body)?;
        Ok(SheetTable::from_values(range.values))
    }

    /// Writes one cell with user-entered semantics (numbers stay numbers).
    async fn write_cell(&self, column: usize, row: u32, value: Value) -> Result<(), AppError> {
        let range = format!("{}!{}{}", quoted_sheet(&self.worksheet), column_letter(column), row);
        let mut url = self.values_url(&range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "USER_ENTERED");
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": [[value]] }))
            .send()
            .await?;
        self.check(response, "values.update").await?;
        log::debug!("Wrote {}", range);
        Ok(())
    }

    fn sheet_row(row: &RowRef) -> Result<u32, AppError> {
        match row {
            RowRef::SheetRow(n) => Ok(*n),
            other => Err(AppError::Validation(format!(
                "{} does not address a worksheet row",
                other
            ))),
        }
    }
}

#[async_trait::async_trait]
impl PostSource for SheetsContentSource {
    fn describe(&self) -> String {
        format!("worksheet '{}' of {}", self.worksheet, self.spreadsheet_id)
    }

    async fn list_pending(&self) -> Result<Vec<PostRecord>, AppError> {
        let table = self.fetch_table().await?;
        let records = table.records(
            &self.properties,
            self.id_column.as_deref(),
            &self.properties.pending,
            self.require_media,
        )?;
        log::info!("Worksheet has {} pending row(s)", records.len());
        Ok(records)
    }

    async fn list_used(&self) -> Result<Vec<RowRef>, AppError> {
        let table = self.fetch_table().await?;
        if table.column(&self.properties.status).is_none() {
            log::warn!(
                "Worksheet has no '{}' column; nothing to promote",
                self.properties.status
            );
            return Ok(Vec::new());
        }
        Ok(table
            .records(
                &self.properties,
                self.id_column.as_deref(),
                &self.properties.used,
                self.require_media,
            )?
            .into_iter()
            .map(|record| record.row)
            .collect())
    }

    async fn mark_pending(&self, row: &RowRef) -> Result<(), AppError> {
        let row = Self::sheet_row(row)?;
        let table = self.fetch_table().await?;
        let status_col = table.require_column(&self.properties.status)?;
        self.write_cell(status_col, row, json!(self.properties.pending)).await
    }

    /// Three independent cell writes. A failed write is logged and the others
    /// still run; the last failure is returned.
    async fn record_posted(&self, record: &PostRecord, at: DateTime<Local>) -> Result<(), AppError> {
        let row = Self::sheet_row(&record.row)?;
        let table = self.fetch_table().await?;

        let mut writes = Vec::new();
        match table.column(&self.properties.last_posted) {
            Some(col) => writes.push((col, json!(at.format(SHEETS_TIMESTAMP_FORMAT).to_string()))),
            None => log::warn!("No '{}' column; timestamp not written", self.properties.last_posted),
        }
        match table.column(&self.properties.times_posted) {
            Some(col) => writes.push((col, json!(record.times_posted + 1))),
            None => log::warn!("No '{}' column; counter not written", self.properties.times_posted),
        }
        if let Some(col) = table.column(&self.properties.status) {
            writes.push((col, json!(self.properties.used)));
        }

        let mut last_error = None;
        for (col, value) in writes {
            if let Err(e) = self.write_cell(col, row, value).await {
                log::error!("Failed to update {}{}: {}", column_letter(col), row, e);
                last_error = Some(e);
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => {
                log::info!("Updated row {} ({} time(s) posted)", row, record.times_posted + 1);
                Ok(())
            }
        }
    }
}
