// src/api/source.rs
//! Notion database as a [`PostSource`].

use super::client::{extract_response_text, NotionHttpClient};
use super::parser::{parse_api_response, parse_post_records, parse_row_ids};
use super::queries;
use super::responses::QueryDatabaseResponse;
use super::simple_pagination::fetch_all_pages_simple;
use crate::config::PropertyNames;
use crate::constants::NOTION_API_PAGE_SIZE;
use crate::error::AppError;
use crate::source::PostSource;
use crate::types::{NotionId, PostRecord, RowRef};
use chrono::{DateTime, Local};
use serde_json::Value;

/// Content rows stored in one Notion database.
#[derive(Clone)]
pub struct NotionContentSource {
    client: NotionHttpClient,
    database: NotionId,
    properties: PropertyNames,
    require_media: bool,
}

impl NotionContentSource {
    pub fn new(
        client: NotionHttpClient,
        database: NotionId,
        properties: PropertyNames,
        require_media: bool,
    ) -> Self {
        Self {
            client,
            database,
            properties,
            require_media,
        }
    }

    fn query_endpoint(&self) -> String {
        format!("databases/{}/query", self.database.to_hyphenated())
    }

    /// One page of query results.
    async fn query_page(&self, body: &Value) -> Result<QueryDatabaseResponse, AppError> {
        let response = self.client.post(&self.query_endpoint(), body).await?;
        let result = extract_response_text(response).await?;
        parse_api_response::<QueryDatabaseResponse>(result)
    }

    /// Every row matching `filter`, following cursors.
    async fn query_all(&self, filter: &Value, sorts: Option<&Value>) -> Result<Vec<Value>, AppError> {
        let pagination = fetch_all_pages_simple(
            |page_size, cursor| async move {
                let body = queries::query_body(filter, sorts, page_size, cursor.as_deref());
                self.query_page(&body).await
            },
            None,
        )
        .await?;
        Ok(pagination.items)
    }

    async fn patch_page(&self, id: &NotionId, body: &Value) -> Result<(), AppError> {
        let endpoint = format!("pages/{}", id.to_hyphenated());
        let response = self.client.patch(&endpoint, body).await?;
        let result = extract_response_text(response).await?;
        parse_api_response::<Value>(result)?;
        Ok(())
    }

    fn page_id<'a>(&self, row: &'a RowRef) -> Result<&'a NotionId, AppError> {
        match row {
            RowRef::NotionPage(id) => Ok(id),
            other => Err(AppError::Validation(format!(
                "{} does not address a Notion page",
                other
            ))),
        }
    }
}

#[async_trait::async_trait]
impl PostSource for NotionContentSource {
    fn describe(&self) -> String {
        format!("Notion database {}", self.database.to_hyphenated())
    }

    async fn list_pending(&self) -> Result<Vec<PostRecord>, AppError> {
        let filter = queries::pending_filter(&self.properties, self.require_media);
        let sorts = queries::oldest_first(&self.properties);
        let rows = self.query_all(&filter, Some(&sorts)).await?;
        log::info!("Query returned {} pending row(s)", rows.len());
        Ok(parse_post_records(rows, &self.properties, self.require_media))
    }

    /// A single page of results is enough to compare against the threshold.
    async fn count_pending(&self) -> Result<usize, AppError> {
        let filter = queries::pending_filter(&self.properties, self.require_media);
        let body = queries::query_body(&filter, None, NOTION_API_PAGE_SIZE as u32, None);
        let page = self.query_page(&body).await?;
        Ok(page.results.len())
    }

    async fn list_used(&self) -> Result<Vec<RowRef>, AppError> {
        let filter = queries::used_filter(&self.properties, self.require_media);
        let rows = self.query_all(&filter, None).await?;
        Ok(parse_row_ids(&rows)
            .into_iter()
            .map(RowRef::NotionPage)
            .collect())
    }

    async fn mark_pending(&self, row: &RowRef) -> Result<(), AppError> {
        let id = self.page_id(row)?;
        let body = queries::status_update(&self.properties, &self.properties.pending);
        self.patch_page(id, &body).await
    }

    async fn record_posted(&self, record: &PostRecord, at: DateTime<Local>) -> Result<(), AppError> {
        let id = self.page_id(&record.row)?;
        let body = queries::posted_update(&self.properties, at, record.times_posted + 1);
        self.patch_page(id, &body).await?;
        log::info!(
            "Marked {} as {} (posted {} time(s))",
            record.label,
            self.properties.used,
            record.times_posted + 1
        );
        Ok(())
    }
}
