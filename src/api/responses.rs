// src/api/responses.rs
//! API response types. Page and error bodies reuse notion-client's serde
//! implementations.

use serde::{Deserialize, Serialize};

pub use notion_client::objects::{error::Error as NotionError, page::Page as NotionPage};

/// Generic paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub object: String,
    pub results: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Database query response. Rows stay as raw JSON until each one is parsed
/// on its own, so a single odd page cannot fail the whole query.
pub type QueryDatabaseResponse = PaginatedResponse<serde_json::Value>;

/// The parts of a freshly created page or database we report back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedObject {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}
