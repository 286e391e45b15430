// src/api/schema.rs
//! Workspace bootstrap: creating the content database and checking access.

use super::client::{extract_response_text, NotionHttpClient};
use super::parser::{parse_api_response, plain_text};
use super::responses::{CreatedObject, NotionPage};
use crate::config::PropertyNames;
use crate::error::{AppError, NotionClientError};
use crate::types::NotionId;
use notion_client::objects::page::PageProperty;
use serde_json::{json, Value};

/// Property schema for a new content database.
pub fn database_schema(props: &PropertyNames) -> Value {
    json!({
        props.title.as_str(): { "title": {} },
        props.status.as_str(): {
            "select": {
                "options": [
                    { "name": props.pending, "color": "green" },
                    { "name": props.used, "color": "red" }
                ]
            }
        },
        props.body.as_str(): { "rich_text": {} },
        props.media.as_str(): { "files": {} },
        props.last_posted.as_str(): { "date": {} },
        props.times_posted.as_str(): { "number": { "format": "number" } }
    })
}

fn title_text(title: &str) -> Value {
    json!([{ "type": "text", "text": { "content": title } }])
}

/// Creates the content database under `parent`.
pub async fn create_database(
    client: &NotionHttpClient,
    parent: &NotionId,
    title: &str,
    props: &PropertyNames,
) -> Result<CreatedObject, AppError> {
    let body = json!({
        "parent": { "type": "page_id", "page_id": parent.to_hyphenated() },
        "title": title_text(title),
        "properties": database_schema(props),
    });
    log::info!("Creating database '{}' under {}", title, parent.to_hyphenated());
    let response = client.post("databases", &body).await?;
    let created: CreatedObject = parse_api_response(extract_response_text(response).await?)?;
    log::info!("Created database {}", created.id);
    Ok(created)
}

/// Creates a page at the workspace root. Only public integrations may do
/// this; internal integrations get a validation error from Notion.
pub async fn create_workspace_page(
    client: &NotionHttpClient,
    title: &str,
) -> Result<CreatedObject, AppError> {
    let body = json!({
        "parent": { "type": "workspace", "workspace": true },
        "properties": { "title": { "title": title_text(title) } },
    });
    log::info!("Creating workspace page '{}'", title);
    let response = client.post("pages", &body).await?;
    let created: CreatedObject = parse_api_response(extract_response_text(response).await?)
        .map_err(|e| {
            log::error!(
                "Workspace-level pages need a public integration; share an existing page and pass --parent-page instead"
            );
            e
        })?;
    Ok(created)
}

/// Whether the integration can see a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAccess {
    Accessible { title: String, url: String },
    NotShared,
}

/// Retrieves a page to confirm it is shared with the integration.
pub async fn check_page(client: &NotionHttpClient, id: &NotionId) -> Result<PageAccess, AppError> {
    let endpoint = format!("pages/{}", id.to_hyphenated());
    let response = client.get(&endpoint).await?;
    match parse_api_response::<NotionPage>(extract_response_text(response).await?) {
        Ok(page) => Ok(PageAccess::Accessible {
            title: page_title(&page),
            url: page.url,
        }),
        Err(AppError::NotionClient(err @ NotionClientError::NotionApi { .. }))
            if err.code().is_some_and(|code| code.is_not_found()) =>
        {
            Ok(PageAccess::NotShared)
        }
        Err(AppError::NotionService { code, .. }) if code.is_not_found() => Ok(PageAccess::NotShared),
        Err(e) => Err(e),
    }
}

fn page_title(page: &NotionPage) -> String {
    page.properties
        .values()
        .find_map(|property| match property {
            PageProperty::Title { title, .. } => Some(plain_text(title)),
            _ => None,
        })
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Untitled".to_string())
}
