// src/api/queries.rs
//! Request bodies for database queries and page updates.
//!
//! Property names always come from [`PropertyNames`]; nothing here assumes a
//! fixed schema. The status property is a `select`.

use crate::config::PropertyNames;
use chrono::{DateTime, Local};
use serde_json::{json, Value};

/// Content criteria shared by the pending and used filters: non-empty body,
/// and non-empty media when media is required.
fn content_criteria(props: &PropertyNames, require_media: bool) -> Vec<Value> {
    let mut criteria = vec![json!({
        "property": props.body,
        "rich_text": { "is_not_empty": true }
    })];
    if require_media {
        criteria.push(json!({
            "property": props.media,
            "files": { "is_not_empty": true }
        }));
    }
    criteria
}

fn status_filter(props: &PropertyNames, value: &str, require_media: bool) -> Value {
    let mut and = vec![json!({
        "property": props.status,
        "select": { "equals": value }
    })];
    and.extend(content_criteria(props, require_media));
    json!({ "and": and })
}

/// Rows eligible for posting.
pub fn pending_filter(props: &PropertyNames, require_media: bool) -> Value {
    status_filter(props, &props.pending, require_media)
}

/// Rows already posted that could be recycled.
pub fn used_filter(props: &PropertyNames, require_media: bool) -> Value {
    status_filter(props, &props.used, require_media)
}

/// Least recently posted first.
pub fn oldest_first(props: &PropertyNames) -> Value {
    json!([{ "property": props.last_posted, "direction": "ascending" }])
}

/// A `databases/{id}/query` body.
pub fn query_body(
    filter: &Value,
    sorts: Option<&Value>,
    page_size: u32,
    start_cursor: Option<&str>,
) -> Value {
    let mut body = json!({
        "filter": filter,
        "page_size": page_size,
    });
    if let Some(sorts) = sorts {
        body["sorts"] = sorts.clone();
    }
    if let Some(cursor) = start_cursor {
        body["start_cursor"] = json!(cursor);
    }
    body
}

/// PATCH body that sets only the status.
pub fn status_update(props: &PropertyNames, value: &str) -> Value {
    json!({
        "properties": {
            props.status.as_str(): { "select": { "name": value } }
        }
    })
}

/// PATCH body for a successful post: status used, last-posted timestamp and
/// the new counter value in one request.
pub fn posted_update(props: &PropertyNames, at: DateTime<Local>, times_posted: u32) -> Value {
    json!({
        "properties": {
            props.status.as_str(): { "select": { "name": props.used } },
            props.last_posted.as_str(): { "date": { "start": at.to_rfc3339() } },
            props.times_posted.as_str(): { "number": times_posted }
        }
    })
}
