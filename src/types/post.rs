//! The content record moved through a posting run.

use super::NotionId;
use chrono::{DateTime, FixedOffset};
use std::fmt;

/// Where a record lives in its source, so status writes can address it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRef {
    /// A page (row) in a Notion database.
    NotionPage(NotionId),
    /// A 1-based row number in a Google Sheets worksheet (row 1 is the header).
    SheetRow(u32),
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowRef::NotionPage(id) => write!(f, "page {}", id.to_hyphenated()),
            RowRef::SheetRow(row) => write!(f, "row {}", row),
        }
    }
}

/// One candidate post pulled from the content source.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub row: RowRef,
    pub body: String,
    pub media_url: Option<String>,
    pub last_posted: Option<DateTime<FixedOffset>>,
    pub times_posted: u32,
    /// Short human-readable identifier for logs and notifications.
    pub label: String,
}

impl PostRecord {
    /// The first characters of the body, for log lines.
    pub fn excerpt(&self, chars: usize) -> String {
        let mut excerpt: String = self.body.chars().take(chars).collect();
        if self.body.chars().count() > chars {
            excerpt.push_str("...");
        }
        excerpt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_truncates_on_characters() {
        let record = PostRecord {
            row: RowRef::SheetRow(2),
            body: "面接で聞かれた質問まとめ".to_string(),
            media_url: None,
            last_posted: None,
            times_posted: 0,
            label: "row 2".to_string(),
        };
        assert_eq!(record.excerpt(4), "面接で聞...");
        assert_eq!(record.excerpt(50), "面接で聞かれた質問まとめ");
    }
}
