// src/source.rs
//! Content source capability and the pool policies built on it.
//!
//! A source is a table of post records with a pending/used lifecycle flag.
//! Notion databases and Google Sheets worksheets both implement
//! [`PostSource`]; the posting run and the maintenance pass depend only on
//! this trait.

use crate::error::AppError;
use crate::types::{PostRecord, RowRef};
use chrono::{DateTime, Local};

/// The ability to read and update the post pool.
#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    /// Short description for log lines ("Notion database 1f6e…").
    fn describe(&self) -> String;

    /// All eligible pending records (status pending, body present, media
    /// present when required), in source order.
    async fn list_pending(&self) -> Result<Vec<PostRecord>, AppError>;

    /// Number of eligible pending records. Sources may answer this more
    /// cheaply than listing everything.
    async fn count_pending(&self) -> Result<usize, AppError> {
        Ok(self.list_pending().await?.len())
    }

    /// Rows currently marked used that still meet the content criteria.
    async fn list_used(&self) -> Result<Vec<RowRef>, AppError>;

    /// Flips one row back to pending.
    async fn mark_pending(&self, row: &RowRef) -> Result<(), AppError>;

    /// Records a successful post: last-posted timestamp, incremented counter,
    /// status used.
    async fn record_posted(&self, record: &PostRecord, at: DateTime<Local>) -> Result<(), AppError>;

    /// The least recently posted pending record, if any.
    async fn next_pending(&self) -> Result<Option<PostRecord>, AppError> {
        Ok(select_oldest(self.list_pending().await?))
    }
}

/// Picks the record posted longest ago. Never-posted records come first;
/// ties keep source order.
pub fn select_oldest(records: Vec<PostRecord>) -> Option<PostRecord> {
    records.into_iter().min_by_key(|record| record.last_posted)
}

/// What the maintenance pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionReport {
    /// Enough pending records; nothing was touched.
    Skipped { pending: usize },
    /// Used records were reset to pending.
    Promoted {
        pending: usize,
        promoted: usize,
        failed: usize,
    },
    /// The used rows could not be listed; nothing was touched this run.
    ListFailed { pending: usize },
}

/// Resets every used record to pending when fewer than `threshold` pending
/// records remain.
///
/// A failed count is treated as zero pending, which makes the pass run. Per-row
/// update failures are logged and counted. A failure to list the used rows
/// ends the pass with [`PromotionReport::ListFailed`]; only configuration
/// errors are returned.
pub async fn replenish_pool<S>(source: &S, threshold: usize) -> Result<PromotionReport, AppError>
where
    S: PostSource + ?Sized,
{
    let pending = match source.count_pending().await {
        Ok(count) => count,
        Err(e) => {
            log::error!("Counting pending records in {} failed: {}", source.describe(), e);
            0
        }
    };
    log::info!("{} has {} pending record(s)", source.describe(), pending);

    if pending >= threshold {
        log::info!("Pending pool is at or above {}; no promotion needed", threshold);
        return Ok(PromotionReport::Skipped { pending });
    }

    let used = match source.list_used().await {
        Ok(rows) => rows,
        Err(e) if e.is_configuration() => return Err(e),
        Err(e) => {
            log::error!("Listing used records in {} failed: {}", source.describe(), e);
            return Ok(PromotionReport::ListFailed { pending });
        }
    };
    log::info!("Promoting {} used record(s) back to pending", used.len());

    let mut promoted = 0;
    let mut failed = 0;
    for row in &used {
        match source.mark_pending(row).await {
            Ok(()) => {
                log::debug!("Promoted {}", row);
                promoted += 1;
            }
            Err(e) => {
                log::error!("Failed to promote {}: {}", row, e);
                failed += 1;
            }
        }
    }

    log::info!("Promotion finished: {} promoted, {} failed", promoted, failed);
    Ok(PromotionReport::Promoted {
        pending,
        promoted,
        failed,
    })
}

/// In-memory source for exercising the pool policies and the posting run.
#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Row {
        pub record: PostRecord,
        pub used: bool,
    }

    #[derive(Default)]
    pub struct MemorySource {
        pub rows: Mutex<Vec<Row>>,
        pub fail_count: bool,
        pub fail_list_used: bool,
        pub fail_writes: bool,
        pub posted: Mutex<Vec<RowRef>>,
    }

    impl MemorySource {
        pub fn with_rows(rows: Vec<Row>) -> Self {
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }

        pub fn used_flags(&self) -> Vec<bool> {
            self.rows.lock().unwrap().iter().map(|r| r.used).collect()
        }
    }

    fn write_error() -> AppError {
        AppError::GoogleService {
            endpoint: "values".into(),
            status: 500,
            message: "write refused".into(),
        }
    }

    #[async_trait::async_trait]
    impl PostSource for MemorySource {
        fn describe(&self) -> String {
            "memory source".to_string()
        }

        async fn list_pending(&self) -> Result<Vec<PostRecord>, AppError> {
            if self.fail_count {
                return Err(write_error());
            }
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| !r.used)
                .map(|r| r.record.clone())
                .collect())
        }

        async fn list_used(&self) -> Result<Vec<RowRef>, AppError> {
            if self.fail_list_used {
                return Err(AppError::GoogleService {
                    endpoint: "values".into(),
                    status: 503,
                    message: "busy".into(),
                });
            }
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.used)
                .map(|r| r.record.row.clone())
                .collect())
        }

        async fn mark_pending(&self, row: &RowRef) -> Result<(), AppError> {
            if self.fail_writes {
                return Err(write_error());
            }
            for r in self.rows.lock().unwrap().iter_mut() {
                if &r.record.row == row {
                    r.used = false;
                }
            }
            Ok(())
        }

        async fn record_posted(
            &self,
            record: &PostRecord,
            at: DateTime<Local>,
        ) -> Result<(), AppError> {
            if self.fail_writes {
                return Err(write_error());
            }
            self.posted.lock().unwrap().push(record.row.clone());
            for r in self.rows.lock().unwrap().iter_mut() {
                if r.record.row == record.row {
                    r.used = true;
                    r.record.times_posted += 1;
                    r.record.last_posted = Some(at.fixed_offset());
                }
            }
            Ok(())
        }
    }

    pub fn record(row: u32, body: &str, last_posted: Option<&str>) -> PostRecord {
        PostRecord {
            row: RowRef::SheetRow(row),
            body: body.to_string(),
            media_url: None,
            last_posted: last_posted.map(|s| DateTime::parse_from_rfc3339(s).unwrap()),
            times_posted: 0,
            label: format!("row {}", row),
        }
    }
}
