// src/status.rs
//! Writing the outcome of a posting run back to the source and the chat.

use crate::compose::ThreadReport;
use crate::error::AppError;
use crate::notify::{outcome_message, Notifier};
use crate::source::PostSource;
use crate::types::PostRecord;
use chrono::Local;

/// What happened after the outcome was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    /// The source accepted the "posted" update.
    pub recorded: bool,
    pub notified: bool,
}

pub struct StatusUpdater<'a, S: PostSource + ?Sized> {
    source: &'a S,
    notifier: &'a Notifier,
    username: &'a str,
}

impl<'a, S: PostSource + ?Sized> StatusUpdater<'a, S> {
    pub fn new(source: &'a S, notifier: &'a Notifier, username: &'a str) -> Self {
        Self {
            source,
            notifier,
            username,
        }
    }

    /// On success marks the record used (timestamp, counter, status); on
    /// failure leaves it untouched. Notifies either way.
    ///
    /// A failed status write is logged only. The post itself is already live.
    pub async fn report(
        &self,
        record: &PostRecord,
        outcome: &Result<ThreadReport, AppError>,
    ) -> StatusReport {
        let recorded = match outcome {
            Ok(thread) => {
                log::info!(
                    "Posted {} as {} chunk(s){}",
                    record.label,
                    thread.chunks,
                    thread
                        .root_url()
                        .map(|u| format!(" at {}", u))
                        .unwrap_or_default()
                );
                match self.source.record_posted(record, Local::now()).await {
                    Ok(()) => {
                        log::info!(
                            "Marked {} used (times posted {})",
                            record.row,
                            record.times_posted + 1
                        );
                        true
                    }
                    Err(e) => {
                        log::error!(
                            "Status update for {} failed; it may be posted again: {}",
                            record.row,
                            e
                        );
                        false
                    }
                }
            }
            Err(e) => {
                log::error!("Posting {} failed: {}", record.label, e);
                false
            }
        };

        let message = outcome_message(self.username, &record.label, outcome.as_ref().err());
        let notified = self.notifier.send(&message).await;
        StatusReport { recorded, notified }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::{record, MemorySource, Row};
    use pretty_assertions::assert_eq;

    fn source() -> MemorySource {
        MemorySource::with_rows(vec![Row {
            record: record(2, "body", None),
            used: false,
        }])
    }

    fn thread() -> ThreadReport {
        ThreadReport {
            chunks: 1,
            urls: Vec::new(),
            media_attached: false,
        }
    }

    #[tokio::test]
    async fn success_marks_the_row_used() {
        let source = source();
        let notifier = Notifier::new(reqwest::Client::new(), None);
        let updater = StatusUpdater::new(&source, &notifier, "jobs_bot");

        let report = updater.report(&record(2, "body", None), &Ok(thread())).await;

        assert_eq!(
            report,
            StatusReport {
                recorded: true,
                notified: false
            }
        );
        assert_eq!(source.used_flags(), vec![true]);
        let rows = source.rows.lock().unwrap();
        assert_eq!(rows[0].record.times_posted, 1);
        assert!(rows[0].record.last_posted.is_some());
    }

    #[tokio::test]
    async fn failure_leaves_the_row_pending() {
        let source = source();
        let notifier = Notifier::new(reqwest::Client::new(), None);
        let updater = StatusUpdater::new(&source, &notifier, "jobs_bot");

        let outcome = Err(AppError::ThreadBroken { index: 1 });
        let report = updater.report(&record(2, "body", None), &outcome).await;

        assert!(!report.recorded);
        assert_eq!(source.used_flags(), vec![false]);
        assert!(source.posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_write_is_not_fatal() {
        let mut source = source();
        source.fail_writes = true;
        let notifier = Notifier::new(reqwest::Client::new(), None);
        let updater = StatusUpdater::new(&source, &notifier, "jobs_bot");

        let report = updater.report(&record(2, "body", None), &Ok(thread())).await;
        assert!(!report.recorded);
        assert_eq!(source.used_flags(), vec![false]);
    }
}
