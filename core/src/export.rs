//! Per-session Jira export progress.
//!
//! Each test-case id moves `none → exporting → success | error`. An `error`
//! may be retried; `success` never changes again, whether the update comes
//! from a live export or from persisted history.

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{ExportRecord, ExportStatus, ExportStatusEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Success { jira_key: Option<String>, jira_url: Option<String> },
    Failed { message: String },
}

/// Ids accepted by [`ExportTracker::begin_export`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeginExport {
    pub started: Vec<String>,
    pub already_exported: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTracker {
    entries: BTreeMap<String, ExportStatusEntry>,
}

impl ExportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, test_case_id: &str) -> Option<ExportStatus> {
        self.entries.get(test_case_id).map(|e| e.status)
    }

    pub fn entry(&self, test_case_id: &str) -> Option<&ExportStatusEntry> {
        self.entries.get(test_case_id)
    }

    pub fn is_exported(&self, test_case_id: &str) -> bool {
        self.status(test_case_id) == Some(ExportStatus::Success)
    }

    /// Marks every id `exporting`. Already exported ids are left alone and
    /// reported separately.
    pub fn begin_export<I, S>(&mut self, ids: I) -> BeginExport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcome = BeginExport::default();
        for id in ids {
            let id = id.as_ref();
            if self.is_exported(id) {
                outcome.already_exported.push(id.to_string());
                continue;
            }
            self.entries.insert(
                id.to_string(),
                ExportStatusEntry {
                    test_case_id: id.to_string(),
                    status: ExportStatus::Exporting,
                    jira_key: None,
                    jira_url: None,
                },
            );
            outcome.started.push(id.to_string());
        }
        outcome
    }

    /// Records the result of one export call. Returns false when the entry
    /// was already terminal and the result was ignored.
    pub fn record_result(&mut self, test_case_id: &str, outcome: ExportOutcome) -> bool {
        if self.is_exported(test_case_id) {
            debug!("Ignoring late export result for already exported {test_case_id}");
            return false;
        }
        let entry = match outcome {
            ExportOutcome::Success { jira_key, jira_url } => ExportStatusEntry {
                test_case_id: test_case_id.to_string(),
                status: ExportStatus::Success,
                jira_key,
                jira_url,
            },
            ExportOutcome::Failed { message } => {
                debug!("Export of {test_case_id} failed: {message}");
                ExportStatusEntry {
                    test_case_id: test_case_id.to_string(),
                    status: ExportStatus::Error,
                    jira_key: None,
                    jira_url: None,
                }
            }
        };
        self.entries.insert(test_case_id.to_string(), entry);
        true
    }

    /// Seeds `success` entries from persisted exports, matched on
    /// `testcase_id`. Never downgrades and never introduces in-progress
    /// states. Returns how many entries were seeded.
    pub fn hydrate_from_history(&mut self, records: &[ExportRecord]) -> usize {
        let mut seeded = 0;
        for record in records {
            let Some(id) = record.testcase_id.as_deref() else {
                debug!("Export record without testcase_id ignored: {:?}", record.jira_key);
                continue;
            };
            let succeeded = record
                .status
                .as_deref()
                .map_or(true, |s| s.eq_ignore_ascii_case("success"));
            if !succeeded || self.is_exported(id) {
                continue;
            }
            // an in-flight export keeps its spinner; its own result decides
            if self.status(id) == Some(ExportStatus::Exporting) {
                continue;
            }
            self.entries.insert(
                id.to_string(),
                ExportStatusEntry {
                    test_case_id: id.to_string(),
                    status: ExportStatus::Success,
                    jira_key: record.jira_key.clone(),
                    jira_url: record.jira_url.clone(),
                },
            );
            seeded += 1;
        }
        seeded
    }
}

/// Aggregate result of a multi-select export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: Vec<String>,
    pub already_exported: Vec<String>,
}

impl BatchSummary {
    /// False when nothing was attempted.
    pub fn all_succeeded(&self) -> bool {
        self.attempted > 0 && self.succeeded == self.attempted
    }

    pub fn message(&self) -> String {
        let skipped = self.already_exported.len();
        if self.attempted == 0 {
            return format!("Nothing to export: {skipped} selected test cases were already exported.");
        }
        let mut message = format!(
            "{} of {} test cases exported successfully.",
            self.succeeded, self.attempted
        );
        if skipped > 0 {
            message.push_str(&format!(" {skipped} already exported, skipped."));
        }
        message
    }
}
