//! Per-row and per-run results

use chrono::{DateTime, Utc};

use crate::models::{Row, StatusCell};

/// Result of one transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(DateTime<Utc>),
    Failed(String),
}

impl SendOutcome {
    /// Capture a transport result, keeping the full error chain as text
    pub fn capture(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => Self::Sent(Utc::now()),
            Err(err) => Self::Failed(format!("{:#}", err)),
        }
    }
}

impl From<SendOutcome> for StatusCell {
    fn from(outcome: SendOutcome) -> Self {
        match outcome {
            SendOutcome::Sent(at) => StatusCell::SentAt(at),
            SendOutcome::Failed(message) => StatusCell::Error(message),
        }
    }
}

/// Which driver produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Direct,
    Thread,
    /// The subject prompt was cancelled; nothing was read or written
    Cancelled,
}

/// A thread-mode row for which no sent conversation was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingThreadError {
    pub row: Row,
    /// 1-based sheet row (the header is row 1)
    pub row_number: usize,
}

/// Summary of one merge run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub mode: MergeMode,
    /// One status per row, in row order
    pub statuses: Vec<StatusCell>,
    pub pending: Vec<PendingThreadError>,
    /// Rows delivered in this run
    pub sent: usize,
    /// Rows whose fill or transport call failed
    pub failed: usize,
    /// Rows that already had a status
    pub skipped: usize,
    /// Rows left empty (no filter subject, or no matching thread)
    pub unresolved: usize,
}

impl MergeReport {
    pub fn cancelled() -> Self {
        Self::new(MergeMode::Cancelled, Vec::new(), Vec::new())
    }

    pub fn new(mode: MergeMode, statuses: Vec<StatusCell>, pending: Vec<PendingThreadError>) -> Self {
        let count = |pred: fn(&StatusCell) -> bool| statuses.iter().filter(|s| pred(s)).count();
        let sent = count(|s| matches!(s, StatusCell::SentAt(_)));
        let failed = count(|s| matches!(s, StatusCell::Error(_)));
        let skipped = count(|s| matches!(s, StatusCell::Unchanged(_)));
        let unresolved = count(|s| matches!(s, StatusCell::Empty));
        Self {
            mode,
            statuses,
            pending,
            sent,
            failed,
            skipped,
            unresolved,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.mode == MergeMode::Cancelled
    }

    /// One-line summary for logs and the command line
    pub fn summary(&self) -> String {
        match self.mode {
            MergeMode::Cancelled => "merge cancelled".to_string(),
            _ => format!(
                "{} rows: {} sent, {} failed, {} skipped, {} unresolved",
                self.statuses.len(),
                self.sent,
                self.failed,
                self.skipped,
                self.unresolved
            ),
        }
    }
}
