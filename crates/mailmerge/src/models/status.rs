//! Per-row outcome written back to the status column

use std::fmt;

use chrono::{DateTime, Local, Utc};

/// The value recorded in a row's status cell after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCell {
    /// The message went out at this time
    SentAt(DateTime<Utc>),
    /// The transport (or template fill) failed with this message
    Error(String),
    /// The row already had a status and was skipped
    Unchanged(String),
    /// Nothing was sent and nothing is recorded
    Empty,
}

impl StatusCell {
    /// Format used when rendering send timestamps into a cell
    pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    pub fn is_sent(&self) -> bool {
        matches!(self, Self::SentAt(_))
    }

    /// Text written into the row store
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StatusCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SentAt(at) => write!(
                f,
                "{}",
                at.with_timezone(&Local).format(Self::TIMESTAMP_FORMAT)
            ),
            Self::Error(message) => f.write_str(message),
            Self::Unchanged(prior) => f.write_str(prior),
            Self::Empty => Ok(()),
        }
    }
}
