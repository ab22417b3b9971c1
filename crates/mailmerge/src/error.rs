//! Error types for merge runs

use thiserror::Error;

/// Failures that abort a whole merge run before any row is processed
#[derive(Debug, Error)]
pub enum MergeError {
    /// No draft has the requested subject line
    #[error("no draft found with subject \"{subject}\"")]
    TemplateNotFound { subject: String },

    /// The status column already holds values from an earlier run
    #[error("the \"{status_field}\" column must be empty before a merge")]
    UnsafeRerun { status_field: String },

    /// A column the merge relies on is missing from the header row
    #[error("column \"{column}\" not found in the header row")]
    MissingColumn { column: String },

    /// Row store, draft store or identity lookup failed
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Token substitution produced something that is not a valid message
#[derive(Debug, Error)]
pub enum FillError {
    #[error("could not serialize template: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("merged message is malformed: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Why a thread filter subject could not be turned into a search filter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterSubjectError {
    #[error("filter subject is empty")]
    Empty,

    #[error("filter subject has no {{{{field}}}} placeholders")]
    NoPlaceholders,

    #[error("placeholder {{{{{0}}}}} has no value in this row")]
    MissingField(String),
}
