//! Mail merge crate - batch personalized email from tabular data
//!
//! This crate provides:
//! - Domain models (Row, Template, StatusCell, MailThread)
//! - Token substitution and template extraction from drafts
//! - The merge driver in direct and thread-continuation modes
//! - Storage trait abstractions for row sources and drafts
//! - Gmail API client, Google Sheets row store and OAuth authentication
//!
//! Everything runs synchronously; the driver only talks to traits, so the
//! in-memory adapters can stand in for Gmail and Sheets.

pub mod config;
pub mod driver;
pub mod error;
pub mod gmail;
pub mod markup;
pub mod models;
pub mod prompt;
pub mod search;
pub mod storage;
pub mod template;
pub mod transport;

pub use config::{GoogleCredentials, MergeConfig, MergeSettings};
pub use driver::{MergeDriver, MergeMode, MergeReport, PendingThreadError, SendOutcome, is_safe_to_run};
pub use error::{FillError, FilterSubjectError, MergeError};
pub use gmail::{GmailClient, GoogleAuth};
pub use models::{
    Attachment, Draft, EmailAddress, MailThread, MessageFields, OutgoingMessage, Row, RowSet,
    SheetData, StatusCell, Template, ThreadId, ThreadMessage,
};
pub use prompt::{Notice, Prompter, ScriptedPrompter, TerminalPrompter};
pub use storage::{
    Delivery, DraftStore, InMemoryMailbox, InMemoryRowStore, RowStore, SheetsRowStore,
    SqliteRowStore,
};
pub use template::{fill, resolve_template};
pub use transport::MailTransport;
