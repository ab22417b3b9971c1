//! Mail transport abstraction
//!
//! Every call is blocking and attempted once; callers decide what a failure
//! means for the row being processed.

use anyhow::Result;

use crate::models::{EmailAddress, MailThread, OutgoingMessage, ThreadMessage};

/// Sends new messages and continues existing conversations
pub trait MailTransport: Send + Sync {
    /// Send a new message
    fn send(&self, message: &OutgoingMessage) -> Result<()>;

    /// Search conversations with a Gmail-style query
    /// (`in:sent to:a@x.com subject:"..."`), newest first, returning at
    /// most `limit` threads
    fn search_threads(&self, query: &str, limit: usize) -> Result<Vec<MailThread>>;

    /// Reply to the sender of `message` inside its thread
    fn reply(&self, message: &ThreadMessage, text: &str, html: &str) -> Result<()>;

    /// Forward `message` to `to` with the given subject and html body
    fn forward(
        &self,
        message: &ThreadMessage,
        to: &[EmailAddress],
        subject: &str,
        html: &str,
    ) -> Result<()>;

    /// Address of the account performing the merge
    fn current_identity(&self) -> Result<String>;
}
