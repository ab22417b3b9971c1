//! Domain models for merge runs and the mail they produce

mod message;
mod row;
mod status;
mod template;
mod thread;

pub use message::{EmailAddress, MessageId, OutgoingMessage, ThreadMessage, ThreadMessageBuilder};
pub use row::{Row, RowSet, SheetData};
pub use status::StatusCell;
pub use template::{Attachment, Draft, MessageFields, Template};
pub use thread::{MailThread, ThreadId};
