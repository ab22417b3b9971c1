//! Row stores and draft stores
//!
//! The trait-based design lets a merge run against a spreadsheet, a SQLite
//! table or plain memory without the driver knowing which.

mod memory;
mod sheets;
mod sqlite;
mod traits;

pub use memory::{Delivery, InMemoryMailbox, InMemoryRowStore};
pub use sheets::{SheetsRowStore, column_letter};
pub use sqlite::SqliteRowStore;
pub use traits::{DraftStore, RowStore};
