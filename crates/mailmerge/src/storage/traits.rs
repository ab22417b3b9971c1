//! Storage trait definitions

use anyhow::Result;

use crate::models::{Draft, SheetData, StatusCell};

/// Tabular source of merge rows with a writable status column
///
/// Row numbers are 1-based sheet rows with the header on row 1, so the
/// first data row is row 2. Column indexes are 0-based.
pub trait RowStore: Send + Sync {
    /// Read the header and every data row as display strings
    fn read_all(&self) -> Result<SheetData>;

    /// Write `values` down one column starting at `start_row`
    fn write_column(&self, start_row: usize, column_index: usize, values: &[StatusCell]) -> Result<()>;
}

/// Source of drafted messages used as merge templates
pub trait DraftStore: Send + Sync {
    /// First draft, in store order, whose subject equals `subject`
    fn find_by_subject(&self, subject: &str) -> Result<Option<Draft>>;
}
