//! SQLite table as a merge row source
//!
//! The table's columns are the header and its rows, in `rowid` order, are
//! the data rows. Every value is read as display text.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow, bail};
use log::debug;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, params};

use super::RowStore;
use crate::models::{SheetData, StatusCell};

struct State {
    conn: Connection,
    /// rowid of each data row from the last read, in row order
    rowids: Vec<i64>,
}

/// Row store over one SQLite table
pub struct SqliteRowStore {
    state: Mutex<State>,
    table: String,
}

impl SqliteRowStore {
    /// Open the database at `db_path` and use `table` as the row source
    pub fn open(db_path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        Self::from_connection(conn, table)
    }

    /// Use an already open connection
    pub fn from_connection(conn: Connection, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
                [&table],
                |row| row.get(0),
            )
            .context("Failed to inspect database schema")?;
        if !exists {
            bail!("table {:?} does not exist", table);
        }

        Ok(Self {
            state: Mutex::new(State {
                conn,
                rowids: Vec::new(),
            }),
            table,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("sqlite row store lock poisoned"))
    }

    fn columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }
}

impl RowStore for SqliteRowStore {
    fn read_all(&self) -> Result<SheetData> {
        let mut state = self.lock()?;
        let headers = Self::columns(&state.conn, &self.table)?;

        let select = headers
            .iter()
            .map(|h| quote_ident(h))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT rowid, {} FROM {} ORDER BY rowid",
            select,
            quote_ident(&self.table)
        );

        let width = headers.len();
        let (rowids, rows) = {
            let mut stmt = state.conn.prepare(&sql)?;
            let mut rowids = Vec::new();
            let mut rows = Vec::new();
            let mut cursor = stmt.query([])?;
            while let Some(row) = cursor.next()? {
                rowids.push(row.get::<_, i64>(0)?);
                let mut cells = Vec::with_capacity(width);
                for i in 0..width {
                    cells.push(display_value(row.get_ref(i + 1)?));
                }
                rows.push(cells);
            }
            (rowids, rows)
        };

        debug!("Read {} rows from table {}", rows.len(), self.table);
        state.rowids = rowids;
        Ok(SheetData::new(headers, rows))
    }

    fn write_column(&self, start_row: usize, column_index: usize, values: &[StatusCell]) -> Result<()> {
        if start_row < 2 {
            bail!("data rows start at row 2, got {}", start_row);
        }
        let mut state = self.lock()?;
        let headers = Self::columns(&state.conn, &self.table)?;
        let column = headers
            .get(column_index)
            .with_context(|| format!("column {} is outside the header", column_index))?
            .clone();

        let first = start_row - 2;
        let targets: Vec<i64> = state
            .rowids
            .iter()
            .skip(first)
            .take(values.len())
            .copied()
            .collect();
        if targets.len() != values.len() {
            bail!(
                "cannot write {} values from row {}: only {} rows were read",
                values.len(),
                start_row,
                state.rowids.len()
            );
        }

        let sql = format!(
            "UPDATE {} SET {} = ?1 WHERE rowid = ?2",
            quote_ident(&self.table),
            quote_ident(&column)
        );
        let tx = state.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for (rowid, value) in targets.iter().zip(values) {
                stmt.execute(params![value.render(), rowid])?;
            }
        }
        tx.commit().context("Failed to write status column")?;
        Ok(())
    }
}

/// Quote an SQL identifier
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a stored value the way a spreadsheet would display it
fn display_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}
