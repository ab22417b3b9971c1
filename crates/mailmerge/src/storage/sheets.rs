//! Google Sheets as a merge row source
//!
//! Reads display-formatted values through the Sheets REST API and writes
//! the status column back as user-entered values, so timestamps become real
//! dates in the sheet. Uses synchronous HTTP (ureq) like the Gmail client.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::RowStore;
use crate::gmail::GoogleAuth;
use crate::models::{SheetData, StatusCell};

/// Range payload used by `values.get` and `values.update`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default)]
    range: Option<String>,
    #[serde(default)]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Option<Vec<Vec<String>>>,
}

/// Row store over one range of a Google spreadsheet
///
/// `range` is either a sheet name (`Contacts`) or a sheet with a start
/// cell (`Contacts!B3:H`). The first row of the range is the header.
pub struct SheetsRowStore {
    auth: Arc<GoogleAuth>,
    spreadsheet_id: String,
    sheet: String,
    /// Zero-based column and row of the range's top-left cell
    origin: (usize, usize),
}

impl SheetsRowStore {
    const BASE_URL: &'static str = "https://sheets.googleapis.com/v4/spreadsheets";

    pub fn new(auth: Arc<GoogleAuth>, spreadsheet_id: impl Into<String>, range: &str) -> Self {
        let (sheet, origin) = split_range(range);
        Self {
            auth,
            spreadsheet_id: spreadsheet_id.into(),
            sheet,
            origin,
        }
    }

    fn read_range(&self) -> String {
        let (col, row) = self.origin;
        format!("{}!{}{}:ZZZ", quote_sheet(&self.sheet), column_letter(col), row + 1)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            Self::BASE_URL,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(range)
        )
    }
}

impl RowStore for SheetsRowStore {
    fn read_all(&self) -> Result<SheetData> {
        let access_token = self.auth.get_access_token()?;
        let range = self.read_range();
        let url = format!(
            "{}?valueRenderOption=FORMATTED_VALUE&majorDimension=ROWS",
            self.values_url(&range)
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .with_context(|| format!("Failed to read sheet range {}", range))?;

        let values: ValueRange = response
            .body_mut()
            .read_json()
            .context("Failed to parse sheet values")?;

        let grid = values.values.unwrap_or_default();
        debug!("Read {} lines from {}", grid.len(), range);
        Ok(SheetData::from_grid(grid))
    }

    fn write_column(&self, start_row: usize, column_index: usize, values: &[StatusCell]) -> Result<()> {
        if start_row < 2 {
            bail!("data rows start at row 2, got {}", start_row);
        }
        if values.is_empty() {
            return Ok(());
        }

        let access_token = self.auth.get_access_token()?;
        let (col, row) = self.origin;
        let letter = column_letter(col + column_index);
        let first = row + start_row;
        let last = first + values.len() - 1;
        let range = format!("{}!{}{}:{}{}", quote_sheet(&self.sheet), letter, first, letter, last);

        let body = ValueRange {
            range: Some(range.clone()),
            major_dimension: Some("ROWS".to_string()),
            values: Some(values.iter().map(|v| vec![v.render()]).collect()),
        };

        let url = format!("{}?valueInputOption=USER_ENTERED", self.values_url(&range));
        ureq::put(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(&body)
            .with_context(|| format!("Failed to write status column {}", range))?;

        info!("Wrote {} status cells to {}", values.len(), range);
        Ok(())
    }
}

/// Spreadsheet column letters for a zero-based index (0 -> A, 26 -> AA)
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Split `Sheet!B3:H` into the sheet name and the zero-based start cell
fn split_range(range: &str) -> (String, (usize, usize)) {
    let Some((sheet, cells)) = range.rsplit_once('!') else {
        return (unquote_sheet(range), (0, 0));
    };
    let start = cells.split(':').next().unwrap_or("");
    (unquote_sheet(sheet), parse_cell(start).unwrap_or((0, 0)))
}

/// Parse `B3` into `(1, 2)`; a bare column like `B` starts at the first row
fn parse_cell(cell: &str) -> Option<(usize, usize)> {
    let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if letters.is_empty() {
        return None;
    }
    let col = letters
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c.to_ascii_uppercase() as u8 - b'A' + 1) as usize)
        - 1;
    let digits = &cell[letters.len()..];
    let row = if digits.is_empty() {
        0
    } else {
        digits.parse::<usize>().ok()?.checked_sub(1)?
    };
    Some((col, row))
}

fn unquote_sheet(name: &str) -> String {
    let name = name.trim();
    match name.strip_prefix('\'').and_then(|n| n.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => name.to_string(),
    }
}

fn quote_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}
