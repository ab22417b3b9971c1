//! Tabular row data read from a row store

use std::sync::Arc;

/// Raw display values as read from a row store, header first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetData {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Split a full grid whose first line is the header
    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }
        let headers = grid.remove(0);
        Self {
            headers,
            rows: grid,
        }
    }
}

/// One unit of merge input: an ordered column-name to value mapping
///
/// All rows of a [`RowSet`] share the same header, so every row has the
/// identical key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    fn new(headers: Arc<[String]>, mut cells: Vec<String>) -> Self {
        cells.resize(headers.len(), String::new());
        Self {
            headers,
            values: cells,
        }
    }

    /// Value for a column, `None` when the column does not exist
    ///
    /// With duplicate header names the leftmost column wins.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == field)
            .map(|i| self.values[i].as_str())
    }

    /// Value for a column, empty when the column does not exist
    pub fn value(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    /// Iterate `(column, value)` pairs in header order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

/// All rows of one merge run, sharing a header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    headers: Arc<[String]>,
    rows: Vec<Row>,
}

impl RowSet {
    /// Zip the header with every data row
    ///
    /// Missing cells become empty strings and surplus cells are dropped.
    pub fn from_sheet(sheet: SheetData) -> Self {
        let headers: Arc<[String]> = sheet.headers.into();
        let rows = sheet
            .rows
            .into_iter()
            .map(|cells| Row::new(Arc::clone(&headers), cells))
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Zero-based index of a column in the header
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_cells_become_empty() {
        let rows = RowSet::from_sheet(SheetData::new(
            strings(&["Recipient", "Name", "Email Sent"]),
            vec![strings(&["a@x.com"])],
        ));

        let row = &rows.rows()[0];
        assert_eq!(row.get("Recipient"), Some("a@x.com"));
        assert_eq!(row.get("Name"), Some(""));
        assert_eq!(row.get("Email Sent"), Some(""));
        assert_eq!(row.get("Unknown"), None);
        assert_eq!(row.value("Unknown"), "");
    }

    #[test]
    fn test_surplus_cells_dropped() {
        let rows = RowSet::from_sheet(SheetData::new(
            strings(&["A"]),
            vec![strings(&["1", "2", "3"])],
        ));
        let pairs: Vec<_> = rows.rows()[0].iter().collect();
        assert_eq!(pairs, vec![("A", "1")]);
    }

    #[test]
    fn test_rows_share_header() {
        let rows = RowSet::from_sheet(SheetData::new(
            strings(&["A", "B"]),
            vec![strings(&["1", "2"]), strings(&["3"])],
        ));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.rows()[0].headers(), rows.rows()[1].headers());
        assert_eq!(rows.column_index("B"), Some(1));
    }

    #[test]
    fn test_from_grid() {
        let sheet = SheetData::from_grid(vec![strings(&["A"]), strings(&["1"])]);
        assert_eq!(sheet.headers, strings(&["A"]));
        assert_eq!(sheet.rows.len(), 1);

        assert_eq!(SheetData::from_grid(Vec::new()), SheetData::default());
    }
}
