use crate::models::RowSet;

/// Whether a run may start: every row's status cell must be empty
pub fn is_safe_to_run(rows: &RowSet, status_field: &str) -> bool {
    rows.rows().iter().all(|row| row.value(status_field).is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SheetData;

    fn rows(statuses: &[&str]) -> RowSet {
        let data = statuses
            .iter()
            .map(|s| vec!["a@example.com".to_string(), s.to_string()])
            .collect();
        RowSet::from_sheet(SheetData::new(
            vec!["Recipient".to_string(), "Email Sent".to_string()],
            data,
        ))
    }

    #[test]
    fn test_empty_status_column_is_safe() {
        assert!(is_safe_to_run(&rows(&["", ""]), "Email Sent"));
    }

    #[test]
    fn test_any_filled_status_is_unsafe() {
        assert!(!is_safe_to_run(&rows(&["", "2024-01-01 10:00:00"]), "Email Sent"));
        assert!(!is_safe_to_run(&rows(&[" "]), "Email Sent"));
    }

    #[test]
    fn test_no_rows_is_safe() {
        assert!(is_safe_to_run(&rows(&[]), "Email Sent"));
    }
}
