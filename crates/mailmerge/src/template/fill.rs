//! Token substitution over the three message fields

use crate::error::FillError;
use crate::markup::replace_tokens;
use crate::models::{MessageFields, Row};

/// Fill every `{{column}}` token in subject, text and html with row values
///
/// The fields are serialized to one JSON document, tokens are replaced in
/// the serialized text with JSON-escaped values, and the result is parsed
/// back. Tokens naming columns the row lacks become empty strings.
///
/// # Errors
/// Returns [`FillError::Malformed`] when a value carries characters the
/// escaping does not cover (other control characters) and the document no
/// longer parses.
pub fn fill(fields: &MessageFields, row: &Row) -> Result<MessageFields, FillError> {
    let serialized = serde_json::to_string(fields).map_err(FillError::Serialize)?;
    let merged = replace_tokens(&serialized, |token| {
        escape_json_value(row.get(&token.name).unwrap_or(""))
    });
    serde_json::from_str(&merged).map_err(FillError::Malformed)
}

/// Escape a cell value for embedding inside a JSON string literal
///
/// Covers backslash, double quote, slash, backspace, form feed, newline,
/// carriage return and tab.
pub fn escape_json_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '/' => out.push_str("\\/"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}
