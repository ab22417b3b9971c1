//! Gmail-style query parser
//!
//! Parses search queries with operators like:
//! - `from:john@example.com` - sender filter
//! - `to:team@company.com` or `to:(team@company.com)` - recipient filter
//! - `subject:"quarterly report"` - subject filter
//! - `in:sent` - label filter

use crate::models::MailThread;

/// Parsed query with structured components
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    /// Free-text search terms
    pub terms: Vec<String>,
    /// from: filter values
    pub from: Vec<String>,
    /// to: filter values
    pub to: Vec<String>,
    /// subject: filter values
    pub subject: Vec<String>,
    /// in: label filter (e.g., "INBOX", "SENT")
    pub in_label: Option<String>,
}

impl ParsedQuery {
    /// Check if the query is empty (no terms or filters)
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
            && self.from.is_empty()
            && self.to.is_empty()
            && self.subject.is_empty()
            && self.in_label.is_none()
    }

    /// Whether any message of `thread` satisfies every filter
    ///
    /// Address filters compare case-insensitively against the address,
    /// subject and free-text filters are case-insensitive substring matches.
    pub fn matches(&self, thread: &MailThread) -> bool {
        thread.messages.iter().any(|message| {
            let label_ok = self
                .in_label
                .as_deref()
                .is_none_or(|label| message.has_label(label));
            let from_ok = self
                .from
                .iter()
                .all(|from| contains_ignore_case(&message.from.email, from));
            let to_ok = self.to.iter().all(|to| {
                message
                    .to
                    .iter()
                    .any(|addr| contains_ignore_case(&addr.email, to))
            });
            let subject_ok = self
                .subject
                .iter()
                .all(|subject| contains_ignore_case(&message.subject, subject));
            let terms_ok = self.terms.iter().all(|term| {
                contains_ignore_case(&message.subject, term)
                    || contains_ignore_case(&message.plain_body, term)
            });
            label_ok && from_ok && to_ok && subject_ok && terms_ok
        })
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Query for sent conversations addressed to `recipient` with `subject`
pub fn sent_thread_query(recipient: &str, subject: &str) -> String {
    format!("in:sent to:{} subject:\"{}\"", recipient.trim(), subject)
}

/// Parse a search query string into structured components
///
/// Everything that is not a known operator is treated as free text.
pub fn parse_query(input: &str) -> ParsedQuery {
    let mut query = ParsedQuery::default();

    let mut i = 0;
    let chars: Vec<char> = input.chars().collect();

    while i < chars.len() {
        // Skip whitespace
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let rest: String = chars[i..].iter().collect();

        if let Some((key, value, consumed)) = parse_operator(&rest) {
            match key.to_lowercase().as_str() {
                "from" => query.from.push(value),
                "to" => query.to.push(value),
                "subject" => query.subject.push(value),
                "in" => query.in_label = Some(value.to_uppercase()),
                _ => {}
            }
            i += consumed;
        } else {
            let (word, consumed) = parse_quoted_or_word(&rest);
            if !word.is_empty() {
                query.terms.push(word);
            }
            i += consumed;
        }
    }

    query
}

/// Parse an operator like "to:value", "to:(value)" or "subject:\"quoted value\""
///
/// Returns the key, the value and the number of chars consumed.
fn parse_operator(input: &str) -> Option<(String, String, usize)> {
    let colon_pos = input.find(':')?;
    let key = &input[..colon_pos];

    if key.chars().any(|c| c.is_whitespace()) {
        return None;
    }

    let valid_ops = ["from", "to", "subject", "in"];
    if !valid_ops.contains(&key.to_lowercase().as_str()) {
        return None;
    }

    let after_colon = &input[colon_pos + 1..];
    let (value, value_len) = parse_value(after_colon);

    if value.is_empty() {
        return None;
    }

    // key and colon are ASCII, so byte and char counts agree
    Some((key.to_string(), value, colon_pos + 1 + value_len))
}

/// Parse a quoted, parenthesized or bare value
fn parse_value(input: &str) -> (String, usize) {
    let chars: Vec<char> = input.chars().collect();

    if chars.first() == Some(&'(') {
        let mut value = String::new();
        let mut i = 1;
        while i < chars.len() && chars[i] != ')' {
            value.push(chars[i]);
            i += 1;
        }
        let consumed = if i < chars.len() { i + 1 } else { i };
        return (value.trim().to_string(), consumed);
    }

    parse_quoted_or_word(input)
}

/// Parse a quoted phrase or a word running until whitespace
fn parse_quoted_or_word(input: &str) -> (String, usize) {
    let chars: Vec<char> = input.chars().collect();

    if chars.is_empty() {
        return (String::new(), 0);
    }

    if chars[0] == '"' {
        let mut value = String::new();
        let mut i = 1;
        while i < chars.len() && chars[i] != '"' {
            value.push(chars[i]);
            i += 1;
        }
        let consumed = if i < chars.len() { i + 1 } else { i };
        return (value, consumed);
    }

    let mut value = String::new();
    let mut i = 0;
    while i < chars.len() && !chars[i].is_whitespace() {
        value.push(chars[i]);
        i += 1;
    }

    (value, i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmailAddress, MessageId, ThreadId, ThreadMessage};

    fn thread(to: &str, subject: &str, labels: &[&str]) -> MailThread {
        let message = ThreadMessage::builder(MessageId::new("m1"), ThreadId::new("t1"))
            .from(EmailAddress::new("me@example.com"))
            .to(vec![EmailAddress::new(to)])
            .subject(subject)
            .label_ids(labels.iter().map(|l| l.to_string()).collect())
            .build();
        MailThread::new(ThreadId::new("t1"), vec![message])
    }

    #[test]
    fn test_parse_sent_thread_query() {
        let query = parse_query(&sent_thread_query("a@x.com", "Re: Invoice"));
        assert_eq!(query.in_label, Some("SENT".to_string()));
        assert_eq!(query.to, vec!["a@x.com"]);
        assert_eq!(query.subject, vec!["Re: Invoice"]);
        assert!(query.terms.is_empty());
    }

    #[test]
    fn test_parse_parenthesized_value() {
        let query = parse_query("to:(a@x.com) hello");
        assert_eq!(query.to, vec!["a@x.com"]);
        assert_eq!(query.terms, vec!["hello"]);
    }

    #[test]
    fn test_parse_multiple_operators() {
        let query = parse_query("from:alice to:bob subject:meeting");
        assert_eq!(query.from, vec!["alice"]);
        assert_eq!(query.to, vec!["bob"]);
        assert_eq!(query.subject, vec!["meeting"]);
    }

    #[test]
    fn test_parse_invalid_operator_ignored() {
        let query = parse_query("foo:bar");
        assert_eq!(query.terms, vec!["foo:bar"]);
    }

    #[test]
    fn test_parse_operator_with_empty_value() {
        let query = parse_query("from: hello");
        assert!(query.from.is_empty());
        assert_eq!(query.terms, vec!["from:", "hello"]);
    }

    #[test]
    fn test_parse_empty_query() {
        assert!(parse_query("").is_empty());
        assert!(parse_query("   ").is_empty());
    }

    #[test]
    fn test_matches_thread() {
        let t = thread("A@X.com", "Re: Invoice 2024", &["SENT"]);
        assert!(parse_query("in:sent to:a@x.com subject:\"invoice\"").matches(&t));
        assert!(!parse_query("in:inbox to:a@x.com").matches(&t));
        assert!(!parse_query("to:b@x.com").matches(&t));
        assert!(!parse_query("subject:\"Receipt\"").matches(&t));
    }
}
