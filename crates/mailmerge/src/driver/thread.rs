//! Helpers for continuing an earlier conversation

use crate::error::FilterSubjectError;
use crate::markup::{find_tokens, replace_tokens};
use crate::models::{EmailAddress, Row, ThreadMessage};

/// Substitute `{{field}}` markers in a thread filter subject
///
/// Values are inserted verbatim. Every marker must name a field with a
/// non-empty value in `row`.
pub fn resolve_filter_subject(filter: &str, row: &Row) -> Result<String, FilterSubjectError> {
    if filter.is_empty() {
        return Err(FilterSubjectError::Empty);
    }

    let tokens = find_tokens(filter);
    if tokens.is_empty() {
        return Err(FilterSubjectError::NoPlaceholders);
    }
    if let Some(missing) = tokens
        .iter()
        .find(|t| row.get(&t.name).is_none_or(str::is_empty))
    {
        return Err(FilterSubjectError::MissingField(missing.name.clone()));
    }

    Ok(replace_tokens(filter, |token| row.value(&token.name).to_string()))
}

/// Prefix every line of a plain body with `> `
pub fn quote_plain(body: &str) -> String {
    body.split('\n')
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// New html followed by the prior message's html, as one quote block
pub fn wrap_html(filled_html: &str, prior_html: &str) -> String {
    format!(
        "<div class=\"gmail_quote\"> {}{}</div>",
        filled_html, prior_html
    )
}

/// How to continue a thread whose last message is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// We wrote the last message: send it on again to its recipients
    Forward {
        to: Vec<EmailAddress>,
        subject: String,
    },
    /// Someone else wrote last: answer them
    Reply { text: String },
}

/// Pick forward or reply for `last`, sent or received by `identity`
pub fn choose_continuation(last: &ThreadMessage, identity: &str) -> Continuation {
    if last.from.is_identity(identity) {
        Continuation::Forward {
            to: last.to.clone(),
            subject: last.subject.clone(),
        }
    } else {
        Continuation::Reply {
            text: quote_plain(&last.plain_body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageId, RowSet, SheetData, ThreadId};

    fn row(pairs: &[(&str, &str)]) -> Row {
        let headers = pairs.iter().map(|(h, _)| h.to_string()).collect();
        let values = pairs.iter().map(|(_, v)| v.to_string()).collect();
        RowSet::from_sheet(SheetData::new(headers, vec![values]))
            .rows()[0]
            .clone()
    }

    #[test]
    fn test_resolve_filter_subject() {
        let row = row(&[("First name", "Ada"), ("Company", "Acme")]);
        assert_eq!(
            resolve_filter_subject("Offer for {{First name}} at {{Company}}", &row),
            Ok("Offer for Ada at Acme".to_string())
        );
    }

    #[test]
    fn test_resolve_filter_subject_inserts_verbatim() {
        let row = row(&[("Name", "A \"quoted\" / name")]);
        assert_eq!(
            resolve_filter_subject("Hi {{Name}}", &row),
            Ok("Hi A \"quoted\" / name".to_string())
        );
    }

    #[test]
    fn test_resolve_filter_subject_failures() {
        let row = row(&[("First name", "Ada"), ("Company", "")]);
        assert_eq!(resolve_filter_subject("", &row), Err(FilterSubjectError::Empty));
        assert_eq!(
            resolve_filter_subject("  ", &row),
            Err(FilterSubjectError::NoPlaceholders)
        );
        assert_eq!(
            resolve_filter_subject("Plain subject", &row),
            Err(FilterSubjectError::NoPlaceholders)
        );
        assert_eq!(
            resolve_filter_subject("At {{Company}}", &row),
            Err(FilterSubjectError::MissingField("Company".to_string()))
        );
        assert_eq!(
            resolve_filter_subject("For {{Nickname}}", &row),
            Err(FilterSubjectError::MissingField("Nickname".to_string()))
        );
    }

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote_plain("a\nb"), "> a\n> b");
        assert_eq!(quote_plain("a\n"), "> a\n> ");
        assert_eq!(quote_plain(""), "> ");
    }

    #[test]
    fn test_wrap_html() {
        assert_eq!(
            wrap_html("<p>New</p>", "<p>Old</p>"),
            "<div class=\"gmail_quote\"> <p>New</p><p>Old</p></div>"
        );
    }

    #[test]
    fn test_choose_continuation() {
        let message = |from: &str| {
            ThreadMessage::builder(MessageId::new("m1"), ThreadId::new("t1"))
                .from(EmailAddress::parse(from))
                .to(vec![EmailAddress::new("ada@example.com")])
                .subject("Offer")
                .plain_body("Hello")
                .build()
        };

        assert_eq!(
            choose_continuation(&message("Me <ME@example.com>"), "me@example.com"),
            Continuation::Forward {
                to: vec![EmailAddress::new("ada@example.com")],
                subject: "Offer".to_string(),
            }
        );
        assert_eq!(
            choose_continuation(&message("ada@example.com"), "me@example.com"),
            Continuation::Reply {
                text: "> Hello".to_string()
            }
        );
    }
}
