//! Message models: addresses, messages inside existing threads, and the
//! outgoing messages a merge run produces

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Attachment, ThreadId};

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Create a new email address with just the email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse an email address from a string like "John Doe <john@example.com>"
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"').trim();
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email: email.to_string(),
            };
        }

        Self {
            name: None,
            email: s.to_string(),
        }
    }

    /// Parse a comma-separated address list, skipping blank entries
    pub fn parse_list(s: &str) -> Vec<Self> {
        s.split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Whether this address belongs to `identity`, ignoring case
    pub fn is_identity(&self, identity: &str) -> bool {
        let identity = identity.trim();
        !identity.is_empty() && self.email.eq_ignore_ascii_case(identity)
    }

    /// Format the email address for display
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// A message inside an existing conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Gmail message ID
    pub id: MessageId,
    /// ID of the thread this message belongs to
    pub thread_id: ThreadId,
    pub from: EmailAddress,
    pub to: Vec<EmailAddress>,
    pub subject: String,
    pub plain_body: String,
    pub html_body: String,
    /// RFC 5322 `Message-ID` header, used for reply threading
    pub rfc_message_id: Option<String>,
    /// RFC 5322 `References` header
    pub references: Option<String>,
    pub received_at: DateTime<Utc>,
    /// Gmail label IDs (e.g., "INBOX", "SENT")
    pub label_ids: Vec<String>,
}

impl ThreadMessage {
    /// Create a new message builder
    pub fn builder(id: MessageId, thread_id: ThreadId) -> ThreadMessageBuilder {
        ThreadMessageBuilder::new(id, thread_id)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label_ids.iter().any(|l| l.eq_ignore_ascii_case(label))
    }
}

/// Builder for creating ThreadMessage instances
pub struct ThreadMessageBuilder {
    id: MessageId,
    thread_id: ThreadId,
    from: Option<EmailAddress>,
    to: Vec<EmailAddress>,
    subject: String,
    plain_body: String,
    html_body: String,
    rfc_message_id: Option<String>,
    references: Option<String>,
    received_at: Option<DateTime<Utc>>,
    label_ids: Vec<String>,
}

impl ThreadMessageBuilder {
    fn new(id: MessageId, thread_id: ThreadId) -> Self {
        Self {
            id,
            thread_id,
            from: None,
            to: Vec::new(),
            subject: String::new(),
            plain_body: String::new(),
            html_body: String::new(),
            rfc_message_id: None,
            references: None,
            received_at: None,
            label_ids: Vec::new(),
        }
    }

    pub fn from(mut self, from: EmailAddress) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: Vec<EmailAddress>) -> Self {
        self.to = to;
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn plain_body(mut self, body: impl Into<String>) -> Self {
        self.plain_body = body.into();
        self
    }

    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        self.html_body = body.into();
        self
    }

    pub fn rfc_message_id(mut self, id: Option<String>) -> Self {
        self.rfc_message_id = id;
        self
    }

    pub fn references(mut self, references: Option<String>) -> Self {
        self.references = references;
        self
    }

    pub fn received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = Some(received_at);
        self
    }

    pub fn label_ids(mut self, label_ids: Vec<String>) -> Self {
        self.label_ids = label_ids;
        self
    }

    pub fn build(self) -> ThreadMessage {
        ThreadMessage {
            id: self.id,
            thread_id: self.thread_id,
            from: self
                .from
                .unwrap_or_else(|| EmailAddress::new("unknown@unknown.com")),
            to: self.to,
            subject: self.subject,
            plain_body: self.plain_body,
            html_body: self.html_body,
            rfc_message_id: self.rfc_message_id,
            references: self.references,
            received_at: self.received_at.unwrap_or_else(Utc::now),
            label_ids: self.label_ids,
        }
    }
}

/// A freshly merged message ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
    /// Inline images keyed by content id
    pub inline_images: BTreeMap<String, Attachment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email_with_name() {
        let addr = EmailAddress::parse("John Doe <john@example.com>");
        assert_eq!(addr.name, Some("John Doe".to_string()));
        assert_eq!(addr.email, "john@example.com");
    }

    #[test]
    fn test_parse_email_with_quoted_name() {
        let addr = EmailAddress::parse("\"Doe, John\" <john@example.com>");
        assert_eq!(addr.name, Some("Doe, John".to_string()));
        assert_eq!(addr.email, "john@example.com");
    }

    #[test]
    fn test_parse_email_without_name() {
        let addr = EmailAddress::parse("john@example.com");
        assert_eq!(addr.name, None);
        assert_eq!(addr.email, "john@example.com");
    }

    #[test]
    fn test_parse_list_skips_blanks() {
        let addrs = EmailAddress::parse_list("a@x.com, , Bob <bob@x.com>");
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[1].email, "bob@x.com");
    }

    #[test]
    fn test_is_identity_ignores_case() {
        let addr = EmailAddress::with_name("Me", "Me@Example.com");
        assert!(addr.is_identity("me@example.com"));
        assert!(!addr.is_identity("other@example.com"));
        assert!(!addr.is_identity(""));
    }

    #[test]
    fn test_display_with_name() {
        let addr = EmailAddress::with_name("John Doe", "john@example.com");
        assert_eq!(addr.display(), "John Doe <john@example.com>");
    }

    #[test]
    fn test_builder_defaults() {
        let msg = ThreadMessage::builder(MessageId::new("m1"), ThreadId::new("t1"))
            .subject("Hello")
            .label_ids(vec!["SENT".to_string()])
            .build();
        assert_eq!(msg.from.email, "unknown@unknown.com");
        assert!(msg.has_label("sent"));
        assert!(msg.rfc_message_id.is_none());
    }
}
