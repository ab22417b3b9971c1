//! Drafts and the merge templates extracted from them

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A file attached to a draft or outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name; inline images are matched by it
    pub name: String,
    pub content_type: String,
    /// `Content-ID` without angle brackets, for inline parts
    pub content_id: Option<String>,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            content_id: None,
            data,
        }
    }

    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }
}

/// A drafted message as read from a draft store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub id: String,
    pub subject: String,
    pub plain: String,
    pub html: String,
    /// Inline image parts referenced from the html body
    pub inline_images: Vec<Attachment>,
    /// Regular (non-inline) attachments
    pub attachments: Vec<Attachment>,
}

/// The text fields that token substitution operates on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFields {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl MessageFields {
    pub fn new(
        subject: impl Into<String>,
        text: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            text: text.into(),
            html: html.into(),
        }
    }
}

/// Reusable message skeleton extracted once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub message: MessageFields,
    pub attachments: Vec<Attachment>,
    /// Inline images keyed by the content id used in the html body
    pub inline_images: BTreeMap<String, Attachment>,
}
