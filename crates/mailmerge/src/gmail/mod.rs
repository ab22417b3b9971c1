//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 authentication flow shared with the Sheets row store
//! - Gmail API client for drafts, threads and sending
//! - Response normalization to domain models
//! - MIME composition for outgoing messages

mod adapter;
mod auth;
mod client;
mod mime;
mod normalize;

pub use auth::GoogleAuth;
pub use client::GmailClient;
pub use mime::{ReplyHeaders, render_message};
pub use normalize::{draft_subject, normalize_draft, normalize_thread};

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing drafts
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListDraftsResponse {
        pub drafts: Option<Vec<DraftRef>>,
        pub next_page_token: Option<String>,
    }

    /// Reference to a draft (draft ID and its message reference)
    #[derive(Debug, Deserialize)]
    pub struct DraftRef {
        pub id: String,
    }

    /// Full draft from Gmail API
    #[derive(Debug, Deserialize)]
    pub struct GmailDraft {
        pub id: String,
        pub message: GmailMessage,
    }

    /// Full message from Gmail API
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        pub thread_id: String,
        pub label_ids: Option<Vec<String>>,
        #[serde(default)]
        pub internal_date: Option<String>,
        pub payload: Option<MessagePart>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Part body; large or binary parts only carry an attachment id
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageBody {
        pub size: Option<u32>,
        pub data: Option<String>,
        pub attachment_id: Option<String>,
    }

    /// Message part; the payload itself is the root part
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub part_id: Option<String>,
        pub mime_type: Option<String>,
        pub filename: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Response from searching threads
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListThreadsResponse {
        pub threads: Option<Vec<ThreadRef>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ThreadRef {
        pub id: String,
    }

    /// Full thread with all of its messages
    #[derive(Debug, Deserialize)]
    pub struct GmailThread {
        pub id: String,
        #[serde(default)]
        pub messages: Vec<GmailMessage>,
    }

    /// Mailbox owner profile
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProfileResponse {
        pub email_address: String,
    }

    /// Attachment body fetched by id
    #[derive(Debug, Deserialize)]
    pub struct AttachmentResponse {
        pub data: String,
    }

    /// Body of `messages.send`
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SendRequest {
        pub raw: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub thread_id: Option<String>,
    }

    /// Response from `messages.send`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SendResponse {
        pub id: String,
        pub thread_id: Option<String>,
    }
}
