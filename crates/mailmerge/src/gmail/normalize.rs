//! Gmail API response normalization
//!
//! Converts Gmail API drafts and threads to the merge domain models.

use anyhow::{Context, Result};
use base64::prelude::*;
use chrono::{TimeZone, Utc};

use super::api::{GmailDraft, GmailMessage, GmailThread, MessagePart};
use crate::models::{
    Attachment, Draft, EmailAddress, MailThread, MessageId, ThreadId, ThreadMessage,
};

/// Normalize a Gmail draft, fetching attachment bodies that are stored
/// out of line through `fetch_attachment(message_id, attachment_id)`
pub fn normalize_draft<F>(draft: GmailDraft, fetch_attachment: F) -> Result<Draft>
where
    F: Fn(&str, &str) -> Result<Vec<u8>>,
{
    let message = draft.message;
    let payload = message.payload.as_ref().context("Draft has no payload")?;

    let mut inline_images = Vec::new();
    let mut attachments = Vec::new();
    for (part, in_related) in attachment_parts(payload) {
        let inline = is_inline_part(part, in_related);
        let attachment = load_attachment(part, &message.id, inline, &fetch_attachment)?;
        if inline {
            inline_images.push(attachment);
        } else {
            attachments.push(attachment);
        }
    }

    Ok(Draft {
        id: draft.id,
        subject: extract_header(payload, "Subject").unwrap_or_default(),
        plain: extract_body(payload, "text/plain").unwrap_or_default(),
        html: extract_body(payload, "text/html").unwrap_or_default(),
        inline_images,
        attachments,
    })
}

/// Subject header of a draft, without loading its attachments
pub fn draft_subject(draft: &GmailDraft) -> Option<String> {
    extract_header(draft.message.payload.as_ref()?, "Subject")
}

/// Normalize a Gmail thread and all of its messages
pub fn normalize_thread(thread: GmailThread) -> Result<MailThread> {
    let messages = thread
        .messages
        .into_iter()
        .map(normalize_message)
        .collect::<Result<Vec<_>>>()?;
    Ok(MailThread::new(ThreadId::new(thread.id), messages))
}

/// Normalize a single message inside a thread
fn normalize_message(gmail_msg: GmailMessage) -> Result<ThreadMessage> {
    let id = MessageId::new(&gmail_msg.id);
    let thread_id = ThreadId::new(&gmail_msg.thread_id);

    let payload = gmail_msg
        .payload
        .as_ref()
        .context("Message has no payload")?;

    let from = extract_header(payload, "From")
        .map(|s| EmailAddress::parse(&s))
        .unwrap_or_else(|| EmailAddress::new("unknown@unknown.com"));

    let to = extract_header(payload, "To")
        .map(|s| EmailAddress::parse_list(&s))
        .unwrap_or_default();

    // Parse internal date (milliseconds since epoch)
    let internal_date: i64 = gmail_msg
        .internal_date
        .as_deref()
        .and_then(|d| d.parse().ok())
        .unwrap_or(0);
    let received_at = Utc
        .timestamp_millis_opt(internal_date)
        .single()
        .unwrap_or_else(Utc::now);

    Ok(ThreadMessage::builder(id, thread_id)
        .from(from)
        .to(to)
        .subject(extract_header(payload, "Subject").unwrap_or_default())
        .plain_body(extract_body(payload, "text/plain").unwrap_or_default())
        .html_body(extract_body(payload, "text/html").unwrap_or_default())
        .rfc_message_id(extract_header(payload, "Message-ID"))
        .references(extract_header(payload, "References"))
        .received_at(received_at)
        .label_ids(gmail_msg.label_ids.unwrap_or_default())
        .build())
}

/// Extract a header value by name
fn extract_header(part: &MessagePart, name: &str) -> Option<String> {
    part.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

fn has_mime_type(part: &MessagePart, mime: &str) -> bool {
    part.mime_type.as_ref().is_some_and(|m| m.starts_with(mime))
}

fn has_filename(part: &MessagePart) -> bool {
    part.filename.as_ref().is_some_and(|f| !f.is_empty())
}

/// Find the first body of the given mime type, depth first
///
/// Parts that carry a filename are attachments, never the body.
fn extract_body(part: &MessagePart, mime: &str) -> Option<String> {
    if has_mime_type(part, mime)
        && !has_filename(part)
        && let Some(body) = &part.body
        && let Some(data) = &body.data
        && let Some(text) = decode_base64_body(data)
    {
        return Some(text);
    }

    part.parts
        .as_ref()?
        .iter()
        .find_map(|nested| extract_body(nested, mime))
}

/// Collect every part that carries a filename, in document order, flagged
/// with whether its direct parent is `multipart/related`
fn attachment_parts(root: &MessagePart) -> Vec<(&MessagePart, bool)> {
    let mut found = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((part, in_related)) = stack.pop() {
        if has_filename(part) {
            found.push((part, in_related));
        }
        if let Some(parts) = &part.parts {
            let related = has_mime_type(part, "multipart/related");
            stack.extend(parts.iter().rev().map(|nested| (nested, related)));
        }
    }
    found
}

/// An `attachment` disposition is regular even with a `Content-ID` or
/// `X-Attachment-Id`. Without a disposition, a `Content-ID` marks a part
/// inline only inside `multipart/related`.
fn is_inline_part(part: &MessagePart, in_related: bool) -> bool {
    let disposition = extract_header(part, "Content-Disposition")
        .map(|d| d.trim_start().to_ascii_lowercase());
    match disposition.as_deref() {
        Some(d) if d.starts_with("attachment") => false,
        Some(d) if d.starts_with("inline") => true,
        _ => in_related && extract_header(part, "Content-ID").is_some(),
    }
}

fn load_attachment<F>(
    part: &MessagePart,
    message_id: &str,
    inline: bool,
    fetch: &F,
) -> Result<Attachment>
where
    F: Fn(&str, &str) -> Result<Vec<u8>>,
{
    let name = part.filename.clone().unwrap_or_default();
    let body = part.body.as_ref();

    let data = match (
        body.and_then(|b| b.data.as_deref()),
        body.and_then(|b| b.attachment_id.as_deref()),
    ) {
        (Some(data), _) => decode_base64_bytes(data)
            .with_context(|| format!("Attachment {} is not valid base64", name))?,
        (None, Some(attachment_id)) => fetch(message_id, attachment_id)
            .with_context(|| format!("Failed to fetch attachment {}", name))?,
        (None, None) => Vec::new(),
    };

    let content_type = part
        .mime_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let mut attachment = Attachment::new(name, content_type, data);
    if !inline {
        return Ok(attachment);
    }
    if let Some(cid) = extract_header(part, "Content-ID").or_else(|| extract_header(part, "X-Attachment-Id")) {
        let cid = cid.trim().trim_start_matches('<').trim_end_matches('>');
        if !cid.is_empty() {
            attachment = attachment.with_content_id(cid);
        }
    }
    Ok(attachment)
}

/// Decode base64-encoded bytes
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple decoders.
pub(crate) fn decode_base64_bytes(data: &str) -> Option<Vec<u8>> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    decoders.iter().find_map(|decoder| decoder.decode(data).ok())
}

/// Decode base64-encoded body text
fn decode_base64_body(data: &str) -> Option<String> {
    decode_base64_bytes(data).and_then(|bytes| String::from_utf8(bytes).ok())
}
