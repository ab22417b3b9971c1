//! RFC 822 rendering of outgoing messages
//!
//! The layout mirrors what Gmail itself produces for a draft with inline
//! images and attachments:
//!
//! ```text
//! multipart/mixed
//! ├── multipart/related
//! │   ├── multipart/alternative (text/plain, text/html)
//! │   └── image parts (Content-ID)
//! └── attachment parts
//! ```
//!
//! Empty levels are left out.

use anyhow::{Context, Result, anyhow};
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, Message, MultiPart, SinglePart};

use crate::models::{Attachment, OutgoingMessage};

/// Threading headers for replies and forwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyHeaders {
    pub in_reply_to: String,
    pub references: String,
}

impl ReplyHeaders {
    /// Build headers answering a message with the given `Message-ID` and
    /// prior `References` chain
    pub fn answering(message_id: &str, references: Option<&str>) -> Self {
        let references = match references.map(str::trim).filter(|r| !r.is_empty()) {
            Some(prior) => format!("{} {}", prior, message_id),
            None => message_id.to_string(),
        };
        Self {
            in_reply_to: message_id.to_string(),
            references,
        }
    }
}

/// Render `message` as an RFC 822 byte stream sent from `from`
pub fn render_message(
    from: &str,
    message: &OutgoingMessage,
    reply: Option<&ReplyHeaders>,
) -> Result<Vec<u8>> {
    let from: Mailbox = from
        .parse()
        .with_context(|| format!("Invalid sender address: {}", from))?;

    let mut builder = Message::builder().from(from).subject(message.subject.as_str());

    let mut recipients = 0;
    for address in message.to.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        let mailbox: Mailbox = address
            .parse()
            .with_context(|| format!("Invalid argument: {}", address))?;
        builder = builder.to(mailbox);
        recipients += 1;
    }
    if recipients == 0 {
        anyhow::bail!("Invalid argument: recipient");
    }

    if let Some(reply) = reply {
        builder = builder
            .in_reply_to(reply.in_reply_to.clone())
            .references(reply.references.clone());
    }

    let email = builder
        .multipart(body_parts(message)?)
        .context("Failed to build MIME message")?;

    Ok(email.formatted())
}

fn body_parts(message: &OutgoingMessage) -> Result<MultiPart> {
    let alternative =
        MultiPart::alternative_plain_html(message.text.clone(), message.html.clone());

    let body = if message.inline_images.is_empty() {
        alternative
    } else {
        let mut related = MultiPart::related().multipart(alternative);
        for (content_id, image) in &message.inline_images {
            related = related.singlepart(inline_part(content_id, image)?);
        }
        related
    };

    if message.attachments.is_empty() {
        return Ok(body);
    }

    let mut mixed = MultiPart::mixed().multipart(body);
    for attachment in &message.attachments {
        mixed = mixed.singlepart(
            MimeAttachment::new(attachment.name.clone())
                .body(attachment.data.clone(), content_type(attachment)?),
        );
    }
    Ok(mixed)
}

fn inline_part(content_id: &str, image: &Attachment) -> Result<SinglePart> {
    Ok(MimeAttachment::new_inline(content_id.to_string())
        .body(image.data.clone(), content_type(image)?))
}

fn content_type(attachment: &Attachment) -> Result<ContentType> {
    ContentType::parse(&attachment.content_type)
        .or_else(|_| ContentType::parse("application/octet-stream"))
        .map_err(|e| anyhow!("Invalid content type for {}: {}", attachment.name, e))
}
