//! Gmail as draft store and mail transport

use anyhow::Result;
use log::{debug, info};

use super::api::GmailDraft;
use super::mime::{ReplyHeaders, render_message};
use super::normalize::{draft_subject, normalize_draft, normalize_thread};
use super::GmailClient;
use crate::models::{Draft, EmailAddress, MailThread, OutgoingMessage, ThreadMessage};
use crate::storage::DraftStore;
use crate::transport::MailTransport;

impl GmailClient {
    fn load_draft(&self, draft: GmailDraft) -> Result<Draft> {
        normalize_draft(draft, |message_id, attachment_id| {
            self.get_attachment(message_id, attachment_id)
        })
    }

    fn send_threaded(&self, message: &OutgoingMessage, original: &ThreadMessage) -> Result<()> {
        let headers = original
            .rfc_message_id
            .as_deref()
            .map(|id| ReplyHeaders::answering(id, original.references.as_deref()));
        let raw = render_message(&self.identity()?, message, headers.as_ref())?;
        self.send_raw(&raw, Some(original.thread_id.as_str()))?;
        Ok(())
    }
}

impl DraftStore for GmailClient {
    fn find_by_subject(&self, subject: &str) -> Result<Option<Draft>> {
        let drafts = self.list_drafts_all()?;
        debug!("Scanning {} drafts for subject {:?}", drafts.len(), subject);

        for draft_ref in drafts {
            let draft = self.get_draft(&draft_ref.id)?;
            if draft_subject(&draft).as_deref() == Some(subject) {
                info!("Using draft {} as template", draft.id);
                return self.load_draft(draft).map(Some);
            }
        }
        Ok(None)
    }
}

impl MailTransport for GmailClient {
    fn send(&self, message: &OutgoingMessage) -> Result<()> {
        let raw = render_message(&self.identity()?, message, None)?;
        self.send_raw(&raw, None)?;
        Ok(())
    }

    fn search_threads(&self, query: &str, limit: usize) -> Result<Vec<MailThread>> {
        self.list_threads(query, limit)?
            .iter()
            .map(|thread| normalize_thread(self.get_thread_with_retry(&thread.id)?))
            .collect()
    }

    fn reply(&self, message: &ThreadMessage, text: &str, html: &str) -> Result<()> {
        let subject = if message.subject.to_lowercase().starts_with("re:") {
            message.subject.clone()
        } else {
            format!("Re: {}", message.subject)
        };
        let reply = OutgoingMessage {
            to: message.from.email.clone(),
            subject,
            text: text.to_string(),
            html: html.to_string(),
            attachments: Vec::new(),
            inline_images: Default::default(),
        };
        self.send_threaded(&reply, message)
    }

    fn forward(
        &self,
        message: &ThreadMessage,
        to: &[EmailAddress],
        subject: &str,
        html: &str,
    ) -> Result<()> {
        let forward = OutgoingMessage {
            to: to
                .iter()
                .map(|address| address.email.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            subject: subject.to_string(),
            text: message.plain_body.clone(),
            html: html.to_string(),
            attachments: Vec::new(),
            inline_images: Default::default(),
        };
        self.send_threaded(&forward, message)
    }

    fn current_identity(&self) -> Result<String> {
        self.identity()
    }
}
