//! In-memory row store and mailbox
//!
//! Used by tests and by embedders that already hold their rows and drafts
//! in memory. Both types use RwLocks so they can be shared behind `Arc`.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow, bail};
use chrono::Utc;

use super::{DraftStore, RowStore};
use crate::models::{
    Draft, EmailAddress, MailThread, MessageId, OutgoingMessage, SheetData, StatusCell, ThreadId,
    ThreadMessage,
};
use crate::search::parse_query;
use crate::transport::MailTransport;

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

/// Row store backed by a header and rows held in memory
///
/// Column writes update the held rows, so a second `read_all` sees them.
pub struct InMemoryRowStore {
    sheet: RwLock<SheetData>,
    writes: RwLock<usize>,
}

impl InMemoryRowStore {
    pub fn new(sheet: SheetData) -> Self {
        Self {
            sheet: RwLock::new(sheet),
            writes: RwLock::new(0),
        }
    }

    /// Build from string slices, header first
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(SheetData::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        ))
    }

    /// Current contents
    pub fn snapshot(&self) -> Result<SheetData> {
        Ok(read(&self.sheet)?.clone())
    }

    /// Values of one column for every data row, by header name
    pub fn column(&self, name: &str) -> Result<Vec<String>> {
        let sheet = read(&self.sheet)?;
        let index = sheet
            .headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("no column named {:?}", name))?;
        Ok(sheet
            .rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or_default())
            .collect())
    }

    /// Number of `write_column` calls so far
    pub fn write_count(&self) -> Result<usize> {
        Ok(*read(&self.writes)?)
    }
}

impl RowStore for InMemoryRowStore {
    fn read_all(&self) -> Result<SheetData> {
        self.snapshot()
    }

    fn write_column(&self, start_row: usize, column_index: usize, values: &[StatusCell]) -> Result<()> {
        if start_row < 2 {
            bail!("data rows start at row 2, got {}", start_row);
        }
        let mut sheet = write(&self.sheet)?;
        if column_index >= sheet.headers.len() {
            bail!("column {} is outside the header", column_index);
        }

        let width = sheet.headers.len();
        let first = start_row - 2;
        for (offset, value) in values.iter().enumerate() {
            let index = first + offset;
            if index >= sheet.rows.len() {
                sheet.rows.resize(index + 1, Vec::new());
            }
            let row = &mut sheet.rows[index];
            if row.len() < width {
                row.resize(width, String::new());
            }
            row[column_index] = value.render();
        }

        *write(&self.writes)? += 1;
        Ok(())
    }
}

/// Something the in-memory mailbox was asked to deliver
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Sent(OutgoingMessage),
    Reply {
        message_id: MessageId,
        to: EmailAddress,
        text: String,
        html: String,
    },
    Forward {
        message_id: MessageId,
        to: Vec<EmailAddress>,
        subject: String,
        html: String,
    },
}

/// Draft store and mail transport held entirely in memory
///
/// Sent messages become new threads labelled `SENT`; replies are appended to
/// the thread they answer. Searches accept the operators understood by
/// [`parse_query`] and return the newest threads first.
pub struct InMemoryMailbox {
    identity: String,
    drafts: RwLock<Vec<Draft>>,
    threads: RwLock<Vec<MailThread>>,
    deliveries: RwLock<Vec<Delivery>>,
    searches: RwLock<Vec<String>>,
    /// Recipient address -> error message for simulated send failures
    failures: RwLock<Vec<(String, String)>>,
    next_id: RwLock<u64>,
}

impl InMemoryMailbox {
    /// Create an empty mailbox owned by `identity`
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            drafts: RwLock::new(Vec::new()),
            threads: RwLock::new(Vec::new()),
            deliveries: RwLock::new(Vec::new()),
            searches: RwLock::new(Vec::new()),
            failures: RwLock::new(Vec::new()),
            next_id: RwLock::new(1),
        }
    }

    /// Add a draft after the existing ones
    pub fn add_draft(&self, draft: Draft) {
        if let Ok(mut drafts) = self.drafts.write() {
            drafts.push(draft);
        }
    }

    /// Add an existing conversation
    pub fn add_thread(&self, thread: MailThread) {
        if let Ok(mut threads) = self.threads.write() {
            threads.push(thread);
        }
    }

    /// Make every send, reply or forward to `recipient` fail with `message`
    pub fn fail_deliveries_to(&self, recipient: impl Into<String>, message: impl Into<String>) {
        if let Ok(mut failures) = self.failures.write() {
            failures.push((recipient.into(), message.into()));
        }
    }

    /// Everything delivered so far, in order
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .read()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// Every search query received so far, in order
    pub fn searches(&self) -> Vec<String> {
        self.searches
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Current state of a thread
    pub fn thread(&self, id: &ThreadId) -> Option<MailThread> {
        self.threads
            .read()
            .ok()
            .and_then(|threads| threads.iter().find(|t| &t.id == id).cloned())
    }

    fn check_failure(&self, recipients: &[&str]) -> Result<()> {
        let failures = read(&self.failures)?;
        for (address, message) in failures.iter() {
            if recipients.iter().any(|r| r.eq_ignore_ascii_case(address)) {
                bail!("{}", message);
            }
        }
        Ok(())
    }

    fn allocate_id(&self, prefix: &str) -> Result<String> {
        let mut next = write(&self.next_id)?;
        let id = format!("{}{}", prefix, *next);
        *next += 1;
        Ok(id)
    }

    fn outgoing_message(
        &self,
        thread_id: ThreadId,
        to: Vec<EmailAddress>,
        subject: &str,
        text: &str,
        html: &str,
    ) -> Result<ThreadMessage> {
        let id = self.allocate_id("m")?;
        Ok(ThreadMessage::builder(MessageId::new(id.clone()), thread_id)
            .from(EmailAddress::new(self.identity.clone()))
            .to(to)
            .subject(subject)
            .plain_body(text)
            .html_body(html)
            .rfc_message_id(Some(format!("<{}@mailbox.local>", id)))
            .received_at(Utc::now())
            .label_ids(vec!["SENT".to_string()])
            .build())
    }
}

impl DraftStore for InMemoryMailbox {
    fn find_by_subject(&self, subject: &str) -> Result<Option<Draft>> {
        Ok(read(&self.drafts)?
            .iter()
            .find(|d| d.subject == subject)
            .cloned())
    }
}

impl MailTransport for InMemoryMailbox {
    fn send(&self, message: &OutgoingMessage) -> Result<()> {
        if message.to.trim().is_empty() {
            bail!("Invalid argument: recipient");
        }
        self.check_failure(&[message.to.trim()])?;

        let thread_id = ThreadId::new(self.allocate_id("t")?);
        let sent = self.outgoing_message(
            thread_id.clone(),
            EmailAddress::parse_list(&message.to),
            &message.subject,
            &message.text,
            &message.html,
        )?;
        write(&self.threads)?.push(MailThread::new(thread_id, vec![sent]));
        write(&self.deliveries)?.push(Delivery::Sent(message.clone()));
        Ok(())
    }

    fn search_threads(&self, query: &str, limit: usize) -> Result<Vec<MailThread>> {
        write(&self.searches)?.push(query.to_string());
        let parsed = parse_query(query);
        Ok(read(&self.threads)?
            .iter()
            .rev()
            .filter(|thread| parsed.matches(thread))
            .take(limit)
            .cloned()
            .collect())
    }

    fn reply(&self, message: &ThreadMessage, text: &str, html: &str) -> Result<()> {
        self.check_failure(&[message.from.email.as_str()])?;

        let subject = if message.subject.to_lowercase().starts_with("re:") {
            message.subject.clone()
        } else {
            format!("Re: {}", message.subject)
        };
        let reply = self.outgoing_message(
            message.thread_id.clone(),
            vec![message.from.clone()],
            &subject,
            text,
            html,
        )?;

        let mut threads = write(&self.threads)?;
        if let Some(thread) = threads.iter_mut().find(|t| t.id == message.thread_id) {
            thread.messages.push(reply);
        }
        drop(threads);

        write(&self.deliveries)?.push(Delivery::Reply {
            message_id: message.id.clone(),
            to: message.from.clone(),
            text: text.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }

    fn forward(
        &self,
        message: &ThreadMessage,
        to: &[EmailAddress],
        subject: &str,
        html: &str,
    ) -> Result<()> {
        if to.is_empty() {
            bail!("Invalid argument: recipient");
        }
        let recipients: Vec<&str> = to.iter().map(|a| a.email.as_str()).collect();
        self.check_failure(&recipients)?;

        let forwarded = self.outgoing_message(
            message.thread_id.clone(),
            to.to_vec(),
            subject,
            &message.plain_body,
            html,
        )?;
        let mut threads = write(&self.threads)?;
        if let Some(thread) = threads.iter_mut().find(|t| t.id == message.thread_id) {
            thread.messages.push(forwarded);
        }
        drop(threads);

        write(&self.deliveries)?.push(Delivery::Forward {
            message_id: message.id.clone(),
            to: to.to_vec(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }

    fn current_identity(&self) -> Result<String> {
        Ok(self.identity.clone())
    }
}
