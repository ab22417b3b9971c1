//! The merge driver
//!
//! Coordinates the draft store, row store, transport and prompter for one
//! run. Row-level failures become status text; only setup failures and
//! row store errors abort the run.

use std::sync::Arc;

use log::{debug, info, warn};

use super::guard::is_safe_to_run;
use super::outcome::{MergeMode, MergeReport, PendingThreadError, SendOutcome};
use super::thread::{Continuation, choose_continuation, resolve_filter_subject, wrap_html};
use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::models::{OutgoingMessage, Row, RowSet, StatusCell, Template};
use crate::prompt::Prompter;
use crate::search::sent_thread_query;
use crate::storage::{DraftStore, RowStore};
use crate::template::{fill, resolve_template};
use crate::transport::MailTransport;

/// Sheet row of the first data row; the header is row 1
const FIRST_DATA_ROW: usize = 2;

/// Only the newest matching conversation is continued
const THREAD_SEARCH_LIMIT: usize = 1;

/// Everything a run needs once setup has succeeded
struct Prepared {
    template: Template,
    rows: RowSet,
    status_index: usize,
}

/// Runs mail merges in direct or thread-continuation mode
pub struct MergeDriver {
    config: MergeConfig,
    drafts: Arc<dyn DraftStore>,
    transport: Arc<dyn MailTransport>,
    prompter: Arc<dyn Prompter>,
}

impl MergeDriver {
    pub fn new(
        config: MergeConfig,
        drafts: Arc<dyn DraftStore>,
        transport: Arc<dyn MailTransport>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            config,
            drafts,
            transport,
            prompter,
        }
    }

    /// Send one fresh message per row
    ///
    /// `subject_line` names the draft to use; when absent the user is asked.
    ///
    /// # Errors
    /// [`MergeError::TemplateNotFound`], [`MergeError::MissingColumn`] and
    /// [`MergeError::UnsafeRerun`] before anything is sent;
    /// [`MergeError::Backend`] when the row or draft store fails.
    pub fn run_direct(
        &self,
        subject_line: Option<&str>,
        rows: &dyn RowStore,
    ) -> Result<MergeReport, MergeError> {
        let Some(prepared) = self.prepare("Mail Merge", subject_line, rows)? else {
            return Ok(MergeReport::cancelled());
        };

        let statuses = prepared
            .rows
            .rows()
            .iter()
            .enumerate()
            .fold(Vec::with_capacity(prepared.rows.len()), |mut statuses, (index, row)| {
                statuses.push(self.direct_row(&prepared.template, row, index));
                statuses
            });

        self.finish(MergeMode::Direct, &prepared, statuses, Vec::new(), rows)
    }

    /// Continue the sent conversation found for each row
    ///
    /// Same contract as [`run_direct`](Self::run_direct). Rows with no
    /// matching conversation are reported together at the end.
    pub fn run_thread(
        &self,
        subject_line: Option<&str>,
        rows: &dyn RowStore,
    ) -> Result<MergeReport, MergeError> {
        let Some(prepared) = self.prepare("Thread Loop Mail Merge", subject_line, rows)? else {
            return Ok(MergeReport::cancelled());
        };

        let identity = self.transport.current_identity()?;
        debug!("Continuing threads as {}", identity);

        let (statuses, pending) = prepared.rows.rows().iter().enumerate().fold(
            (Vec::with_capacity(prepared.rows.len()), Vec::new()),
            |(mut statuses, mut pending), (index, row)| {
                let (status, unmatched) = self.thread_row(&prepared.template, row, index, &identity);
                statuses.push(status);
                if unmatched {
                    pending.push(PendingThreadError {
                        row: row.clone(),
                        row_number: index + FIRST_DATA_ROW,
                    });
                }
                (statuses, pending)
            },
        );

        if !pending.is_empty() {
            self.report_pending(&pending);
        }

        self.finish(MergeMode::Thread, &prepared, statuses, pending, rows)
    }

    /// Subject, template, rows and guard; `None` when the user cancelled
    fn prepare(
        &self,
        title: &str,
        subject_line: Option<&str>,
        rows: &dyn RowStore,
    ) -> Result<Option<Prepared>, MergeError> {
        let subject_line = match subject_line.filter(|s| !s.trim().is_empty()) {
            Some(subject) => subject.to_string(),
            None => match self.ask_subject(title)? {
                Some(subject) => subject,
                None => {
                    info!("Merge cancelled at the subject prompt");
                    return Ok(None);
                }
            },
        };

        let template = resolve_template(self.drafts.as_ref(), &subject_line).inspect_err(|err| {
            if matches!(err, MergeError::TemplateNotFound { .. }) {
                self.prompter.notify(title, &format!("Draft not found: {}", err));
            }
        })?;

        let rows = RowSet::from_sheet(rows.read_all()?);
        let status_field = &self.config.status_field;
        let status_index = rows.column_index(status_field).ok_or_else(|| {
            self.prompter.notify(
                title,
                &format!("Add a \"{}\" column to the sheet and retry.", status_field),
            );
            MergeError::MissingColumn {
                column: status_field.clone(),
            }
        })?;

        if !is_safe_to_run(&rows, status_field) {
            self.prompter.notify(
                title,
                &format!("Clear the \"{}\" column and retry.", status_field),
            );
            return Err(MergeError::UnsafeRerun {
                status_field: status_field.clone(),
            });
        }

        info!("Merging {} rows with draft {:?}", rows.len(), subject_line);
        Ok(Some(Prepared {
            template,
            rows,
            status_index,
        }))
    }

    fn ask_subject(&self, title: &str) -> Result<Option<String>, MergeError> {
        let answer = self.prompter.prompt_text(
            title,
            "Type or paste the subject line of the draft to merge with:",
        )?;
        Ok(answer.filter(|a| !a.trim().is_empty() && a.trim() != "cancel"))
    }

    fn direct_row(&self, template: &Template, row: &Row, index: usize) -> StatusCell {
        let status_field = &self.config.status_field;
        let prior = row.value(status_field);
        if !prior.is_empty() {
            return StatusCell::Unchanged(prior.to_string());
        }

        let fields = match fill(&template.message, row) {
            Ok(fields) => fields,
            Err(err) => {
                warn!("Row {}: {}", index + FIRST_DATA_ROW, err);
                return StatusCell::Error(err.to_string());
            }
        };

        let message = OutgoingMessage {
            to: row.value(&self.config.recipient_field).to_string(),
            subject: fields.subject,
            text: fields.text,
            html: fields.html,
            attachments: template.attachments.clone(),
            inline_images: template.inline_images.clone(),
        };

        debug!("Row {}: sending to {:?}", index + FIRST_DATA_ROW, message.to);
        let outcome = SendOutcome::capture(self.transport.send(&message));
        if let SendOutcome::Failed(reason) = &outcome {
            warn!("Row {}: {}", index + FIRST_DATA_ROW, reason);
        }
        outcome.into()
    }

    /// Status for one thread-mode row, and whether it found no conversation
    fn thread_row(
        &self,
        template: &Template,
        row: &Row,
        index: usize,
        identity: &str,
    ) -> (StatusCell, bool) {
        let row_number = index + FIRST_DATA_ROW;
        let prior = row.value(&self.config.status_field);
        if !prior.is_empty() {
            return (StatusCell::Unchanged(prior.to_string()), false);
        }

        let fields = match fill(&template.message, row) {
            Ok(fields) => fields,
            Err(err) => {
                warn!("Row {}: {}", row_number, err);
                return (StatusCell::Error(err.to_string()), false);
            }
        };

        let filter_field = &self.config.filter_field;
        let filter = row.value(filter_field);
        if filter.is_empty() {
            self.prompter.notify(
                "Thread Loop Mail Merge",
                &format!("Enter the \"{}\" for row {}.", filter_field, row_number),
            );
            return (StatusCell::Empty, false);
        }

        let subject = match resolve_filter_subject(filter, row) {
            Ok(subject) => subject,
            Err(err) => {
                self.prompter.notify(
                    "Thread Loop Mail Merge",
                    &format!(
                        "Check the \"{}\" placeholders in row {}: {}.",
                        filter_field, row_number, err
                    ),
                );
                return (StatusCell::Empty, false);
            }
        };

        let recipient = row.value(&self.config.recipient_field);
        let query = sent_thread_query(recipient, &subject);
        debug!("Row {}: searching {}", row_number, query);

        let threads = match self.transport.search_threads(&query, THREAD_SEARCH_LIMIT) {
            Ok(threads) => threads,
            Err(err) => {
                let outcome = SendOutcome::capture(Err(err));
                return (outcome.into(), false);
            }
        };

        let Some(last) = threads.first().and_then(|thread| thread.last_message()) else {
            debug!("Row {}: no sent thread matches", row_number);
            return (StatusCell::Empty, true);
        };

        let html = wrap_html(&fields.html, &last.html_body);
        let result = match choose_continuation(last, identity) {
            Continuation::Forward { to, subject } => {
                debug!("Row {}: forwarding thread {}", row_number, last.thread_id.as_str());
                self.transport.forward(last, &to, &subject, &html)
            }
            Continuation::Reply { text } => {
                debug!("Row {}: replying in thread {}", row_number, last.thread_id.as_str());
                self.transport.reply(last, &text, &html)
            }
        };

        let outcome = SendOutcome::capture(result);
        if let SendOutcome::Failed(reason) = &outcome {
            warn!("Row {}: {}", row_number, reason);
        }
        (outcome.into(), false)
    }

    fn report_pending(&self, pending: &[PendingThreadError]) {
        let identity_field = &self.config.identity_field;
        let names = pending
            .iter()
            .map(|p| p.row.value(identity_field))
            .collect::<Vec<_>>()
            .join(", ");
        let numbers = pending
            .iter()
            .map(|p| p.row_number.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        warn!("{} rows found no sent thread", pending.len());
        self.prompter.notify(
            "Remove special characters like [|, /, ^] and retry it.",
            &format!(
                "No sent thread found. Check {}: {} or rows: {}",
                identity_field, names, numbers
            ),
        );
    }

    /// Write statuses back once and build the report
    fn finish(
        &self,
        mode: MergeMode,
        prepared: &Prepared,
        statuses: Vec<StatusCell>,
        pending: Vec<PendingThreadError>,
        rows: &dyn RowStore,
    ) -> Result<MergeReport, MergeError> {
        if !statuses.is_empty() {
            rows.write_column(FIRST_DATA_ROW, prepared.status_index, &statuses)?;
        }

        let report = MergeReport::new(mode, statuses, pending);
        info!("Merge finished: {}", report.summary());
        Ok(report)
    }
}
