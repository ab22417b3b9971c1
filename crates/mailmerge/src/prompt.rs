//! User interaction during a merge run
//!
//! The driver asks for the draft subject and reports problems through a
//! [`Prompter`]. The terminal implementation talks to stdin/stderr; the
//! scripted one replays canned answers and records every notice.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};

/// Interactive surface used by the merge driver
pub trait Prompter: Send + Sync {
    /// Ask for a line of text; `None` means the user cancelled
    fn prompt_text(&self, title: &str, message: &str) -> Result<Option<String>>;

    /// Show a message that needs no answer
    fn notify(&self, title: &str, message: &str);
}

/// Prompts on stdin, notifications on stderr
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for TerminalPrompter {
    fn prompt_text(&self, title: &str, message: &str) -> Result<Option<String>> {
        let mut stderr = std::io::stderr().lock();
        write!(stderr, "{}\n{}\n> ", title, message).context("Failed to write prompt")?;
        stderr.flush().ok();

        let mut line = String::new();
        let read = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read answer")?;

        // EOF (Ctrl-D) cancels
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn notify(&self, title: &str, message: &str) {
        log::info!("{}: {}", title, message);
        eprintln!("\n=== {} ===\n{}\n", title, message);
    }
}

/// A notification captured by [`ScriptedPrompter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

/// Non-interactive prompter with queued answers
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Option<String>>>,
    notices: Mutex<Vec<Notice>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for the next prompt
    pub fn answer(self, answer: impl Into<String>) -> Self {
        self.push(Some(answer.into()));
        self
    }

    /// Queue a cancelled prompt
    pub fn cancel(self) -> Self {
        self.push(None);
        self
    }

    fn push(&self, answer: Option<String>) {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push_back(answer);
        }
    }

    /// Every notification shown so far, oldest first
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt_text(&self, title: &str, _message: &str) -> Result<Option<String>> {
        self.answers
            .lock()
            .map_err(|_| anyhow!("answer queue poisoned"))?
            .pop_front()
            .with_context(|| format!("No scripted answer for prompt {:?}", title))
    }

    fn notify(&self, title: &str, message: &str) {
        log::debug!("notice {}: {}", title, message);
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(Notice {
                title: title.to_string(),
                message: message.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_answers_in_order() {
        let prompter = ScriptedPrompter::new().answer("First").cancel();
        assert_eq!(
            prompter.prompt_text("Mail Merge", "subject?").unwrap(),
            Some("First".to_string())
        );
        assert_eq!(prompter.prompt_text("Mail Merge", "subject?").unwrap(), None);
        assert!(prompter.prompt_text("Mail Merge", "subject?").is_err());
    }

    #[test]
    fn test_scripted_records_notices() {
        let prompter = ScriptedPrompter::new();
        prompter.notify("Error", "Draft not found");
        assert_eq!(
            prompter.notices(),
            vec![Notice {
                title: "Error".to_string(),
                message: "Draft not found".to_string(),
            }]
        );
    }
}
