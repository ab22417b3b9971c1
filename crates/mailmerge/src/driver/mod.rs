//! Merge driver: turns a template and a row set into sent mail
//!
//! Two modes share one contract. Both resolve the template, refuse to run
//! over a partially filled status column, skip rows that already have a
//! status and write every row's outcome back in one column write.
//!
//! - direct: one fresh message per row
//! - thread: continue the conversation found for each row in the sent mail

mod guard;
mod merge;
mod outcome;
mod thread;

pub use guard::is_safe_to_run;
pub use merge::MergeDriver;
pub use outcome::{MergeMode, MergeReport, PendingThreadError, SendOutcome};
pub use thread::{Continuation, choose_continuation, quote_plain, resolve_filter_subject, wrap_html};
