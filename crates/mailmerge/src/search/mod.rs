//! Gmail-style search queries
//!
//! Queries are built here for thread lookups and parsed back by the
//! in-memory mailbox so both sides agree on the syntax.

mod query_parser;

pub use query_parser::{ParsedQuery, parse_query, sent_thread_query};
