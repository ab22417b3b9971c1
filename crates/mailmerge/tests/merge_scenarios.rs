//! End-to-end merge runs through the in-memory adapters

use std::sync::Arc;

use chrono::Utc;
use mailmerge::models::{MessageId, ThreadId};
use mailmerge::{
    Attachment, Delivery, Draft, EmailAddress, InMemoryMailbox, InMemoryRowStore, MailThread,
    MergeConfig, MergeDriver, MergeError, MergeMode, ScriptedPrompter, SqliteRowStore, StatusCell,
    ThreadMessage,
};
use tempfile::TempDir;

const ME: &str = "me@example.com";

struct Harness {
    mailbox: Arc<InMemoryMailbox>,
    prompter: Arc<ScriptedPrompter>,
    driver: MergeDriver,
}

impl Harness {
    fn new(drafts: Vec<Draft>) -> Self {
        Self::with_prompter(drafts, ScriptedPrompter::new())
    }

    fn with_prompter(drafts: Vec<Draft>, prompter: ScriptedPrompter) -> Self {
        let mailbox = Arc::new(InMemoryMailbox::new(ME));
        for draft in drafts {
            mailbox.add_draft(draft);
        }
        let prompter = Arc::new(prompter);
        let driver = MergeDriver::new(
            MergeConfig::default(),
            mailbox.clone(),
            mailbox.clone(),
            prompter.clone(),
        );
        Self {
            mailbox,
            prompter,
            driver,
        }
    }
}

fn draft(id: &str, subject: &str, plain: &str, html: &str) -> Draft {
    Draft {
        id: id.to_string(),
        subject: subject.to_string(),
        plain: plain.to_string(),
        html: html.to_string(),
        inline_images: Vec::new(),
        attachments: Vec::new(),
    }
}

fn sent_subjects(mailbox: &InMemoryMailbox) -> Vec<String> {
    mailbox
        .deliveries()
        .into_iter()
        .filter_map(|d| match d {
            Delivery::Sent(message) => Some(message.subject),
            _ => None,
        })
        .collect()
}

#[test]
fn test_direct_send_fills_subject_and_records_timestamp() {
    let harness = Harness::new(vec![draft("d1", "Hi {{Name}}", "Hello {{Name}}", "<b>{{Name}}</b>")]);
    let store = InMemoryRowStore::from_rows(
        &["Recipient", "Name", "Email Sent"],
        &[&["a@x.com", "Ana", ""]],
    );

    let before = Utc::now();
    let report = harness.driver.run_direct(Some("Hi {{Name}}"), &store).unwrap();

    assert_eq!(report.mode, MergeMode::Direct);
    assert_eq!(sent_subjects(&harness.mailbox), vec!["Hi Ana".to_string()]);
    match &report.statuses[0] {
        StatusCell::SentAt(at) => assert!(*at >= before),
        other => panic!("expected a timestamp, got {:?}", other),
    }
    let column = store.column("Email Sent").unwrap();
    assert_eq!(column[0], report.statuses[0].render());
    assert_eq!(column[0].len(), "2024-01-01 00:00:00".len());
}

#[test]
fn test_partially_filled_status_column_aborts() {
    let harness = Harness::new(vec![draft("d1", "Hi", "Hello", "")]);
    let store = InMemoryRowStore::from_rows(
        &["Recipient", "Email Sent"],
        &[&["a@x.com", ""], &["b@x.com", "2024-05-01 09:00:00"], &["c@x.com", ""]],
    );

    let err = harness.driver.run_direct(Some("Hi"), &store).unwrap_err();

    assert!(matches!(err, MergeError::UnsafeRerun { .. }));
    assert!(harness.mailbox.deliveries().is_empty());
    assert_eq!(store.write_count().unwrap(), 0);
    assert_eq!(
        store.column("Email Sent").unwrap(),
        vec!["", "2024-05-01 09:00:00", ""]
    );
    assert_eq!(harness.prompter.notices().len(), 1);
}

#[test]
fn test_missing_draft_aborts_with_notice() {
    let harness = Harness::new(vec![draft("d1", "Something else", "", "")]);
    let store = InMemoryRowStore::from_rows(&["Recipient", "Email Sent"], &[&["a@x.com", ""]]);

    let err = harness.driver.run_direct(Some("Hi"), &store).unwrap_err();

    assert!(matches!(err, MergeError::TemplateNotFound { ref subject } if subject == "Hi"));
    assert_eq!(store.write_count().unwrap(), 0);
    assert!(harness.prompter.notices()[0].message.contains("Hi"));
}

#[test]
fn test_prompted_subject_picks_first_matching_draft() {
    let harness = Harness::with_prompter(
        vec![
            draft("d1", "Offer", "first {{Name}}", ""),
            draft("d2", "Offer", "second {{Name}}", ""),
        ],
        ScriptedPrompter::new().answer("Offer"),
    );
    let store = InMemoryRowStore::from_rows(&["Recipient", "Name", "Email Sent"], &[&["a@x.com", "Ana", ""]]);

    harness.driver.run_direct(None, &store).unwrap();

    match &harness.mailbox.deliveries()[0] {
        Delivery::Sent(message) => assert_eq!(message.text, "first Ana"),
        other => panic!("unexpected delivery {:?}", other),
    }
}

#[test]
fn test_subject_with_surrounding_whitespace_selects_exact_draft() {
    for (explicit, answer) in [(Some(" Offer "), None), (None, Some(" Offer "))] {
        let prompter = match answer {
            Some(answer) => ScriptedPrompter::new().answer(answer),
            None => ScriptedPrompter::new(),
        };
        let harness = Harness::with_prompter(
            vec![
                draft("d1", "Offer", "trimmed {{Name}}", ""),
                draft("d2", " Offer ", "spaced {{Name}}", ""),
            ],
            prompter,
        );
        let store = InMemoryRowStore::from_rows(&["Recipient", "Name", "Email Sent"], &[&["a@x.com", "Ana", ""]]);

        let report = harness.driver.run_direct(explicit, &store).unwrap();

        assert_eq!(report.sent, 1);
        match &harness.mailbox.deliveries()[0] {
            Delivery::Sent(message) => {
                assert_eq!(message.text, "spaced Ana");
                assert_eq!(message.subject, " Offer ");
            }
            other => panic!("unexpected delivery {:?}", other),
        }
    }
}

#[test]
fn test_thread_mode_unusable_filter_subject_skips_row() {
    let filter_field = "Original Email Subject For Filtering";
    let cases = [
        ("", "Enter the \"Original Email Subject For Filtering\" for row 2."),
        ("Invoice", "has no {{field}} placeholders"),
        ("   ", "has no {{field}} placeholders"),
        ("{{Topic}}", "placeholder {{Topic}} has no value"),
    ];

    for (filter, expected_notice) in cases {
        let harness = Harness::new(vec![draft("d1", "Follow up", "Any news?", "<p>Any news?</p>")]);
        let thread_id = ThreadId::new("t1");
        let sent = ThreadMessage::builder(MessageId::new("m1"), thread_id.clone())
            .from(EmailAddress::new(ME))
            .to(vec![EmailAddress::new("a@x.com")])
            .subject("Invoice")
            .label_ids(vec!["SENT".to_string()])
            .build();
        harness.mailbox.add_thread(MailThread::new(thread_id, vec![sent]));
        let store = InMemoryRowStore::from_rows(
            &["First name", "Recipient", "Topic", "Email Sent", filter_field],
            &[&["Ana", "a@x.com", "", "", filter]],
        );

        let report = harness.driver.run_thread(Some("Follow up"), &store).unwrap();

        assert_eq!(report.statuses, vec![StatusCell::Empty], "filter {:?}", filter);
        assert!(report.pending.is_empty(), "filter {:?}", filter);
        assert!(harness.mailbox.searches().is_empty(), "filter {:?}", filter);
        assert!(harness.mailbox.deliveries().is_empty(), "filter {:?}", filter);
        assert_eq!(store.column("Email Sent").unwrap(), vec![""]);

        let notices = harness.prompter.notices();
        assert_eq!(notices.len(), 1, "filter {:?}", filter);
        assert_eq!(notices[0].title, "Thread Loop Mail Merge");
        assert!(
            notices[0].message.contains(expected_notice),
            "filter {:?}: {}",
            filter,
            notices[0].message
        );
    }
}

#[test]
fn test_thread_mode_searches_once_per_row() {
    let harness = Harness::new(vec![draft("d1", "Follow up", "Any news?", "<p>Any news?</p>")]);
    let store = InMemoryRowStore::from_rows(
        &["First name", "Recipient", "Topic", "Email Sent", "Original Email Subject For Filtering"],
        &[
            &["Ana", "a@x.com", "Invoice", "", "{{Topic}}"],
            &["Bo", "b@x.com", "Quote", "", "{{Topic}}"],
        ],
    );

    harness.driver.run_thread(Some("Follow up"), &store).unwrap();

    assert_eq!(
        harness.mailbox.searches(),
        vec![
            "in:sent to:a@x.com subject:\"Invoice\"".to_string(),
            "in:sent to:b@x.com subject:\"Quote\"".to_string(),
        ]
    );
}

#[test]
fn test_thread_mode_without_match_is_pending() {
    let harness = Harness::new(vec![draft("d1", "Follow up", "Any news?", "<p>Any news?</p>")]);
    let store = InMemoryRowStore::from_rows(
        &["First name", "Recipient", "Topic", "Email Sent", "Original Email Subject For Filtering"],
        &[&["Ana", "a@x.com", "Invoice", "", "Re: {{Topic}}"]],
    );

    let report = harness.driver.run_thread(Some("Follow up"), &store).unwrap();

    assert_eq!(report.statuses, vec![StatusCell::Empty]);
    assert_eq!(store.column("Email Sent").unwrap(), vec![""]);
    assert_eq!(report.pending.len(), 1);
    assert_eq!(report.pending[0].row_number, 2);

    let notices = harness.prompter.notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].title.contains("special characters"));
    assert!(notices[0].message.contains("First name: Ana"));
    assert!(notices[0].message.contains("rows: 2"));
}

#[test]
fn test_thread_mode_forwards_self_authored_message() {
    let harness = Harness::new(vec![draft("d1", "Nudge", "Just checking in", "<p>Checking in, {{Name}}</p>")]);
    let thread_id = ThreadId::new("t1");
    let original = ThreadMessage::builder(MessageId::new("m1"), thread_id.clone())
        .from(EmailAddress::with_name("Me", ME))
        .to(vec![EmailAddress::new("a@x.com")])
        .subject("Re: Invoice")
        .plain_body("Please find the invoice attached")
        .html_body("<p>Please find the invoice attached</p>")
        .label_ids(vec!["SENT".to_string()])
        .build();
    harness.mailbox.add_thread(MailThread::new(thread_id.clone(), vec![original]));

    let store = InMemoryRowStore::from_rows(
        &["Name", "Recipient", "Topic", "Email Sent", "Original Email Subject For Filtering"],
        &[&["Ana", "a@x.com", "Invoice", "", "Re: {{Topic}}"]],
    );

    let report = harness.driver.run_thread(Some("Nudge"), &store).unwrap();

    assert_eq!(report.sent, 1);
    match &harness.mailbox.deliveries()[0] {
        Delivery::Forward {
            message_id,
            to,
            subject,
            html,
        } => {
            assert_eq!(message_id.as_str(), "m1");
            assert_eq!(to, &vec![EmailAddress::new("a@x.com")]);
            assert_eq!(subject, "Re: Invoice");
            assert_eq!(
                html,
                "<div class=\"gmail_quote\"> <p>Checking in, Ana</p><p>Please find the invoice attached</p></div>"
            );
        }
        other => panic!("expected a forward, got {:?}", other),
    }
    assert_eq!(harness.mailbox.thread(&thread_id).unwrap().messages.len(), 2);
}

#[test]
fn test_direct_then_thread_continues_sent_conversation() {
    let harness = Harness::new(vec![
        draft("d1", "Offer for {{Name}}", "Dear {{Name}}", "<p>Dear {{Name}}</p>"),
        draft("d2", "Reminder", "Reminder", "<p>Reminder for {{Name}}</p>"),
    ]);
    let first = InMemoryRowStore::from_rows(
        &["Name", "Recipient", "Email Sent"],
        &[&["Ana", "a@x.com", ""], &["Bo", "b@x.com", ""]],
    );
    harness.driver.run_direct(Some("Offer for {{Name}}"), &first).unwrap();

    let second = InMemoryRowStore::from_rows(
        &["Name", "Recipient", "Email Sent", "Original Email Subject For Filtering"],
        &[
            &["Ana", "a@x.com", "", "Offer for {{Name}}"],
            &["Bo", "b@x.com", "", "Offer for {{Name}}"],
        ],
    );
    let report = harness.driver.run_thread(Some("Reminder"), &second).unwrap();

    assert_eq!(report.sent, 2);
    assert!(report.pending.is_empty());
    let forwards: Vec<_> = harness
        .mailbox
        .deliveries()
        .into_iter()
        .filter_map(|d| match d {
            Delivery::Forward { to, subject, .. } => Some((to[0].email.clone(), subject)),
            _ => None,
        })
        .collect();
    assert_eq!(
        forwards,
        vec![
            ("a@x.com".to_string(), "Offer for Ana".to_string()),
            ("b@x.com".to_string(), "Offer for Bo".to_string()),
        ]
    );
}

#[test]
fn test_failed_send_is_recorded_and_batch_continues() {
    let harness = Harness::new(vec![draft("d1", "Hi {{Name}}", "Hello", "")]);
    harness.mailbox.fail_deliveries_to("b@x.com", "Service invoked too many times for one day: email.");
    let store = InMemoryRowStore::from_rows(
        &["Recipient", "Name", "Email Sent"],
        &[&["a@x.com", "Ana", ""], &["b@x.com", "Bo", ""], &["c@x.com", "Cy", ""]],
    );

    let report = harness.driver.run_direct(Some("Hi {{Name}}"), &store).unwrap();

    assert_eq!((report.sent, report.failed), (2, 1));
    assert!(report.statuses[0].is_sent());
    assert_eq!(
        report.statuses[1],
        StatusCell::Error("Service invoked too many times for one day: email.".to_string())
    );
    assert!(report.statuses[2].is_sent());
    assert_eq!(sent_subjects(&harness.mailbox), vec!["Hi Ana", "Hi Cy"]);
}

#[test]
fn test_statuses_align_with_rows() {
    let harness = Harness::new(vec![draft("d1", "Hi", "Hello {{Name}}", "")]);
    let rows: Vec<Vec<String>> = (0..7)
        .map(|i| {
            let recipient = if i % 3 == 0 { String::new() } else { format!("r{}@x.com", i) };
            vec![recipient, format!("N{}", i), String::new()]
        })
        .collect();
    let row_refs: Vec<Vec<&str>> = rows.iter().map(|r| r.iter().map(String::as_str).collect()).collect();
    let row_slices: Vec<&[&str]> = row_refs.iter().map(Vec::as_slice).collect();
    let store = InMemoryRowStore::from_rows(&["Recipient", "Name", "Email Sent"], &row_slices);

    let report = harness.driver.run_direct(Some("Hi"), &store).unwrap();

    assert_eq!(report.statuses.len(), 7);
    for (i, status) in report.statuses.iter().enumerate() {
        assert_eq!(status.is_sent(), i % 3 != 0, "row {}", i);
    }
    let sent: Vec<String> = harness
        .mailbox
        .deliveries()
        .into_iter()
        .filter_map(|d| match d {
            Delivery::Sent(message) => Some(message.text),
            _ => None,
        })
        .collect();
    assert_eq!(sent, vec!["Hello N1", "Hello N2", "Hello N4", "Hello N5"]);
}

#[test]
fn test_values_with_json_specials_survive_fill() {
    let harness = Harness::new(vec![draft("d1", "Note", "Dear {{Name}},\n{{Body}}", "")]);
    let store = InMemoryRowStore::from_rows(
        &["Recipient", "Name", "Body", "Email Sent"],
        &[&["a@x.com", "\"Al\" \\ O'Neil", "line\none\ttab / slash {{Name}}", ""]],
    );

    harness.driver.run_direct(Some("Note"), &store).unwrap();

    match &harness.mailbox.deliveries()[0] {
        Delivery::Sent(message) => assert_eq!(
            message.text,
            "Dear \"Al\" \\ O'Neil,\nline\none\ttab / slash {{Name}}"
        ),
        other => panic!("unexpected delivery {:?}", other),
    }
}

#[test]
fn test_inline_images_and_attachments_are_carried() {
    let mut template = draft(
        "d1",
        "Logo",
        "Hi",
        "<p>Hi</p><img alt=\"logo.png\" src=\"cid:ii_abc\"><img src=\"cid:ii_missing\" alt=\"gone.png\">",
    );
    template.inline_images = vec![Attachment::new("logo.png", "image/png", vec![7, 7, 7])];
    template.attachments = vec![Attachment::new("terms.pdf", "application/pdf", b"%PDF".to_vec())];
    let harness = Harness::new(vec![template]);
    let store = InMemoryRowStore::from_rows(&["Recipient", "Email Sent"], &[&["a@x.com", ""]]);

    harness.driver.run_direct(Some("Logo"), &store).unwrap();

    match &harness.mailbox.deliveries()[0] {
        Delivery::Sent(message) => {
            assert_eq!(message.inline_images.len(), 1);
            assert_eq!(message.inline_images["ii_abc"].name, "logo.png");
            assert_eq!(message.attachments[0].name, "terms.pdf");
        }
        other => panic!("unexpected delivery {:?}", other),
    }
}

#[test]
fn test_sqlite_row_store_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contacts.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE contacts (\"Recipient\" TEXT, \"Name\" TEXT, \"Email Sent\" TEXT);
             INSERT INTO contacts VALUES ('a@x.com', 'Ana', NULL);
             INSERT INTO contacts VALUES ('', 'Bo', NULL);",
        )
        .unwrap();
    }

    let harness = Harness::new(vec![draft("d1", "Hi {{Name}}", "Hello", "")]);
    let store = SqliteRowStore::open(&path, "contacts").unwrap();
    let report = harness.driver.run_direct(Some("Hi {{Name}}"), &store).unwrap();

    assert_eq!((report.sent, report.failed), (1, 1));

    let conn = rusqlite::Connection::open(&path).unwrap();
    let statuses: Vec<String> = conn
        .prepare("SELECT \"Email Sent\" FROM contacts ORDER BY rowid")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(statuses[0].len(), "2024-01-01 00:00:00".len());
    assert_eq!(statuses[1], "Invalid argument: recipient");
}
