//! mailmerge - batch personalized email from Gmail drafts and sheet rows
//!
//! Runs the merge driver against Gmail with rows from Google Sheets or a
//! SQLite table.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use mailmerge::{
    GmailClient, GoogleAuth, GoogleCredentials, MergeConfig, MergeDriver, MergeReport,
    MergeSettings, RowStore, SheetsRowStore, SqliteRowStore, TerminalPrompter,
};

/// Sheet read when neither flags nor settings name one
const DEFAULT_RANGE: &str = "Sheet1";

#[derive(Parser, Debug)]
#[command(name = "mailmerge")]
#[command(version)]
#[command(about = "Send personalized email from a Gmail draft and spreadsheet rows", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one new message per row
    Send(MergeArgs),

    /// Reply to or forward the sent conversation found for each row
    Thread(ThreadArgs),

    /// Remove the stored Google token
    Logout,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Subject line of the draft to use as template (prompted when absent)
    #[arg(short, long)]
    subject: Option<String>,

    #[command(flatten)]
    source: SourceArgs,

    /// Column holding recipient addresses
    #[arg(long)]
    recipient_column: Option<String>,

    /// Column the send status is written to
    #[arg(long)]
    status_column: Option<String>,
}

#[derive(Args, Debug)]
struct ThreadArgs {
    #[command(flatten)]
    merge: MergeArgs,

    /// Column with the subject of the conversation to continue
    #[arg(long)]
    filter_column: Option<String>,

    /// Column naming a row when reporting rows without a conversation
    #[arg(long)]
    identity_column: Option<String>,
}

/// Where rows come from; Google Sheets unless `--sqlite` is given
#[derive(Args, Debug)]
struct SourceArgs {
    /// Spreadsheet id
    #[arg(long, conflicts_with = "sqlite")]
    sheet: Option<String>,

    /// Sheet name or A1 range, e.g. `Contacts!A1:F`
    #[arg(long, conflicts_with = "sqlite")]
    range: Option<String>,

    /// SQLite database file
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// Table within the SQLite database
    #[arg(long, default_value = "contacts")]
    table: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Send(args) => {
            let settings = MergeSettings::load()?;
            let columns = merge_columns(&settings, &args);
            let session = Session::connect(columns, &settings, &args.source)?;
            let report = session
                .driver
                .run_direct(args.subject.as_deref(), session.rows.as_ref())?;
            print_report(&report);
        }
        Command::Thread(args) => {
            let settings = MergeSettings::load()?;
            let mut columns = merge_columns(&settings, &args.merge);
            if let Some(filter) = args.filter_column {
                columns.filter_field = filter;
            }
            if let Some(identity) = args.identity_column {
                columns.identity_field = identity;
            }
            let session = Session::connect(columns, &settings, &args.merge.source)?;
            let report = session
                .driver
                .run_thread(args.merge.subject.as_deref(), session.rows.as_ref())?;
            print_report(&report);
        }
        Command::Logout => {
            if GoogleAuth::clear_cached_token()? {
                info!("Removed stored Google token");
            } else {
                info!("No stored Google token");
            }
        }
    }
    Ok(())
}

/// Column names from settings, overridden by flags
fn merge_columns(settings: &MergeSettings, args: &MergeArgs) -> MergeConfig {
    let mut columns = settings.columns.clone();
    if let Some(recipient) = &args.recipient_column {
        columns.recipient_field = recipient.clone();
    }
    if let Some(status) = &args.status_column {
        columns.status_field = status.clone();
    }
    columns
}

/// A driver wired to Gmail plus the row store it runs against
struct Session {
    driver: MergeDriver,
    rows: Box<dyn RowStore>,
}

impl Session {
    fn connect(columns: MergeConfig, settings: &MergeSettings, source: &SourceArgs) -> Result<Self> {
        let credentials = match GoogleCredentials::load() {
            Ok(credentials) => credentials,
            Err(e) => {
                if let Some(path) = GoogleCredentials::default_credentials_path() {
                    warn!(
                        "To configure Google access, either:\n\
                         1. Place your Google OAuth credentials at: {}\n\
                         2. Or set environment variables: GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET",
                        path.display()
                    );
                }
                return Err(e.context("Google credentials not found"));
            }
        };

        let auth = Arc::new(GoogleAuth::new(&credentials)?);
        let gmail = Arc::new(GmailClient::new(Arc::clone(&auth)));

        let rows: Box<dyn RowStore> = match &source.sqlite {
            Some(path) => Box::new(
                SqliteRowStore::open(path, source.table.as_str())
                    .with_context(|| format!("Failed to open {}", path.display()))?,
            ),
            None => {
                let Some(spreadsheet_id) = source.sheet.clone().or_else(|| settings.spreadsheet_id.clone())
                else {
                    bail!("No row source: pass --sheet <id> or --sqlite <path>, or set spreadsheet_id in settings.json");
                };
                let range = source
                    .range
                    .clone()
                    .or_else(|| settings.range.clone())
                    .unwrap_or_else(|| DEFAULT_RANGE.to_string());
                info!("Reading rows from spreadsheet {} ({})", spreadsheet_id, range);
                Box::new(SheetsRowStore::new(auth, spreadsheet_id, &range))
            }
        };

        let driver = MergeDriver::new(
            columns,
            gmail.clone(),
            gmail,
            Arc::new(TerminalPrompter::new()),
        );
        Ok(Self { driver, rows })
    }
}

fn print_report(report: &MergeReport) {
    println!("{}", report.summary());
    for pending in &report.pending {
        println!("  row {}: no sent conversation found", pending.row_number);
    }
}
