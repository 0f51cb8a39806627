//! Command-line arguments and command handlers.

use std::future::Future;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use notedesk_core::api::ApiError;
use notedesk_core::models::{
    page_count, BulkReport, DateFilter, NewNote, NoteChanges, NoteId, NoteQuery,
};
use notedesk_core::utils::{describe_filters, format_timestamp, truncate_string};
use notedesk_core::{Config, NotesClient};

/// Width of the title column in the notes table
const TITLE_WIDTH: usize = 40;

#[derive(Debug, Parser)]
#[command(name = "notedesk", version, about = "Browse and edit notes from the terminal")]
pub struct Cli {
    /// Server base URL (the API lives under <base-url>/api).
    /// NOTEDESK_BASE_URL is read by the configuration layer.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[arg(short, long, env = "NOTEDESK_USERNAME", global = true)]
    pub username: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List notes, one page at a time
    List(ListArgs),
    /// Show a single note
    Show { id: NoteId },
    /// Create a note
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long, value_parser = parse_date)]
        deadline: Option<NaiveDate>,
    },
    /// Edit a note
    Edit {
        id: NoteId,
        #[command(flatten)]
        changes: ChangeArgs,
    },
    /// Delete a note
    Delete { id: NoteId },
    /// Apply the same edit to several notes
    BulkEdit {
        #[arg(required = true)]
        ids: Vec<NoteId>,
        #[command(flatten)]
        changes: ChangeArgs,
    },
    /// Delete several notes
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<NoteId>,
    },
    /// Show the signed-in user
    Whoami,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Defaults to the configured page size
    #[arg(long)]
    pub per_page: Option<u32>,
    #[arg(short, long)]
    pub search: Option<String>,
    /// Only notes created on or after this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,
    /// Only notes created on or before this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct ChangeArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub content: Option<String>,
    #[arg(long, value_parser = parse_date)]
    pub deadline: Option<NaiveDate>,
}

impl From<&ChangeArgs> for NoteChanges {
    fn from(args: &ChangeArgs) -> Self {
        NoteChanges {
            title: args.title.clone(),
            content: args.content.clone(),
            deadline: args.deadline,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

/// Whether a command failed because the refresh credential expired
pub fn is_session_expired(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ApiError>()
        .map(ApiError::is_session_expired)
        .unwrap_or(false)
}

impl Command {
    /// Bulk commands may have been partly applied, so they are never rerun
    fn is_rerunnable(&self) -> bool {
        !matches!(self, Command::BulkEdit { .. } | Command::BulkDelete { .. })
    }
}

/// Run a command. If the login expired while it ran, sign in again with
/// `sign_in` and rerun it once.
pub async fn run_with_relogin<F, Fut>(
    client: &NotesClient,
    command: &Command,
    config: &Config,
    mut sign_in: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    match run(client, command, config).await {
        Err(e) if command.is_rerunnable() && is_session_expired(&e) => {
            eprintln!("{}", e);
            eprintln!("Please log in again.");
            sign_in().await?;
            run(client, command, config).await
        }
        other => other,
    }
}

pub async fn run(client: &NotesClient, command: &Command, config: &Config) -> Result<()> {
    match command {
        Command::List(args) => list(client, args, config).await,
        Command::Show { id } => {
            let note = client.get_note(*id).await?;
            println!("#{} {}", note.note_id, note.title);
            println!("Created:  {}", format_timestamp(&note.created_at));
            println!("Deadline: {}", note.deadline_display());
            if !note.content.is_empty() {
                println!();
                println!("{}", note.content);
            }
            Ok(())
        }
        Command::Add { title, content, deadline } => {
            let new_note = NewNote {
                title: title.clone(),
                content: content.clone(),
                deadline: *deadline,
            };
            let note = client.create_note(&new_note).await?;
            println!("Created note #{}", note.note_id);
            Ok(())
        }
        Command::Edit { id, changes } => {
            let note = client.update_note(*id, &changes.into()).await?;
            println!("Updated note #{}", note.note_id);
            Ok(())
        }
        Command::Delete { id } => {
            client.delete_note(*id).await?;
            println!("Deleted note #{}", id);
            Ok(())
        }
        Command::BulkEdit { ids, changes } => {
            let report = client.bulk_update(ids, &changes.into()).await;
            print_report("Updated", &report)
        }
        Command::BulkDelete { ids } => {
            let report = client.bulk_delete(ids).await;
            print_report("Deleted", &report)
        }
        Command::Whoami => {
            match client.session().user() {
                Some(user) if user.roles.is_empty() => println!("{}", user.username),
                Some(user) => println!("{} ({})", user.username, user.roles.join(", ")),
                None => println!("Signed in (no identity in token)"),
            }
            Ok(())
        }
    }
}

async fn list(client: &NotesClient, args: &ListArgs, config: &Config) -> Result<()> {
    let per_page = args.per_page.unwrap_or(config.items_per_page);
    let mut query = NoteQuery::new().page(args.page).per_page(per_page);
    if let Some(ref term) = args.search {
        query = query.search(term);
    }
    if args.from.is_some() || args.to.is_some() {
        let dates = DateFilter::new(args.from, args.to).context("Invalid date filter")?;
        query = query.dates(dates);
    }

    let page = client.list_notes(&query).await?;

    println!(
        "{:>6}  {:<width$}  {:<10}  {:<10}",
        "Id",
        "Title",
        "Created",
        "Deadline",
        width = TITLE_WIDTH
    );
    for note in &page.notes {
        println!(
            "{:>6}  {:<width$}  {:<10}  {:<10}",
            note.note_id,
            truncate_string(&note.title, TITLE_WIDTH),
            format_timestamp(&note.created_at),
            note.deadline_display(),
            width = TITLE_WIDTH
        );
    }

    let pages = if page.pages > 0 {
        page.pages as u64
    } else {
        page_count(page.total, per_page)
    };
    let mut footer = format!(
        "{} records, page {} of {}",
        page.total,
        query.current_page(),
        pages.max(1)
    );
    if let Some(filters) = describe_filters(&query) {
        footer.push_str(", ");
        footer.push_str(&filters);
    }
    println!("{}", footer);
    Ok(())
}

/// Print a bulk report. Bulk commands are not retried after re-login, since
/// part of the batch may already have been applied.
fn print_report(verb: &str, report: &BulkReport) -> Result<()> {
    if !report.succeeded.is_empty() {
        let ids: Vec<String> = report.succeeded.iter().map(|id| format!("#{}", id)).collect();
        println!("{} {}", verb, ids.join(", "));
    }
    for (id, error) in &report.failed {
        eprintln!("#{}: {}", id, error.message());
    }
    println!("{}", report.summary());

    if report.session_expired() {
        anyhow::bail!("Your login has expired. Log in again and rerun for the failed notes.");
    }
    if !report.is_complete_success() {
        anyhow::bail!("Some notes could not be processed");
    }
    Ok(())
}
