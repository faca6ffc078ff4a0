//! Command-line adapter over the MemoSphere entry service.
//!
//! # Responsibility
//! - Map subcommands onto entry service operations.
//! - Print results as pretty JSON; report failures on stderr with a
//!   non-zero exit code.

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use memosphere_core::db::open_db;
use memosphere_core::{
    core_version, init_logging, CoreConfig, EntryDraft, EntryService, EntryType,
    SqliteEntryRepository,
};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "memosphere", version, about = "Journal entry store")]
struct Cli {
    /// SQLite database path. Overrides `MEMOSPHERE_DB_PATH`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an entry.
    Create {
        /// Caller-chosen id; a UUID is generated when omitted.
        #[arg(long)]
        id: Option<String>,
        #[command(flatten)]
        fields: EntryFields,
    },
    /// Print one entry.
    Get { id: String },
    /// List entries, most recent first.
    List {
        /// 1-indexed page; lists everything when omitted.
        #[arg(long)]
        page: Option<u32>,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Case-insensitive substring search; an empty query lists everything.
    Search {
        #[arg(default_value = "")]
        query: String,
    },
    /// Replace every editable field of an entry.
    Update {
        id: String,
        #[command(flatten)]
        fields: EntryFields,
    },
    /// Delete an entry and its tags.
    Delete { id: String },
}

#[derive(Debug, Args)]
struct EntryFields {
    #[arg(long = "type", value_enum, default_value_t = KindArg::Text)]
    kind: KindArg,
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    content: String,
    /// Repeat for several feelings.
    #[arg(long = "feeling")]
    feelings: Vec<String>,
    /// Repeat for several activities.
    #[arg(long = "activity")]
    activities: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Text,
    Audio,
    Image,
}

impl From<KindArg> for EntryType {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Text => EntryType::Text,
            KindArg::Audio => EntryType::Audio,
            KindArg::Image => EntryType::Image,
        }
    }
}

impl EntryFields {
    fn into_draft(self, id: Option<String>) -> EntryDraft {
        EntryDraft {
            id,
            kind: self.kind.into(),
            content: self.content,
            title: self.title,
            feelings: self.feelings,
            activities: self.activities,
        }
    }
}

fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult {
    let mut config = CoreConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(log_dir) = config.log_dir.as_ref() {
        init_logging(config.log_level, log_dir)?;
    }
    info!(
        "event=cli_start module=cli status=ok version={} db_path={}",
        core_version(),
        config.db_path.display()
    );

    let mut conn = open_db(&config.db_path)
        .map_err(|err| format!("failed to open `{}`: {err}", config.db_path.display()))?;
    let repo = SqliteEntryRepository::try_new(&mut conn)?;
    let mut service = EntryService::new(repo);

    match cli.command {
        Command::Create { id, fields } => print_json(&service.create(fields.into_draft(id))?),
        Command::Get { id } => match service.get(&id)? {
            Some(entry) => print_json(&entry),
            None => Err(format!("entry not found: {id}").into()),
        },
        Command::List {
            page: Some(page),
            page_size,
        } => print_json(&service.list_page(page, page_size)?),
        Command::List { page: None, .. } => print_json(&service.list_all()?),
        Command::Search { query } => print_json(&service.search(&query)?),
        Command::Update { id, fields } => print_json(&service.update(&id, fields.into_draft(None))?),
        Command::Delete { id } => {
            service.delete(&id)?;
            println!("deleted {id}");
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
