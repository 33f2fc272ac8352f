//! `slotbook` CLI: list open meeting slots and book them from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Default event types and Monday-Friday 09:00-17:00 hours
//! slotbook seed
//!
//! # Open start times for a date (JSON array of "HH:mm")
//! slotbook slots --slug 30min-consultation --date 2099-03-16
//!
//! # Book one of them
//! slotbook book --slug 30min-consultation --date 2099-03-16 --time 10:00 \
//!     --name "Jane Smith" --email jane@example.com
//!
//! # Upcoming meetings with their event type; `--when past` or `--when all`
//! slotbook meetings
//!
//! # Manage event types and weekly hours
//! slotbook event-type create --name "Intro" --slug intro --duration 20 --buffer-after 10
//! slotbook availability set --day 6 --start 10:00 --end 14:00
//! ```
//!
//! Results are printed to stdout as JSON. Exit codes: 0 success, 1 internal
//! error, 2 invalid input, 3 not found, 4 conflict.
//!
//! "Now" is the local wall clock: start times before it are neither listed
//! nor bookable.

mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use slot_engine::time::parse_date;
use slot_engine::{
    AvailabilityPatch, BookingRequest, ClockTime, ErrorKind, EventTypeDraft, EventTypePatch,
    HostId, MeetingWindow, Scheduler, SlotError,
};
use slot_engine_sqlite::SqliteStore;
use tracing::debug;
use uuid::Uuid;

use config::Config;

#[derive(Parser)]
#[command(
    name = "slotbook",
    version,
    about = "List and book meeting slots with buffer-aware conflict checks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.config/slotbook/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, env = "SLOTBOOK_DB")]
    db: Option<PathBuf>,

    /// Host whose calendar to operate on
    #[arg(long, global = true, env = "SLOTBOOK_HOST")]
    host: Option<String>,

    /// Log at debug level to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List open start times for an event type on a date
    Slots {
        #[arg(long)]
        slug: String,
        /// Date as YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
    },
    /// Book a meeting
    Book(BookArgs),
    /// Cancel a meeting by id
    Cancel { id: Uuid },
    /// List the host's meetings with their event type, most recent first
    Meetings {
        /// Which meetings to show, relative to the current time
        #[arg(long, value_enum, default_value_t = When::Upcoming)]
        when: When,
    },
    /// Report stored meetings that overlap under the current buffers
    Audit {
        #[arg(long)]
        slug: String,
    },
    /// Manage event types
    #[command(subcommand)]
    EventType(EventTypeCommand),
    /// Manage weekly availability
    #[command(subcommand)]
    Availability(AvailabilityCommand),
    /// Insert default event types and Monday-Friday 09:00-17:00 hours
    Seed,
}

#[derive(Clone, Copy, ValueEnum)]
enum When {
    /// Starting now or later
    Upcoming,
    /// Already started
    Past,
    All,
}

impl From<When> for MeetingWindow {
    fn from(when: When) -> Self {
        match when {
            When::Upcoming => MeetingWindow::Upcoming,
            When::Past => MeetingWindow::Past,
            When::All => MeetingWindow::All,
        }
    }
}

#[derive(Args)]
struct BookArgs {
    #[arg(long)]
    slug: String,
    /// Invitee name
    #[arg(long)]
    name: String,
    /// Invitee email
    #[arg(long)]
    email: String,
    /// Date as YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    date: NaiveDate,
    /// Start time as HH:mm
    #[arg(long)]
    time: ClockTime,
}

#[derive(Subcommand)]
enum EventTypeCommand {
    /// Create an event type
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: String,
        /// Meeting length in minutes
        #[arg(long, allow_negative_numbers = true)]
        duration: i64,
        /// Minutes kept free before each meeting
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        buffer_before: i64,
        /// Minutes kept free after each meeting
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        buffer_after: i64,
    },
    /// List event types
    List,
    /// Change fields of an event type
    Update {
        slug: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        duration: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        buffer_before: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        buffer_after: Option<i64>,
    },
    /// Delete an event type and its meetings
    Delete { slug: String },
}

#[derive(Subcommand)]
enum AvailabilityCommand {
    /// Add hours for a day of the week (0 = Sunday .. 6 = Saturday)
    Set {
        #[arg(long)]
        day: u8,
        #[arg(long)]
        start: ClockTime,
        #[arg(long)]
        end: ClockTime,
    },
    /// List weekly hours
    List,
    /// Change the hours of a day
    Update {
        #[arg(long)]
        day: u8,
        #[arg(long)]
        start: Option<ClockTime>,
        #[arg(long)]
        end: Option<ClockTime>,
    },
    /// Remove the hours of a day
    Delete {
        #[arg(long)]
        day: u8,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit_code(&err)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<SlotError>())
        .map(SlotError::kind);
    match kind {
        Some(ErrorKind::Validation) => ExitCode::from(2),
        Some(ErrorKind::NotFound) => ExitCode::from(3),
        Some(ErrorKind::Conflict) => ExitCode::from(4),
        Some(ErrorKind::Internal) | None => ExitCode::FAILURE,
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    logging::init(&config.log, cli.verbose)?;

    let host = HostId::new(config.host_id(cli.host));
    let db = config.database_path(cli.db);
    if let Some(parent) = db.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    debug!(db = %db.display(), %host, "opening store");
    let store = SqliteStore::open(&db)
        .with_context(|| format!("Failed to open database: {}", db.display()))?;
    let scheduler = Scheduler::new(store);
    let now = Local::now().naive_local();

    match cli.command {
        Commands::Slots { slug, date } => {
            let slots = scheduler
                .slots(&host, &slug, date, now)
                .with_context(|| format!("Failed to list slots for '{slug}' on {date}"))?;
            print_json(&slots)
        }
        Commands::Book(args) => {
            let request = BookingRequest {
                slug: args.slug,
                invitee_name: args.name,
                invitee_email: args.email,
                date: args.date,
                time: args.time,
            };
            let meeting = scheduler
                .book(&host, &request, now)
                .with_context(|| format!("Failed to book {} {}", request.date, request.time))?;
            print_json(&meeting)
        }
        Commands::Cancel { id } => {
            let meeting = scheduler
                .cancel(&host, id)
                .with_context(|| format!("Failed to cancel meeting {id}"))?;
            print_json(&meeting)
        }
        Commands::Meetings { when } => {
            let meetings = scheduler
                .meeting_details(&host, when.into(), now)
                .context("Failed to list meetings")?;
            print_json(&meetings)
        }
        Commands::Audit { slug } => print_json(&scheduler.audit(&host, &slug)?),
        Commands::EventType(cmd) => event_type(&scheduler, &host, cmd),
        Commands::Availability(cmd) => availability(&scheduler, &host, cmd),
        Commands::Seed => seed(&scheduler, &host),
    }
}

fn event_type(
    scheduler: &Scheduler<SqliteStore>,
    host: &HostId,
    cmd: EventTypeCommand,
) -> Result<()> {
    match cmd {
        EventTypeCommand::Create {
            name,
            slug,
            duration,
            buffer_before,
            buffer_after,
        } => {
            let created = scheduler
                .create_event_type(
                    host,
                    EventTypeDraft {
                        name,
                        slug,
                        duration_minutes: duration,
                        buffer_before,
                        buffer_after,
                    },
                )
                .context("Failed to create event type")?;
            print_json(&created)
        }
        EventTypeCommand::List => print_json(&scheduler.event_types(host)?),
        EventTypeCommand::Update {
            slug,
            name,
            duration,
            buffer_before,
            buffer_after,
        } => {
            let patch = EventTypePatch {
                name,
                duration_minutes: duration,
                buffer_before,
                buffer_after,
            };
            if patch.is_empty() {
                return Err(SlotError::invalid("update", "no fields to change")).context(
                    "Pass at least one of --name, --duration, --buffer-before, --buffer-after",
                );
            }
            let updated = scheduler
                .update_event_type(host, &slug, &patch)
                .with_context(|| format!("Failed to update event type '{slug}'"))?;
            print_json(&updated)
        }
        EventTypeCommand::Delete { slug } => {
            scheduler
                .delete_event_type(host, &slug)
                .with_context(|| format!("Failed to delete event type '{slug}'"))?;
            print_json(&json!({ "deleted": slug }))
        }
    }
}

fn availability(
    scheduler: &Scheduler<SqliteStore>,
    host: &HostId,
    cmd: AvailabilityCommand,
) -> Result<()> {
    match cmd {
        AvailabilityCommand::Set { day, start, end } => {
            let row = scheduler
                .set_availability(host, day, start, end)
                .with_context(|| format!("Failed to set availability for day {day}"))?;
            print_json(&row)
        }
        AvailabilityCommand::List => print_json(&scheduler.availability(host)?),
        AvailabilityCommand::Update { day, start, end } => {
            let patch = AvailabilityPatch { start, end };
            if patch.is_empty() {
                return Err(SlotError::invalid("update", "no fields to change"))
                    .context("Pass at least one of --start, --end");
            }
            let row = scheduler
                .update_availability(host, day, &patch)
                .with_context(|| format!("Failed to update availability for day {day}"))?;
            print_json(&row)
        }
        AvailabilityCommand::Delete { day } => {
            scheduler
                .remove_availability(host, day)
                .with_context(|| format!("Failed to remove availability for day {day}"))?;
            print_json(&json!({ "deleted": day }))
        }
    }
}

fn seed(scheduler: &Scheduler<SqliteStore>, host: &HostId) -> Result<()> {
    let drafts = [
        EventTypeDraft {
            name: "30 Minute Consultation".to_string(),
            slug: "30min-consultation".to_string(),
            duration_minutes: 30,
            buffer_before: 0,
            buffer_after: 15,
        },
        EventTypeDraft {
            name: "1 Hour Meeting".to_string(),
            slug: "1hour-meeting".to_string(),
            duration_minutes: 60,
            buffer_before: 10,
            buffer_after: 10,
        },
    ];

    let mut event_types = 0;
    for draft in drafts {
        match scheduler.create_event_type(host, draft) {
            Ok(_) => event_types += 1,
            Err(SlotError::DuplicateSlug(slug)) => debug!(%slug, "seed: event type exists"),
            Err(e) => return Err(e).context("Failed to seed event types"),
        }
    }

    let (open, close) = (ClockTime::from_hm(9, 0), ClockTime::from_hm(17, 0));
    let (Some(open), Some(close)) = (open, close) else {
        anyhow::bail!("seed hours are not valid clock times");
    };
    let mut days = 0;
    for day in 1..=5 {
        match scheduler.set_availability(host, day, open, close) {
            Ok(_) => days += 1,
            Err(SlotError::DuplicateAvailability { .. }) => {
                debug!(day, "seed: availability exists")
            }
            Err(e) => return Err(e).context("Failed to seed availability"),
        }
    }

    print_json(&json!({
        "event_types_created": event_types,
        "availability_created": days,
    }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}
