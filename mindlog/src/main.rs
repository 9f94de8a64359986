//! mindlog - meditation practice tracker
//!
//! Command-line front end over the mindlog-core store and statistics engine:
//! - Manage users and the meditation catalog
//! - Log, edit and delete sessions (preferences follow every change)
//! - Show summaries, rollups, analytics, progress and chart data
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/mindlog/data.db (~/.local/share/mindlog/data.db)
//! - Config: $XDG_CONFIG_HOME/mindlog/config.toml (~/.config/mindlog/config.toml)
//! - Logs: $XDG_STATE_HOME/mindlog/ (~/.local/state/mindlog/)

mod output;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use mindlog_core::analytics::{StatsService, SummaryOutcome};
use mindlog_core::{
    CatalogService, Config, Database, DateRange, Difficulty, MeditationPatch, MeditationTypePatch,
    NewSession, Role, User,
};

use crate::output::Printer;

#[derive(Parser)]
#[command(name = "mindlog")]
#[command(about = "Track meditation sessions and practice statistics")]
#[command(version)]
struct Args {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Acting user ID
    #[arg(short, long, global = true)]
    user: Option<i64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Manage meditation types
    #[command(subcommand)]
    Type(TypeCommand),

    /// Manage catalog meditations
    #[command(subcommand)]
    Meditation(MeditationCommand),

    /// Log and manage sessions of the acting user
    #[command(subcommand)]
    Session(SessionCommand),

    /// Stored stats summaries
    #[command(subcommand)]
    Stats(StatsCommand),

    /// Behavioral analysis of the full session history
    Analysis,

    /// Minutes per week
    Weekly {
        /// Number of weeks to cover (default: from config)
        #[arg(short, long)]
        weeks: Option<i64>,
    },

    /// Minutes per month
    Monthly {
        /// Number of 30-day months to cover (default: from config)
        #[arg(short, long)]
        months: Option<i64>,
    },

    /// Progress over a trailing window of days
    Progress {
        /// Window length in days (default: from config)
        #[arg(short, long)]
        days: Option<i64>,
    },

    /// Chart data: progress, types, weekly or monthly
    Chart {
        /// Chart kind
        kind: String,
    },

    /// Inferred preferences
    #[command(subcommand)]
    Preferences(PreferencesCommand),
}

#[derive(Subcommand)]
enum UserCommand {
    /// Register a user
    Add {
        email: String,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },
    /// List users
    List,
}

#[derive(Subcommand)]
enum TypeCommand {
    /// Add a meditation type
    Add {
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// Free-form range, e.g. "5-30 mins"
        #[arg(long)]
        duration_range: Option<String>,

        /// Goal tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Change fields of a meditation type
    Edit {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        duration_range: Option<String>,

        /// Replace the goal tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Delete an unused meditation type
    Delete { id: i64 },
    /// List meditation types
    List,
}

#[derive(Subcommand)]
enum MeditationCommand {
    /// Add a catalog meditation
    Add {
        title: String,

        /// Nominal length in minutes
        #[arg(long)]
        duration: i64,

        /// beginner, intermediate or advanced
        #[arg(long, default_value = "beginner")]
        difficulty: Difficulty,

        /// Meditation type ID
        #[arg(long = "type")]
        type_id: Option<i64>,
    },
    /// Change fields of a catalog meditation
    Edit {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        duration: Option<i64>,

        #[arg(long)]
        difficulty: Option<Difficulty>,

        #[arg(long = "type")]
        type_id: Option<i64>,
    },
    /// Delete a catalog meditation without logged sessions
    Delete { id: i64 },
    /// List catalog meditations
    List,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Log a completed session
    Log {
        /// Meditation ID
        #[arg(short, long)]
        meditation: i64,

        /// Minutes completed
        #[arg(long)]
        minutes: i64,

        /// When it happened, "YYYY-MM-DD HH:MM[:SS]" (default: now)
        #[arg(long, value_parser = parse_when)]
        at: Option<NaiveDateTime>,
    },
    /// Overwrite a logged session
    Edit {
        id: i64,

        #[arg(short, long)]
        meditation: i64,

        #[arg(long)]
        minutes: i64,

        #[arg(long, value_parser = parse_when)]
        at: NaiveDateTime,
    },
    /// Delete a logged session
    Delete { id: i64 },
    /// Show one logged session
    Show { id: i64 },
    /// List logged sessions
    List {
        /// First day to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        from: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        to: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum StatsCommand {
    /// Show the stored summary, computing it on first request
    Show,
    /// Discard and recompute the summary
    Refresh,
    /// Recompute every user's summary (admin)
    RefreshAll,
    /// List every stored summary (admin)
    All,
}

#[derive(Subcommand)]
enum PreferencesCommand {
    /// Show stored preferences
    Show,
    /// Infer preferences from the session history
    Generate,
}

fn parse_when(s: &str) -> std::result::Result<NaiveDateTime, String> {
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts);
        }
    }
    Err(format!(
        "invalid timestamp '{}', expected YYYY-MM-DD HH:MM[:SS]",
        s
    ))
}

fn parse_day(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging (to file, stdout carries command output)
    let _log_guard =
        mindlog_core::logging::init(&config.logging).context("failed to initialize logging")?;

    // Open database
    let db_path = Config::database_path();
    tracing::info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let printer = Printer::new(args.format);
    let service = StatsService::new(&db);
    let catalog = CatalogService::new(&db);
    let actor = || acting_user(&db, args.user);

    match args.command {
        Command::User(cmd) => cmd_user(&db, &printer, cmd),
        Command::Type(TypeCommand::List) => printer.meditation_types(&catalog.types()?),
        Command::Type(cmd) => cmd_type(&catalog, &printer, &actor()?, cmd),
        Command::Meditation(MeditationCommand::List) => {
            printer.meditations(&catalog.meditations()?)
        }
        Command::Meditation(cmd) => cmd_meditation(&catalog, &printer, &actor()?, cmd),
        Command::Session(cmd) => cmd_session(&service, &printer, &actor()?, cmd),
        Command::Stats(cmd) => cmd_stats(&service, &printer, &actor()?, cmd),
        Command::Analysis => printer.analysis(&service.analyze(actor()?.id)?),
        Command::Weekly { weeks } => {
            let weeks = weeks.unwrap_or(i64::from(config.stats.default_weeks));
            printer.weekly(&service.weekly(actor()?.id, weeks)?)
        }
        Command::Monthly { months } => {
            let months = months.unwrap_or(i64::from(config.stats.default_months));
            printer.monthly(&service.monthly(actor()?.id, months)?)
        }
        Command::Progress { days } => {
            let days = days.unwrap_or(i64::from(config.stats.default_progress_days));
            printer.progress(&service.progress(actor()?.id, days)?)
        }
        Command::Chart { kind } => printer.chart(&service.chart(actor()?.id, &kind)?),
        Command::Preferences(PreferencesCommand::Show) => {
            printer.preferences(service.preferences(actor()?.id)?.as_ref())
        }
        Command::Preferences(PreferencesCommand::Generate) => {
            printer.preferences(service.refresh_preferences(actor()?.id)?.as_ref())
        }
    }
}

/// Resolve the `--user` flag to a registered user.
fn acting_user(db: &Database, user: Option<i64>) -> Result<User> {
    let Some(id) = user else {
        bail!("this command needs an acting user, pass --user <id>");
    };
    db.require_user(id)
        .with_context(|| format!("cannot act as user {}", id))
}

fn cmd_user(db: &Database, printer: &Printer, cmd: UserCommand) -> Result<()> {
    match cmd {
        UserCommand::Add { email, admin } => {
            let role = if admin { Role::Admin } else { Role::User };
            let user = db
                .create_user(&email, role)
                .with_context(|| format!("failed to add user {}", email))?;
            printer.created("user", user.id, &user)
        }
        UserCommand::List => printer.users(&db.list_users()?),
    }
}

fn cmd_type(
    catalog: &CatalogService<'_>,
    printer: &Printer,
    actor: &User,
    cmd: TypeCommand,
) -> Result<()> {
    match cmd {
        TypeCommand::Add {
            name,
            description,
            duration_range,
            tags,
        } => {
            let kind = catalog.add_type(
                actor,
                &name,
                description.as_deref(),
                duration_range.as_deref(),
                &tags,
            )?;
            printer.created("meditation type", kind.id, &kind)
        }
        TypeCommand::Edit {
            id,
            name,
            description,
            duration_range,
            tags,
        } => {
            let patch = MeditationTypePatch {
                name,
                description,
                duration_range,
                tags: (!tags.is_empty()).then_some(tags),
            };
            let kind = catalog.edit_type(actor, id, &patch)?;
            printer.updated("meditation type", kind.id, &kind)
        }
        TypeCommand::Delete { id } => {
            catalog.delete_type(actor, id)?;
            printer.deleted("meditation type", id)
        }
        TypeCommand::List => printer.meditation_types(&catalog.types()?),
    }
}

fn cmd_meditation(
    catalog: &CatalogService<'_>,
    printer: &Printer,
    actor: &User,
    cmd: MeditationCommand,
) -> Result<()> {
    match cmd {
        MeditationCommand::Add {
            title,
            duration,
            difficulty,
            type_id,
        } => {
            let meditation = catalog.add_meditation(actor, &title, duration, difficulty, type_id)?;
            printer.created("meditation", meditation.id, &meditation)
        }
        MeditationCommand::Edit {
            id,
            title,
            duration,
            difficulty,
            type_id,
        } => {
            let patch = MeditationPatch {
                title,
                duration,
                difficulty,
                type_id,
            };
            let meditation = catalog.edit_meditation(actor, id, &patch)?;
            printer.updated("meditation", meditation.id, &meditation)
        }
        MeditationCommand::Delete { id } => {
            catalog.delete_meditation(actor, id)?;
            printer.deleted("meditation", id)
        }
        MeditationCommand::List => printer.meditations(&catalog.meditations()?),
    }
}

fn cmd_session(
    service: &StatsService<'_, Database>,
    printer: &Printer,
    actor: &User,
    cmd: SessionCommand,
) -> Result<()> {
    match cmd {
        SessionCommand::Log {
            meditation,
            minutes,
            at,
        } => {
            let session = service.log_session(
                actor.id,
                &NewSession {
                    meditation_id: meditation,
                    duration_completed: minutes,
                    date: at.unwrap_or_else(|| Local::now().naive_local()),
                },
            )?;
            printer.created("session", session.id, &session)
        }
        SessionCommand::Edit {
            id,
            meditation,
            minutes,
            at,
        } => {
            let session = service.edit_session(
                actor.id,
                id,
                &NewSession {
                    meditation_id: meditation,
                    duration_completed: minutes,
                    date: at,
                },
            )?;
            printer.updated("session", session.id, &session)
        }
        SessionCommand::Delete { id } => {
            service.delete_session(actor.id, id)?;
            printer.deleted("session", id)
        }
        SessionCommand::Show { id } => {
            let session = service
                .store()
                .get_session(actor.id, id)?
                .ok_or(mindlog_core::Error::SessionNotFound(id))?;
            printer.session(&session)
        }
        SessionCommand::List { from, to } => {
            let range = DateRange {
                from: from.and_then(|day| day.and_hms_opt(0, 0, 0)),
                to: to.and_then(|day| day.and_hms_opt(23, 59, 59)),
            };
            let sessions = service.store().list_sessions(actor.id, Some(&range))?;
            printer.sessions(&sessions)
        }
    }
}

fn cmd_stats(
    service: &StatsService<'_, Database>,
    printer: &Printer,
    actor: &User,
    cmd: StatsCommand,
) -> Result<()> {
    match cmd {
        StatsCommand::Show => printer.summary(&service.stats(actor.id)?),
        StatsCommand::Refresh => {
            let outcome = service.refresh(actor.id)?;
            if let SummaryOutcome::NoSessions(_) = outcome {
                printer.note("No sessions yet, nothing stored.");
            }
            printer.summary(outcome.summary())
        }
        StatsCommand::RefreshAll => {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .context("invalid progress bar template")?
                    .progress_chars("#>-"),
            );
            if printer.is_json() {
                pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
            }

            let report = service.refresh_all_with(actor, |tick| {
                pb.set_length(tick.total as u64);
                pb.set_position(tick.done as u64);
                pb.set_message(format!("user {}", tick.user_id));
            })?;
            pb.finish_and_clear();

            printer.refresh_report(&report)
        }
        StatsCommand::All => printer.summaries(&service.all_summaries(actor)?),
    }
}
