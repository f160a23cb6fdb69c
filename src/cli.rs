use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(
    name = "medremind",
    version,
    about = "Medication reminders with escalating follow-ups"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as human-readable text instead of JSON
    #[arg(long = "human", short = 'H', global = true)]
    pub human: bool,

    /// Pretend the current time is this RFC 3339 instant
    #[arg(long, global = true)]
    pub at: Option<DateTime<FixedOffset>>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage medications
    Med {
        #[command(subcommand)]
        action: MedAction,
    },

    /// Show what is due on a day
    Due {
        /// Day to report (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List pending notifications in firing order
    Scheduled,

    /// Re-register the daily reminders of every medication
    Reschedule,

    /// Fire every notification that is due and handle its delivery
    Tick,

    /// Press an action on a displayed notification
    Press {
        /// Notification id
        id: String,
        /// Action id: take or snooze
        action: String,
    },

    /// Feed a raw notification event (JSON detail) to the background handler
    Event {
        /// Event type: delivered, press or dismissed
        r#type: String,
        /// Event detail as JSON: {"notification": {...}, "pressAction": {"id": "..."}}
        detail: String,
    },

    /// Schedule a test notification five seconds from now
    TestNotify,

    /// Delete all medications, doses, reminders and settings
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Show the log journal
    Logs {
        /// Only entries at this level
        #[arg(long)]
        level: Option<String>,
        /// Only entries containing this text
        #[arg(long)]
        search: Option<String>,
        /// Show counts per level instead of entries
        #[arg(long)]
        stats: bool,
        /// Empty the journal
        #[arg(long)]
        clear: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum MedAction {
    /// Add a medication and schedule its reminders
    Add {
        /// Medication name
        name: String,
        /// Comma-separated dose times (HH:MM)
        #[arg(long, conflicts_with = "every")]
        times: Option<String>,
        /// Dose every N hours instead of fixed times
        #[arg(long, value_name = "HOURS")]
        every: Option<u32>,
        /// First dose of an interval schedule (HH:MM)
        #[arg(long, requires = "every")]
        first: Option<String>,
        /// First day of treatment (default: today)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day of treatment
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Rest days after each dose day
        #[arg(long, default_value_t = 0)]
        pause_days: u32,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },

    /// List medications
    List,

    /// Delete a medication and its reminders
    Remove {
        /// Medication id or name
        med: String,
    },

    /// Stop reminders until a date or for a number of days
    Pause {
        /// Medication id or name
        med: String,
        /// Last day of reminders
        #[arg(long, conflicts_with = "days", required_unless_present = "days")]
        until: Option<NaiveDate>,
        /// Number of days from today
        #[arg(long)]
        days: Option<u32>,
    },

    /// Resume an open-ended schedule
    Unpause {
        /// Medication id or name
        med: String,
    },

    /// Record a dose taken
    Take {
        /// Medication id or name
        med: String,
        /// Scheduled dose time (HH:MM)
        time: String,
        /// Day of the dose (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a config value
    Set {
        /// Config key (e.g. reminders.followup_count, log.filter)
        key: String,
        /// Config value
        value: String,
    },
}
