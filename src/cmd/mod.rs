pub mod config;
pub mod due;
pub mod logs;
pub mod med;
pub mod notify;
pub mod reset;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use medremind::core::clock::{Clock, FixedClock, SystemClock};
use medremind::core::dispatch::Dispatcher;
use medremind::core::escalation::EscalationPolicy;
use medremind::core::journal::LogJournal;
use medremind::db::Database;
use medremind::models::config::Config;
use medremind::output;

/// Everything one command invocation works against.
pub struct Session {
    pub config: Config,
    pub db: Database,
    pub clock: Box<dyn Clock>,
    pub journal: LogJournal,
    pub human: bool,
}

impl Session {
    pub fn open(
        config: Config,
        journal: LogJournal,
        at: Option<DateTime<FixedOffset>>,
        human: bool,
    ) -> Result<Self> {
        let db = Database::open(&Config::db_path())?;
        let clock: Box<dyn Clock> = match at {
            Some(now) => Box::new(FixedClock::new(now)),
            None => Box::new(SystemClock),
        };
        Ok(Self {
            config,
            db,
            clock,
            journal,
            human,
        })
    }

    pub fn policy(&self) -> EscalationPolicy {
        EscalationPolicy::from(&self.config.reminders)
    }

    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.db, &self.db, self.clock.as_ref()).with_policy(self.policy())
    }
}

pub fn print_json(command: &str, data: Value) -> Result<()> {
    let out = output::success(command, data);
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}
