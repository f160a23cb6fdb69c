mod cli;
mod cmd;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, ConfigAction, MedAction};
use std::process;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use medremind::core::journal::{JournalLayer, LogJournal};
use medremind::core::med::AddMedicationParams;
use medremind::models::config::Config;
use medremind::output;

fn init_tracing(config: &Config, journal: &LogJournal) {
    // Console output stays off unless asked for; stderr carries the error envelope.
    let console_filter =
        EnvFilter::try_from_env("MEDREMIND_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    let journal_filter =
        EnvFilter::try_new(&config.log.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
                .with_filter(console_filter),
        )
        .with(JournalLayer::new(journal.clone()).with_filter(journal_filter))
        .try_init();
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Med { action } => match action {
            MedAction::Add { .. } => "med_add",
            MedAction::List => "med_list",
            MedAction::Remove { .. } => "med_remove",
            MedAction::Pause { .. } => "med_pause",
            MedAction::Unpause { .. } => "med_unpause",
            MedAction::Take { .. } => "med_take",
        },
        Commands::Due { .. } => "due",
        Commands::Scheduled => "scheduled",
        Commands::Reschedule => "reschedule",
        Commands::Tick => "tick",
        Commands::Press { .. } => "press",
        Commands::Event { .. } => "event",
        Commands::TestNotify => "test_notify",
        Commands::Reset { .. } => "reset",
        Commands::Logs { .. } => "logs",
        Commands::Config { .. } => "config",
        Commands::Completions { .. } => "completions",
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match &cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "medremind",
                &mut std::io::stdout(),
            );
            return Ok(());
        }
        Commands::Config { action } => {
            return match action {
                ConfigAction::Show => cmd::config::run_show(&config, cli.human),
                ConfigAction::Set { key, value } => cmd::config::run_set(key, value),
            };
        }
        _ => {}
    }

    let journal = LogJournal::new(config.log.journal_capacity);
    init_tracing(&config, &journal);
    let session = cmd::Session::open(config, journal, cli.at, cli.human)?;
    session.journal.load(&session.db).await?;

    let result = match cli.command {
        Commands::Med { action } => match action {
            MedAction::Add {
                name,
                times,
                every,
                first,
                start,
                end,
                pause_days,
                icon,
                color,
            } => {
                let params = AddMedicationParams {
                    name: &name,
                    times: times.as_deref(),
                    interval_hours: every,
                    first_dose: first.as_deref(),
                    start_date: start,
                    end_date: end,
                    pause_days,
                    icon: icon.as_deref(),
                    color: color.as_deref(),
                };
                cmd::med::run_add(&session, params).await
            }
            MedAction::List => cmd::med::run_list(&session).await,
            MedAction::Remove { med } => cmd::med::run_remove(&session, &med).await,
            MedAction::Pause { med, until, days } => {
                cmd::med::run_pause(&session, &med, until, days).await
            }
            MedAction::Unpause { med } => cmd::med::run_unpause(&session, &med).await,
            MedAction::Take { med, time, date } => {
                cmd::med::run_take(&session, &med, &time, date).await
            }
        },
        Commands::Due { date } => cmd::due::run(&session, date).await,
        Commands::Scheduled => cmd::notify::run_scheduled(&session).await,
        Commands::Reschedule => cmd::notify::run_reschedule(&session).await,
        Commands::Tick => cmd::notify::run_tick(&session).await,
        Commands::Press { id, action } => cmd::notify::run_press(&session, &id, &action).await,
        Commands::Event { r#type, detail } => {
            cmd::notify::run_event(&session, &r#type, &detail).await
        }
        Commands::TestNotify => cmd::notify::run_test(&session).await,
        Commands::Reset { yes } => cmd::reset::run(&session, yes).await,
        Commands::Logs {
            level,
            search,
            stats,
            clear,
        } => {
            cmd::logs::run(&session, level.as_deref(), search.as_deref(), stats, clear).await
        }
        Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }
    session.journal.flush(&session.db).await?;
    result
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let command = command_name(&cli.command);

    if let Err(e) = run(cli).await {
        let code = e
            .downcast_ref::<medremind::Error>()
            .map(output::error_code)
            .unwrap_or("general_error");
        let err = output::error(command, code, &e.to_string());
        eprintln!("{err}");
        process::exit(1);
    }
}
