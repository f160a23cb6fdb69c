use colored::Colorize;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use crate::core::dispatch::DispatchOutcome;
use crate::core::eligibility::DueStatus;
use crate::core::escalation::Outcome;
use crate::core::journal::{JournalStats, LogEntry};
use crate::core::med::DayReport;
use crate::models::med::Medication;
use crate::models::notification::{Notification, PendingTrigger};

fn table() -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    t
}

fn join_times(med: &Medication) -> String {
    med.times
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_schedule(med: &Medication) -> String {
    let mut s = match med.interval_hours {
        Some(h) => format!("every {h}h"),
        None => "fixed".to_string(),
    };
    if med.pause_days > 0 {
        s.push_str(&format!(", 1 on / {} off", med.pause_days));
    }
    s
}

/// One-line summary of a medication.
pub fn format_med_line(med: &Medication) -> String {
    let end = med
        .end_date
        .map(|d| format!(" until {d}"))
        .unwrap_or_default();
    format!(
        "{} at {} ({}) from {}{}",
        med.name.bold(),
        join_times(med),
        describe_schedule(med),
        med.start_date,
        end
    )
}

pub fn format_med_table(meds: &[Medication]) -> String {
    if meds.is_empty() {
        return "No medications.".to_string();
    }
    let mut t = table();
    t.set_header(vec!["Name", "Times", "Schedule", "Start", "End", "Id"]);
    for m in meds {
        t.add_row(vec![
            m.name.clone(),
            join_times(m),
            describe_schedule(m),
            m.start_date.to_string(),
            m.end_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            m.id.clone(),
        ]);
    }
    t.to_string()
}

fn describe_status(status: &DueStatus) -> String {
    match status {
        DueStatus::Due => "due".to_string(),
        DueStatus::NotStarted { starts } => format!("starts {starts}"),
        DueStatus::Ended { ended } => format!("ended {ended}"),
        DueStatus::CycleRest { next_due } => format!("rest day, next {next_due}"),
    }
}

pub fn format_day_report(report: &DayReport) -> String {
    let mut out = format!("Doses for {}\n", report.date.to_string().bold());
    if report.due.is_empty() {
        out.push_str("  nothing due\n");
    }
    for d in &report.due {
        for slot in &d.slots {
            let mark = if slot.taken {
                "taken".green().to_string()
            } else if slot.escalating {
                "reminding".yellow().to_string()
            } else {
                "pending".normal().to_string()
            };
            out.push_str(&format!("  {} {}  {}\n", slot.time, d.medication.name, mark));
        }
    }
    for s in &report.skipped {
        out.push_str(&format!(
            "  {}\n",
            format!("{}: {}", s.medication.name, describe_status(&s.reason)).dimmed()
        ));
    }
    out.trim_end().to_string()
}

pub fn format_scheduled(pending: &[PendingTrigger]) -> String {
    if pending.is_empty() {
        return "No scheduled notifications.".to_string();
    }
    let mut t = table();
    t.set_header(vec!["Fires at", "Repeats", "Kind", "Title", "Id"]);
    for p in pending {
        t.add_row(vec![
            p.trigger.fire_at.format("%Y-%m-%d %H:%M").to_string(),
            if p.trigger.repeat_daily { "daily" } else { "once" }.to_string(),
            p.notification.payload().kind().to_string(),
            p.notification.title.clone(),
            p.notification.id.clone(),
        ]);
    }
    t.to_string()
}

pub fn format_notification(n: &Notification) -> String {
    format!("{}  {}  [{}]", n.title.bold(), n.body, n.id)
}

pub fn format_outcome(outcome: &Outcome) -> String {
    if let Some(notice) = outcome.notice() {
        return format!("{} {}", "Warning:".yellow().bold(), notice);
    }
    match outcome {
        Outcome::EscalationStarted {
            occurrence,
            followups,
        } => format!("{occurrence}: {} follow-up(s) scheduled", followups.len()),
        Outcome::Taken {
            occurrence,
            recorded,
            ..
        } => {
            if *recorded {
                format!("{} {occurrence}", "Taken".green())
            } else {
                format!("{occurrence} was already recorded")
            }
        }
        Outcome::Snoozed {
            occurrence,
            snooze_id,
            ..
        } => format!("{occurrence} snoozed ({snooze_id})"),
        Outcome::ChainsCleared { med_id, cancelled } => {
            format!("{med_id}: {cancelled} reminder(s) cleared")
        }
        Outcome::Ignored { reason } => format!("ignored ({reason:?})").dimmed().to_string(),
        Outcome::NotDue { occurrence, .. } => format!("{occurrence} not due"),
    }
}

pub fn format_dispatch(id: &str, result: &DispatchOutcome) -> String {
    match result {
        DispatchOutcome::Handled { outcome } => format!("{id}: {}", format_outcome(outcome)),
        DispatchOutcome::Failed { error } => {
            format!("{id}: {} {error}", "failed:".red().bold())
        }
    }
}

pub fn format_log_entry(e: &LogEntry) -> String {
    let level = match e.level.as_str() {
        "ERROR" => e.level.red().bold(),
        "WARN" => e.level.yellow(),
        "DEBUG" | "TRACE" => e.level.dimmed(),
        _ => e.level.normal(),
    };
    let mut line = format!(
        "{} {:5} {}",
        e.timestamp.format("%Y-%m-%d %H:%M:%S"),
        level,
        e.message
    );
    for (k, v) in &e.fields {
        line.push_str(&format!(" {k}={v}"));
    }
    line
}

pub fn format_log_stats(stats: &JournalStats) -> String {
    let levels = stats
        .by_level
        .iter()
        .map(|(l, n)| format!("{l}={n}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} entries  {levels}", stats.total)
}
