use anyhow::{Context, Result};
use serde_json::json;

use medremind::core::dispatch::DispatchOutcome;
use medremind::core::med;
use medremind::core::schedule;
use medremind::models::notification::{Action, EventDetail, EventType};
use medremind::output::human;

use super::{Session, print_json};

/// Headless wake-up: deliver everything due and run the background handler
/// once per delivered notification.
pub async fn run_tick(s: &Session) -> Result<()> {
    let fired = s.db.fire_due(s.clock.now())?;
    let dispatcher = s.dispatcher();

    let mut results = Vec::with_capacity(fired.len());
    for notification in fired {
        let id = notification.id.clone();
        let result = dispatcher
            .on_background_event(EventType::Delivered, EventDetail::delivered(notification))
            .await;
        results.push((id, result));
    }

    if s.human {
        if results.is_empty() {
            println!("Nothing due");
        }
        for (id, result) in &results {
            println!("{}", human::format_dispatch(id, result));
        }
    } else {
        let fired: Vec<_> = results
            .iter()
            .map(|(id, result)| json!({ "id": id, "dispatch": result }))
            .collect();
        print_json("tick", json!({ "fired": fired }))?;
    }
    Ok(())
}

/// The user pressed an action button on a displayed notification.
pub async fn run_press(s: &Session, id: &str, action: &str) -> Result<()> {
    let notification = s
        .db
        .displayed_notification(id)?
        .with_context(|| format!("notification '{id}' is not displayed"))?;
    let Ok(action) = action.parse::<Action>();

    let result = s
        .dispatcher()
        .on_foreground_event(EventType::ActionPress, EventDetail::pressed(notification, &action))
        .await;
    report(s, "press", id, result)
}

/// Feed a raw subsystem event through the background entry point.
pub async fn run_event(s: &Session, event_type: &str, detail: &str) -> Result<()> {
    let Ok(event_type) = event_type.parse::<EventType>();
    let detail: EventDetail =
        serde_json::from_str(detail).context("event detail is not valid JSON")?;
    let id = detail
        .notification
        .as_ref()
        .map(|n| n.id.clone())
        .unwrap_or_default();

    let result = s.dispatcher().on_background_event(event_type, detail).await;
    report(s, "event", &id, result)
}

fn report(s: &Session, command: &str, id: &str, result: DispatchOutcome) -> Result<()> {
    if let DispatchOutcome::Failed { error } = &result {
        anyhow::bail!("{error}");
    }
    if s.human {
        println!("{}", human::format_dispatch(id, &result));
    } else {
        let mut data = json!({ "id": id, "dispatch": result });
        if let Some(notice) = result.outcome().and_then(|o| o.notice()) {
            data["warning"] = json!(notice);
        }
        print_json(command, data)?;
    }
    Ok(())
}

pub async fn run_scheduled(s: &Session) -> Result<()> {
    let pending = schedule::scheduled(&s.db).await?;
    if s.human {
        println!("{}", human::format_scheduled(&pending));
    } else {
        print_json("scheduled", json!({ "count": pending.len(), "pending": pending }))?;
    }
    Ok(())
}

pub async fn run_reschedule(s: &Session) -> Result<()> {
    let failed = med::reschedule_all(&s.db, &s.db, s.clock.as_ref()).await?;
    if failed > 0 {
        anyhow::bail!("{failed} medication(s) could not be rescheduled");
    }
    if s.human {
        println!("Reminders rescheduled");
    } else {
        print_json("reschedule", json!({ "failed": failed }))?;
    }
    Ok(())
}

pub async fn run_test(s: &Session) -> Result<()> {
    let id = schedule::schedule_test(&s.db, s.clock.now()).await?;
    if s.human {
        println!("Test notification scheduled ({id}); run `tick` in a few seconds");
    } else {
        print_json("test_notify", json!({ "id": id }))?;
    }
    Ok(())
}
