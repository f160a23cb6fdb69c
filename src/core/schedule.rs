use chrono::{DateTime, Duration, FixedOffset};
use tracing::{debug, info, warn};

use crate::core::clock::local_at;
use crate::error::Result;
use crate::models::med::{DoseTime, Medication};
use crate::models::notification::{
    Notification, NotificationKind, Payload, PendingTrigger, Trigger,
};
use crate::notify::Notifier;

/// Id of the daily initial reminder for one dose time of a medication.
pub fn initial_id(med_id: &str, time: DoseTime) -> String {
    format!("{med_id}__{}", time.compact())
}

/// Next instant at `time` strictly after `now`, never before the
/// medication's start date.
pub fn next_fire(
    med: &Medication,
    time: DoseTime,
    now: DateTime<FixedOffset>,
) -> DateTime<FixedOffset> {
    let base = now.date_naive().max(med.start_date);
    let mut at = local_at(*now.offset(), base, time.to_naive_time());
    if at <= now {
        at += Duration::days(1);
    }
    at
}

fn is_initial_for(p: &PendingTrigger, med_id: &str) -> bool {
    p.notification.data.as_ref().is_some_and(|d| {
        d.med_id.as_deref() == Some(med_id) && d.kind() == NotificationKind::Initial
    })
}

fn belongs_to(p: &PendingTrigger, med_id: &str) -> bool {
    p.notification
        .data
        .as_ref()
        .is_some_and(|d| d.med_id.as_deref() == Some(med_id))
}

/// Replace every initial reminder of `med` with fresh daily triggers.
///
/// Stale registrations are cancelled first, so calling this any number of
/// times leaves exactly one trigger per dose time. Returns how many
/// triggers were registered; zero once the medication has ended.
pub async fn reschedule<N: Notifier + ?Sized>(
    notifier: &N,
    med: &Medication,
    now: DateTime<FixedOffset>,
) -> Result<usize> {
    let pending = notifier.list_triggers().await?;
    for p in pending.iter().filter(|p| is_initial_for(p, &med.id)) {
        notifier.cancel_trigger(&p.notification.id).await?;
    }

    if let Some(end) = med.end_date
        && end < now.date_naive()
    {
        info!(med = %med.name, %end, "medication ended, nothing scheduled");
        return Ok(0);
    }

    for &time in &med.times {
        let notification = Notification::new(
            initial_id(&med.id, time),
            format!("Time for your medication: {}", med.name),
            format!("Take at {time}"),
            Payload::initial(&med.id, &med.name, time),
        );
        let trigger = Trigger::daily(next_fire(med, time, now));
        debug!(id = %notification.id, fire_at = %trigger.fire_at, "registering initial reminder");
        notifier.create_trigger(&notification, &trigger).await?;
    }

    info!(med = %med.name, count = med.times.len(), "reminders scheduled");
    Ok(med.times.len())
}

/// Reschedule every medication, continuing past individual failures.
/// Returns the number of medications that failed.
pub async fn reschedule_all<N: Notifier + ?Sized>(
    notifier: &N,
    meds: &[Medication],
    now: DateTime<FixedOffset>,
) -> usize {
    let mut failed = 0;
    for med in meds {
        if let Err(e) = reschedule(notifier, med, now).await {
            warn!(med = %med.name, error = %e, "reschedule failed");
            failed += 1;
        }
    }
    failed
}

/// Cancel every pending trigger carrying `med_id`, whatever its kind.
pub async fn cancel_all_for<N: Notifier + ?Sized>(notifier: &N, med_id: &str) -> Result<usize> {
    let pending = notifier.list_triggers().await?;
    let mut count = 0;
    for p in pending.iter().filter(|p| belongs_to(p, med_id)) {
        notifier.cancel_trigger(&p.notification.id).await?;
        count += 1;
    }
    Ok(count)
}

/// Pending triggers ordered by fire time.
pub async fn scheduled<N: Notifier + ?Sized>(notifier: &N) -> Result<Vec<PendingTrigger>> {
    let mut pending = notifier.list_triggers().await?;
    pending.sort_by_key(|p| p.trigger.fire_at);
    Ok(pending)
}

/// Register a one-shot test alert five seconds from `now`.
pub async fn schedule_test<N: Notifier + ?Sized>(
    notifier: &N,
    now: DateTime<FixedOffset>,
) -> Result<String> {
    let id = format!("test_{}", now.timestamp_millis());
    let payload = Payload {
        kind: Some(NotificationKind::Test),
        med_id: Some("test".to_string()),
        med_name: Some("Test".to_string()),
        time: Some(now.format("%H:%M").to_string()),
        ..Payload::default()
    };
    let notification = Notification::new(
        &id,
        "Test alarm",
        "If you can see this, notifications work.",
        payload,
    );
    notifier
        .create_trigger(&notification, &Trigger::once(now + Duration::seconds(5)))
        .await
}
