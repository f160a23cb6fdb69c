use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::core::clock::Clock;
use crate::core::dispatch::Dispatcher;
use crate::core::eligibility::{DueStatus, due_status};
use crate::core::escalation::{EngineEvent, EscalationPolicy, Outcome};
use crate::core::schedule;
use crate::error::{Error, Result};
use crate::models::event::DoseEvent;
use crate::models::med::{DoseTime, Medication, parse_times_csv};
use crate::notify::Notifier;
use crate::store::{DoseLog, FollowupRegistry, KeyValueStore, MedicationStore, keys};

// ---------------------------------------------------------------------------
// AddMedicationParams
// ---------------------------------------------------------------------------

/// Parameters for adding a new medication. Exactly one of `times` and
/// `interval_hours` must be given.
#[derive(Debug, Default)]
pub struct AddMedicationParams<'a> {
    pub name: &'a str,
    /// Comma-separated `HH:MM` list.
    pub times: Option<&'a str>,
    pub interval_hours: Option<u32>,
    /// First dose of an interval schedule; defaults to 08:00.
    pub first_dose: Option<&'a str>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub pause_days: u32,
    pub icon: Option<&'a str>,
    pub color: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// add_medication
// ---------------------------------------------------------------------------

/// Validate, persist and schedule a new medication.
///
/// The medication is stored before scheduling; a scheduling failure is
/// returned to the caller with the definition already saved, and a later
/// `reschedule` repairs it.
pub async fn add_medication(
    store: &dyn KeyValueStore,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
    params: AddMedicationParams<'_>,
) -> Result<Medication> {
    let name = params.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidMedication(
            "medication name is required".to_string(),
        ));
    }
    let start = params.start_date.unwrap_or_else(|| clock.today());

    let mut med = match (params.interval_hours, params.times) {
        (Some(_), Some(_)) => {
            return Err(Error::InvalidMedication(
                "give either fixed times or an interval, not both".to_string(),
            ));
        }
        (Some(interval), None) => {
            let first: DoseTime = params.first_dose.unwrap_or("08:00").parse()?;
            Medication::with_interval(name, interval, first, start)?
        }
        (None, Some(csv)) => Medication::new(name, parse_times_csv(csv)?, start),
        (None, None) => {
            return Err(Error::InvalidMedication(
                "give fixed times or an interval".to_string(),
            ));
        }
    };
    med.times.sort();
    med.times.dedup();
    med.end_date = params.end_date;
    med.pause_days = params.pause_days;
    if let Some(icon) = params.icon {
        med.icon = icon.to_string();
    }
    if let Some(color) = params.color {
        med.color = color.to_string();
    }
    med.validate()?;

    let mut meds = MedicationStore::load(store).await?;
    meds.upsert(med.clone());
    meds.save(store).await?;
    info!(med = %med.name, id = %med.id, "medication added");

    schedule::reschedule(notifier, &med, clock.now()).await?;
    Ok(med)
}

// ---------------------------------------------------------------------------
// remove_medication
// ---------------------------------------------------------------------------

/// Delete a medication together with every trigger and chain it owns.
/// Recorded doses are kept.
pub async fn remove_medication(
    store: &dyn KeyValueStore,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
    id_or_name: &str,
) -> Result<Medication> {
    let mut meds = MedicationStore::load(store).await?;
    let med = meds.resolve(id_or_name)?.clone();

    let cancelled = schedule::cancel_all_for(notifier, &med.id).await?;
    Dispatcher::new(store, notifier, clock)
        .submit(EngineEvent::MedicationRemoved {
            med_id: med.id.clone(),
        })
        .await?;

    meds.remove(&med.id);
    meds.save(store).await?;
    info!(med = %med.name, cancelled, "medication removed");
    Ok(med)
}

// ---------------------------------------------------------------------------
// pause / unpause
// ---------------------------------------------------------------------------

async fn set_end_date(
    store: &dyn KeyValueStore,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
    id_or_name: &str,
    end_date: Option<NaiveDate>,
) -> Result<Medication> {
    let mut meds = MedicationStore::load(store).await?;
    let mut med = meds.resolve(id_or_name)?.clone();
    med.end_date = end_date;
    meds.upsert(med.clone());
    meds.save(store).await?;
    schedule::reschedule(notifier, &med, clock.now()).await?;
    Ok(med)
}

/// Stop reminders after `until` (inclusive), which must not be in the past.
pub async fn pause_until(
    store: &dyn KeyValueStore,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
    id_or_name: &str,
    until: NaiveDate,
) -> Result<Medication> {
    if until < clock.today() {
        return Err(Error::InvalidMedication(format!(
            "pause end {until} must be today or later"
        )));
    }
    let med = set_end_date(store, notifier, clock, id_or_name, Some(until)).await?;
    info!(med = %med.name, %until, "medication paused");
    Ok(med)
}

/// Pause for `days` days from today.
pub async fn pause_for_days(
    store: &dyn KeyValueStore,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
    id_or_name: &str,
    days: u32,
) -> Result<Medication> {
    if days == 0 {
        return Err(Error::InvalidMedication(
            "pause length must be at least one day".to_string(),
        ));
    }
    let until = clock.today() + Duration::days(i64::from(days));
    pause_until(store, notifier, clock, id_or_name, until).await
}

pub async fn unpause(
    store: &dyn KeyValueStore,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
    id_or_name: &str,
) -> Result<Medication> {
    let med = set_end_date(store, notifier, clock, id_or_name, None).await?;
    info!(med = %med.name, "medication resumed");
    Ok(med)
}

// ---------------------------------------------------------------------------
// take_dose
// ---------------------------------------------------------------------------

/// Confirm a dose from the app. Goes through the state machine like a
/// notification "take", so the occurrence's chain is torn down as well.
pub async fn take_dose(
    store: &dyn KeyValueStore,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
    policy: EscalationPolicy,
    id_or_name: &str,
    time: DoseTime,
    date: Option<NaiveDate>,
) -> Result<Outcome> {
    let meds = MedicationStore::load(store).await?;
    let med = meds.resolve(id_or_name)?;
    let date = date.unwrap_or_else(|| clock.today());

    let outcome = Dispatcher::new(store, notifier, clock)
        .with_policy(policy)
        .submit(EngineEvent::ManualTake {
            med_id: med.id.clone(),
            date,
            time,
        })
        .await?;
    if let Some(notice) = outcome.notice() {
        warn!(med = %med.name, %date, "{notice}");
    }
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// due_on
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct DoseSlot {
    pub time: DoseTime,
    pub taken: bool,
    pub escalating: bool,
}

#[derive(Debug, Serialize)]
pub struct DueMedication {
    pub medication: Medication,
    pub slots: Vec<DoseSlot>,
}

#[derive(Debug, Serialize)]
pub struct SkippedMedication {
    pub medication: Medication,
    pub reason: DueStatus,
}

#[derive(Debug, Serialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub due: Vec<DueMedication>,
    pub skipped: Vec<SkippedMedication>,
    pub events: Vec<DoseEvent>,
}

/// What is due on `date`, what is resting, and what was taken.
pub async fn due_on(store: &dyn KeyValueStore, date: NaiveDate) -> Result<DayReport> {
    let meds = MedicationStore::load(store).await?;
    let doses = DoseLog::load(store).await?;
    let registry = FollowupRegistry::load(store).await?;

    let mut due = Vec::new();
    let mut skipped = Vec::new();
    for med in meds.all() {
        match due_status(med, date) {
            DueStatus::Due => {
                let slots = med
                    .times
                    .iter()
                    .map(|&time| {
                        let occ = crate::models::OccurrenceKey::new(&med.id, date, time);
                        DoseSlot {
                            time,
                            taken: doses.has_dose(&med.id, date, time),
                            escalating: registry.has_occurrence(&occ),
                        }
                    })
                    .collect();
                due.push(DueMedication {
                    medication: med.clone(),
                    slots,
                });
            }
            reason => skipped.push(SkippedMedication {
                medication: med.clone(),
                reason,
            }),
        }
    }

    Ok(DayReport {
        date,
        due,
        skipped,
        events: doses.on(date).to_vec(),
    })
}

// ---------------------------------------------------------------------------
// reschedule_all / reset_all
// ---------------------------------------------------------------------------

/// Re-register every stored medication. Returns how many failed.
pub async fn reschedule_all(
    store: &dyn KeyValueStore,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
) -> Result<usize> {
    let meds = MedicationStore::load(store).await?;
    Ok(schedule::reschedule_all(notifier, meds.all(), clock.now()).await)
}

/// Cancel every pending trigger and wipe all engine documents.
/// Returns how many triggers were cancelled.
pub async fn reset_all(store: &dyn KeyValueStore, notifier: &dyn Notifier) -> Result<usize> {
    let pending = notifier.list_triggers().await?;
    for p in &pending {
        if let Err(e) = notifier.cancel_trigger(&p.notification.id).await {
            warn!(id = %p.notification.id, error = %e, "cancel failed during reset");
        }
    }
    store.remove_keys(&keys::RESETTABLE).await?;
    info!(cancelled = pending.len(), "all data cleared");
    Ok(pending.len())
}
