//! The escalation state machine.
//!
//! Pure: given the persisted documents and one incoming event, it returns
//! the documents that must be rewritten and the notification requests to
//! issue. Both dispatcher entry points run exactly this code after
//! reloading state, so no in-memory state survives between events.
//!
//! Per occurrence: `None -> Delivered -> Escalating(n) -> Resolved`.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use crate::core::eligibility::{DueStatus, due_status};
use crate::error::Result;
use crate::models::config::Reminders;
use crate::models::event::DoseEvent;
use crate::models::med::{DoseTime, Medication};
use crate::models::notification::{
    Action, EventDetail, EventType, Notification, NotificationKind, Payload, Trigger,
};
use crate::models::occurrence::OccurrenceKey;
use crate::store::{DoseLog, FollowupRegistry, KeyValueStore, MedicationStore};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct EscalationPolicy {
    pub followup_count: u32,
    pub followup_interval: Duration,
    pub snooze_delay: Duration,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::from(&Reminders::default())
    }
}

impl From<&Reminders> for EscalationPolicy {
    fn from(r: &Reminders) -> Self {
        Self {
            followup_count: r.followup_count,
            followup_interval: Duration::minutes(i64::from(r.followup_interval_minutes)),
            snooze_delay: Duration::minutes(i64::from(r.snooze_minutes)),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything the state machine reads, as loaded from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub meds: MedicationStore,
    pub doses: DoseLog,
    pub registry: FollowupRegistry,
}

impl Snapshot {
    pub async fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self {
            meds: MedicationStore::load(store).await?,
            doses: DoseLog::load(store).await?,
            registry: FollowupRegistry::load(store).await?,
        })
    }
}

// ---------------------------------------------------------------------------
// Events, effects, outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Delivered(Notification),
    Pressed {
        action: Action,
        notification: Notification,
    },
    /// A dose confirmed from the app rather than from a notification.
    ManualTake {
        med_id: String,
        date: NaiveDate,
        time: DoseTime,
    },
    /// A medication was deleted; its chains must go with it.
    MedicationRemoved { med_id: String },
}

impl EngineEvent {
    /// Interpret a raw subsystem event. `None` when it carries nothing the
    /// engine reacts to.
    pub fn from_parts(event_type: EventType, detail: EventDetail) -> Option<Self> {
        let action = detail.action();
        let notification = detail.notification?;
        match event_type {
            EventType::Delivered => Some(Self::Delivered(notification)),
            EventType::ActionPress => Some(Self::Pressed {
                action: action?,
                notification,
            }),
            EventType::Dismissed | EventType::Other => None,
        }
    }
}

/// A request to the notification subsystem.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Schedule {
        notification: Notification,
        trigger: Trigger,
    },
    CancelTrigger(String),
    Dismiss(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OccurrenceState {
    None,
    Delivered,
    Escalating { attempt: u32 },
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    Unrecognized,
    NotInitial,
    TestNotification,
    MissingMedId,
    MissingTime,
    MedicationNotFound,
    NotDueToday,
    AlreadyTaken,
    AlreadyEscalating,
    UnknownAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    EscalationStarted {
        occurrence: String,
        followups: Vec<String>,
    },
    Taken {
        occurrence: String,
        recorded: bool,
        cancelled: usize,
    },
    /// The dose was acknowledged on a day it is not due: nothing recorded,
    /// and the user must be told why.
    NotDue {
        occurrence: String,
        med_name: String,
        status: DueStatus,
        cancelled: usize,
    },
    Snoozed {
        occurrence: String,
        snooze_id: String,
        superseded: usize,
    },
    ChainsCleared {
        med_id: String,
        cancelled: usize,
    },
    Ignored {
        reason: IgnoreReason,
    },
}

impl Outcome {
    fn ignored(reason: IgnoreReason) -> Self {
        Self::Ignored { reason }
    }

    /// Message that must be shown to the user, if any.
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::NotDue {
                med_name, status, ..
            } => Some(match status {
                DueStatus::CycleRest { next_due } => format!(
                    "{med_name} is not due today because of its pause cycle; next dose day is {next_due}."
                ),
                DueStatus::NotStarted { starts } => {
                    format!("{med_name} only starts on {starts}; nothing was recorded.")
                }
                DueStatus::Ended { ended } => {
                    format!("{med_name} ended on {ended}; nothing was recorded.")
                }
                DueStatus::Due => format!("{med_name} is due; nothing was recorded."),
            }),
            _ => None,
        }
    }
}

/// Result of applying one event to a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub outcome: Outcome,
    pub state: OccurrenceState,
    pub effects: Vec<Effect>,
    /// Replacement dose log, when it changed.
    pub doses: Option<DoseLog>,
    /// Replacement registry, when it changed.
    pub registry: Option<FollowupRegistry>,
}

impl Transition {
    fn ignored(reason: IgnoreReason) -> Self {
        Self {
            outcome: Outcome::ignored(reason),
            state: OccurrenceState::None,
            effects: Vec::new(),
            doses: None,
            registry: None,
        }
    }

    fn dismiss_only(reason: IgnoreReason, notification_id: &str) -> Self {
        let mut t = Self::ignored(reason);
        t.effects.push(Effect::Dismiss(notification_id.to_string()));
        t
    }
}

// ---------------------------------------------------------------------------
// Transition function
// ---------------------------------------------------------------------------

pub fn transition(
    snapshot: &Snapshot,
    event: &EngineEvent,
    now: DateTime<FixedOffset>,
    policy: &EscalationPolicy,
) -> Transition {
    match event {
        EngineEvent::Delivered(n) => on_delivered(snapshot, n, now, policy),
        EngineEvent::Pressed {
            action: Action::Take,
            notification,
        } => on_take(snapshot, notification, now, policy),
        EngineEvent::Pressed {
            action: Action::Snooze,
            notification,
        } => on_snooze(snapshot, notification, now, policy),
        EngineEvent::Pressed { .. } => Transition::ignored(IgnoreReason::UnknownAction),
        EngineEvent::ManualTake { med_id, date, time } => {
            let occ = OccurrenceKey::new(med_id.clone(), *date, *time);
            resolve(snapshot, &occ, None, now, policy)
        }
        EngineEvent::MedicationRemoved { med_id } => {
            let mut registry = snapshot.registry.clone();
            let ids = registry.remove_medication(med_id);
            Transition {
                outcome: Outcome::ChainsCleared {
                    med_id: med_id.clone(),
                    cancelled: ids.len(),
                },
                state: OccurrenceState::None,
                effects: ids.into_iter().map(Effect::CancelTrigger).collect(),
                doses: None,
                registry: Some(registry),
            }
        }
    }
}

/// The occurrence a notification refers to: the explicit key when it
/// carries one, else the medication and time on `today`.
fn occurrence_of(payload: &Payload, today: NaiveDate) -> Option<OccurrenceKey> {
    if let Some(occ) = payload.occurrence() {
        return Some(occ);
    }
    let med_id = payload.med_id.as_deref()?;
    Some(OccurrenceKey::new(med_id, today, payload.dose_time()?))
}

fn on_delivered(
    snapshot: &Snapshot,
    n: &Notification,
    now: DateTime<FixedOffset>,
    policy: &EscalationPolicy,
) -> Transition {
    let payload = n.payload();
    match payload.kind() {
        NotificationKind::Initial => {}
        NotificationKind::Test => return Transition::ignored(IgnoreReason::TestNotification),
        _ => return Transition::ignored(IgnoreReason::NotInitial),
    }
    let Some(med_id) = payload.med_id.as_deref() else {
        return Transition::ignored(IgnoreReason::MissingMedId);
    };
    let Some(time) = payload.dose_time() else {
        return Transition::ignored(IgnoreReason::MissingTime);
    };
    let Some(med) = snapshot.meds.find(med_id) else {
        return Transition::ignored(IgnoreReason::MedicationNotFound);
    };

    let occ = OccurrenceKey::new(med_id, now.date_naive(), time);
    if !due_status(med, occ.date).is_due() {
        return Transition::ignored(IgnoreReason::NotDueToday);
    }
    if snapshot.doses.has_dose(med_id, occ.date, time) {
        return Transition::ignored(IgnoreReason::AlreadyTaken);
    }
    if snapshot.registry.has_occurrence(&occ) {
        return Transition::ignored(IgnoreReason::AlreadyEscalating);
    }

    let mut effects = Vec::new();
    let mut ids = Vec::new();
    for attempt in 1..=policy.followup_count {
        let notification = followup_notification(med, &payload, &occ, attempt, policy);
        let fire_at = now + policy.followup_interval * attempt as i32;
        ids.push(notification.id.clone());
        effects.push(Effect::Schedule {
            notification,
            trigger: Trigger::once(fire_at),
        });
    }

    // A new chain supersedes whatever is still outstanding for the
    // medication's other slots.
    let mut registry = snapshot.registry.clone();
    let superseded = registry.remove_superseded(med_id, &occ);
    effects.splice(0..0, superseded.into_iter().map(Effect::CancelTrigger));
    if !ids.is_empty() {
        registry.save_entry(occ.to_string(), &occ, ids.clone());
    }

    Transition {
        outcome: Outcome::EscalationStarted {
            occurrence: occ.to_string(),
            followups: ids,
        },
        state: if policy.followup_count > 0 {
            OccurrenceState::Escalating { attempt: 1 }
        } else {
            OccurrenceState::Delivered
        },
        effects,
        doses: None,
        registry: Some(registry),
    }
}

fn on_take(
    snapshot: &Snapshot,
    n: &Notification,
    now: DateTime<FixedOffset>,
    policy: &EscalationPolicy,
) -> Transition {
    let payload = n.payload();
    if payload.kind() == NotificationKind::Test {
        return Transition::dismiss_only(IgnoreReason::TestNotification, &n.id);
    }
    if payload.med_id.is_none() {
        return Transition::ignored(IgnoreReason::MissingMedId);
    }
    let Some(occ) = occurrence_of(&payload, now.date_naive()) else {
        return Transition::dismiss_only(IgnoreReason::MissingTime, &n.id);
    };
    resolve(snapshot, &occ, Some(&n.id), now, policy)
}

/// Record the dose when due, then tear down the occurrence's whole chain.
fn resolve(
    snapshot: &Snapshot,
    occ: &OccurrenceKey,
    originating: Option<&str>,
    now: DateTime<FixedOffset>,
    policy: &EscalationPolicy,
) -> Transition {
    let mut registry = snapshot.registry.clone();
    let mut ids = registry.remove_occurrence(occ);
    // The follow-up ids are deterministic; cancelling them covers a chain
    // scheduled by a process that died before it saved the registry.
    for attempt in 1..=policy.followup_count {
        let id = occ.followup_id(attempt);
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    let cancelled = ids.len();
    let mut effects: Vec<Effect> = ids.into_iter().map(Effect::CancelTrigger).collect();
    if let Some(id) = originating {
        effects.push(Effect::Dismiss(id.to_string()));
    }

    let med = snapshot.meds.find(&occ.med_id);
    let status = med.map(|m| due_status(m, occ.date));

    let (outcome, doses) = match (med, status) {
        (Some(med), Some(DueStatus::Due)) => {
            if snapshot.doses.has_dose(&med.id, occ.date, occ.time) {
                (
                    Outcome::Taken {
                        occurrence: occ.to_string(),
                        recorded: false,
                        cancelled,
                    },
                    None,
                )
            } else {
                let mut doses = snapshot.doses.clone();
                doses.record(
                    occ.date,
                    DoseEvent::for_medication(med, occ.time, now.with_timezone(&Utc)),
                );
                (
                    Outcome::Taken {
                        occurrence: occ.to_string(),
                        recorded: true,
                        cancelled,
                    },
                    Some(doses),
                )
            }
        }
        (Some(med), Some(status)) => (
            Outcome::NotDue {
                occurrence: occ.to_string(),
                med_name: med.name.clone(),
                status,
                cancelled,
            },
            None,
        ),
        // Medication deleted since the alert was scheduled: the chain still
        // goes, but there is nothing to record against.
        _ => (Outcome::ignored(IgnoreReason::MedicationNotFound), None),
    };

    Transition {
        outcome,
        state: OccurrenceState::Resolved,
        effects,
        doses,
        registry: Some(registry),
    }
}

fn on_snooze(
    snapshot: &Snapshot,
    n: &Notification,
    now: DateTime<FixedOffset>,
    policy: &EscalationPolicy,
) -> Transition {
    let payload = n.payload();
    if payload.kind() == NotificationKind::Test {
        return Transition::dismiss_only(IgnoreReason::TestNotification, &n.id);
    }
    if payload.med_id.is_none() {
        return Transition::dismiss_only(IgnoreReason::MissingMedId, &n.id);
    }
    let Some(occ) = occurrence_of(&payload, now.date_naive()) else {
        return Transition::dismiss_only(IgnoreReason::MissingTime, &n.id);
    };

    let mut registry = snapshot.registry.clone();
    let superseded = registry.remove_occurrence(&occ);
    let mut effects = vec![Effect::Dismiss(n.id.clone())];
    let superseded_count = superseded.len();
    effects.extend(superseded.into_iter().map(Effect::CancelTrigger));

    let Some(med) = snapshot.meds.find(&occ.med_id) else {
        let mut t = Transition::ignored(IgnoreReason::MedicationNotFound);
        t.effects = effects;
        t.registry = Some(registry);
        return t;
    };
    if snapshot.doses.has_dose(&med.id, occ.date, occ.time) {
        let mut t = Transition::ignored(IgnoreReason::AlreadyTaken);
        t.effects = effects;
        t.registry = Some(registry);
        t.state = OccurrenceState::Resolved;
        return t;
    }

    let seq = match payload.kind() {
        NotificationKind::Snooze => payload.attempt.unwrap_or(0) + 1,
        _ => 1,
    };
    let snooze_id = occ.snooze_id(seq);
    let minutes = policy.snooze_delay.num_minutes();
    let notification = Notification::new(
        &snooze_id,
        format!("Snoozed: {}", med.name),
        format!("Reminding you again in {minutes} minutes."),
        Payload {
            med_name: Some(med.name.clone()),
            ..payload.escalated(NotificationKind::Snooze, &occ, seq)
        },
    );
    effects.push(Effect::Schedule {
        notification,
        trigger: Trigger::once(now + policy.snooze_delay),
    });
    registry.save_entry(snooze_id.clone(), &occ, vec![snooze_id.clone()]);

    Transition {
        outcome: Outcome::Snoozed {
            occurrence: occ.to_string(),
            snooze_id,
            superseded: superseded_count,
        },
        state: OccurrenceState::Escalating { attempt: seq },
        effects,
        doses: None,
        registry: Some(registry),
    }
}

fn followup_notification(
    med: &Medication,
    payload: &Payload,
    occ: &OccurrenceKey,
    attempt: u32,
    policy: &EscalationPolicy,
) -> Notification {
    Notification::new(
        occ.followup_id(attempt),
        format!("Reminder ({attempt}/{}): {}", policy.followup_count, med.name),
        format!("You have not confirmed the {} dose yet.", occ.time),
        Payload {
            med_name: Some(med.name.clone()),
            ..payload.escalated(NotificationKind::Followup, occ, attempt)
        },
    )
}
