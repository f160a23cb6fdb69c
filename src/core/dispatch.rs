//! The event dispatcher: one handler, two entry points.
//!
//! A foreground process and a process woken only to handle one event share
//! no memory, so every invocation reloads the persisted documents, runs the
//! pure state machine, carries out its requests and writes back before it
//! returns.

use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::core::clock::Clock;
use crate::core::escalation::{
    self, Effect, EngineEvent, EscalationPolicy, Outcome, Snapshot, Transition,
};
use crate::error::{Error, Result};
use crate::models::notification::{EventDetail, EventType};
use crate::notify::Notifier;
use crate::store::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Context {
    Foreground,
    Background,
}

/// What a dispatch produced. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Handled { outcome: Outcome },
    Failed { error: String },
}

impl DispatchOutcome {
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Self::Handled { outcome } => Some(outcome),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

pub struct Dispatcher<'a> {
    store: &'a dyn KeyValueStore,
    notifier: &'a dyn Notifier,
    clock: &'a dyn Clock,
    policy: EscalationPolicy,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        store: &'a dyn KeyValueStore,
        notifier: &'a dyn Notifier,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            policy: EscalationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: EscalationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Entry point for a live, foregrounded process.
    pub async fn on_foreground_event(
        &self,
        event_type: EventType,
        detail: EventDetail,
    ) -> DispatchOutcome {
        self.on_notification_event(Context::Foreground, event_type, detail)
            .await
    }

    /// Entry point for a process woken solely to handle this event.
    pub async fn on_background_event(
        &self,
        event_type: EventType,
        detail: EventDetail,
    ) -> DispatchOutcome {
        self.on_notification_event(Context::Background, event_type, detail)
            .await
    }

    pub async fn on_notification_event(
        &self,
        context: Context,
        event_type: EventType,
        detail: EventDetail,
    ) -> DispatchOutcome {
        let notification_id = detail
            .notification
            .as_ref()
            .map(|n| n.id.clone())
            .unwrap_or_default();
        let span = info_span!("dispatch", ?context, ?event_type, id = %notification_id);

        let result = async {
            debug!("event received");
            let Some(event) = EngineEvent::from_parts(event_type, detail) else {
                debug!("nothing to act on");
                return Ok(Outcome::Ignored {
                    reason: escalation::IgnoreReason::Unrecognized,
                });
            };
            self.submit(event).await
        }
        .instrument(span.clone())
        .await;

        let _entered = span.enter();
        match result {
            Ok(outcome) => DispatchOutcome::Handled { outcome },
            Err(e) => {
                error!(error = %e, "event handling failed");
                DispatchOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Run one event through the state machine against freshly loaded
    /// state. Unlike the entry points, errors propagate to the caller.
    pub async fn submit(&self, event: EngineEvent) -> Result<Outcome> {
        let snapshot = Snapshot::load(self.store).await?;
        let now = self.clock.now();
        let transition = escalation::transition(&snapshot, &event, now, &self.policy);
        self.apply(transition).await
    }

    async fn apply(&self, transition: Transition) -> Result<Outcome> {
        let Transition {
            outcome,
            state,
            effects,
            doses,
            mut registry,
        } = transition;

        let mut unscheduled = Vec::new();
        let mut assigned = Vec::new();
        for effect in &effects {
            match effect {
                Effect::Schedule {
                    notification,
                    trigger,
                } => match self.notifier.create_trigger(notification, trigger).await {
                    Ok(id) if id != notification.id => {
                        debug!(requested = %notification.id, %id, "subsystem assigned its own id");
                        assigned.push((notification.id.clone(), id));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(id = %notification.id, error = %e, "could not schedule");
                        unscheduled.push(notification.id.clone());
                    }
                },
                Effect::CancelTrigger(id) => {
                    if let Err(e) = self.notifier.cancel_trigger(id).await {
                        warn!(%id, error = %e, "cancel failed; it may still fire");
                    }
                }
                Effect::Dismiss(id) => {
                    if let Err(e) = self.notifier.cancel(id).await {
                        warn!(%id, error = %e, "dismiss failed");
                    }
                }
            }
        }

        if let Some(reg) = registry.as_mut() {
            for (requested, id) in &assigned {
                reg.replace_id(requested, id);
            }
            if !unscheduled.is_empty() {
                reg.forget_ids(&unscheduled);
            }
        }
        if let Some(doses) = &doses {
            doses.save(self.store).await?;
        }
        if let Some(reg) = &registry {
            reg.save(self.store).await?;
        }

        if !unscheduled.is_empty() {
            return Err(Error::Notifier(format!(
                "{} notification(s) could not be scheduled",
                unscheduled.len()
            )));
        }

        match &outcome {
            Outcome::Ignored { reason } => debug!(?reason, "ignored"),
            Outcome::NotDue { occurrence, .. } => {
                warn!(%occurrence, "dose acknowledged on a day it is not due")
            }
            other => info!(?state, outcome = ?other, "handled"),
        }
        Ok(outcome)
    }
}
