use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use super::Notifier;
use crate::error::{Error, Result};
use crate::models::notification::{Notification, PendingTrigger, Trigger};

/// An in-process notifier that records every request it receives.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    pending: RefCell<BTreeMap<String, PendingTrigger>>,
    created: RefCell<Vec<String>>,
    cancelled: RefCell<Vec<String>>,
    dismissed: RefCell<Vec<String>>,
    fail_creates: Cell<bool>,
    fail_cancels: Cell<bool>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.set(fail);
    }

    pub fn set_fail_cancels(&self, fail: bool) {
        self.fail_cancels.set(fail);
    }

    pub fn pending(&self) -> Vec<PendingTrigger> {
        self.pending.borrow().values().cloned().collect()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.pending.borrow().keys().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<PendingTrigger> {
        self.pending.borrow().get(id).cloned()
    }

    /// Every id passed to `create_trigger`, in call order.
    pub fn created(&self) -> Vec<String> {
        self.created.borrow().clone()
    }

    /// Every id passed to `cancel_trigger`, in call order.
    pub fn cancel_requests(&self) -> Vec<String> {
        self.cancelled.borrow().clone()
    }

    /// Every id passed to `cancel`, in call order.
    pub fn dismissed(&self) -> Vec<String> {
        self.dismissed.borrow().clone()
    }

    /// Simulate a one-shot trigger firing: it stops being pending and its
    /// notification is handed back for delivery.
    pub fn fire(&self, id: &str) -> Option<Notification> {
        let mut pending = self.pending.borrow_mut();
        let fired = pending.get(id)?.clone();
        if !fired.trigger.repeat_daily {
            pending.remove(id);
        }
        Some(fired.notification)
    }
}

#[async_trait(?Send)]
impl Notifier for MemoryNotifier {
    async fn create_trigger(
        &self,
        notification: &Notification,
        trigger: &Trigger,
    ) -> Result<String> {
        if self.fail_creates.get() {
            return Err(Error::Notifier(format!(
                "could not register '{}'",
                notification.id
            )));
        }
        self.created.borrow_mut().push(notification.id.clone());
        self.pending.borrow_mut().insert(
            notification.id.clone(),
            PendingTrigger {
                notification: notification.clone(),
                trigger: trigger.clone(),
            },
        );
        Ok(notification.id.clone())
    }

    async fn cancel_trigger(&self, id: &str) -> Result<()> {
        self.cancelled.borrow_mut().push(id.to_string());
        if self.fail_cancels.get() {
            return Err(Error::Notifier(format!("could not cancel '{id}'")));
        }
        self.pending.borrow_mut().remove(id);
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        self.dismissed.borrow_mut().push(id.to_string());
        if self.fail_cancels.get() {
            return Err(Error::Notifier(format!("could not dismiss '{id}'")));
        }
        Ok(())
    }

    async fn list_triggers(&self) -> Result<Vec<PendingTrigger>> {
        Ok(self.pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::Payload;
    use chrono::{FixedOffset, TimeZone};

    fn trigger(repeat: bool) -> Trigger {
        let at = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
            .unwrap();
        Trigger {
            fire_at: at,
            repeat_daily: repeat,
        }
    }

    #[tokio::test]
    async fn same_id_replaces() {
        let n = MemoryNotifier::new();
        let note = Notification::new("a", "t", "b", Payload::default());
        n.create_trigger(&note, &trigger(false)).await.unwrap();
        n.create_trigger(&note, &trigger(true)).await.unwrap();
        assert_eq!(n.pending().len(), 1);
        assert!(n.get("a").unwrap().trigger.repeat_daily);
    }

    #[tokio::test]
    async fn cancel_unknown_is_ok() {
        let n = MemoryNotifier::new();
        n.cancel_trigger("ghost").await.unwrap();
        n.cancel("ghost").await.unwrap();
        assert_eq!(n.cancel_requests(), vec!["ghost"]);
        assert_eq!(n.dismissed(), vec!["ghost"]);
    }

    #[tokio::test]
    async fn fire_keeps_repeating_triggers() {
        let n = MemoryNotifier::new();
        let once = Notification::new("once", "t", "b", Payload::default());
        let daily = Notification::new("daily", "t", "b", Payload::default());
        n.create_trigger(&once, &trigger(false)).await.unwrap();
        n.create_trigger(&daily, &trigger(true)).await.unwrap();
        assert!(n.fire("once").is_some());
        assert!(n.fire("daily").is_some());
        assert_eq!(n.pending_ids(), vec!["daily"]);
        assert!(n.fire("once").is_none());
    }
}
