//! The notification subsystem seam.
//!
//! Delivery, presentation and OS timers belong to the host. The engine only
//! registers, cancels and lists triggers, and dismisses displayed alerts.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::notification::{Notification, PendingTrigger, Trigger};

pub use memory::MemoryNotifier;

#[async_trait(?Send)]
pub trait Notifier {
    /// Register (or replace, when the id is already pending) a trigger.
    /// Returns the id the subsystem will report the notification under.
    async fn create_trigger(&self, notification: &Notification, trigger: &Trigger)
    -> Result<String>;

    /// Remove a pending trigger. Unknown ids are a successful no-op.
    async fn cancel_trigger(&self, id: &str) -> Result<()>;

    /// Dismiss a displayed notification. Unknown ids are a successful no-op.
    async fn cancel(&self, id: &str) -> Result<()>;

    async fn list_triggers(&self) -> Result<Vec<PendingTrigger>>;
}
