pub mod config;
pub mod event;
pub mod med;
pub mod notification;
pub mod occurrence;

pub use event::DoseEvent;
pub use med::{DoseTime, Medication};
pub use notification::{
    Action, EventDetail, EventType, Notification, NotificationKind, Payload, PendingTrigger,
    Trigger,
};
pub use occurrence::OccurrenceKey;
