use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::med::DoseTime;
use crate::models::occurrence::OccurrenceKey;

// ---------------------------------------------------------------------------
// NotificationKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Initial,
    Followup,
    Snooze,
    Test,
    /// Anything this engine did not create; ignored by the state machine.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Followup => write!(f, "followup"),
            Self::Snooze => write!(f, "snooze"),
            Self::Test => write!(f, "test"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The opaque `data` bag attached to every notification this engine creates.
///
/// Every field is optional: payloads arrive from outside the process and a
/// malformed one must degrade to a no-op, never to a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NotificationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(rename = "occ_key", default, skip_serializing_if = "Option::is_none")]
    pub occ_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
}

impl Payload {
    pub fn initial(med_id: &str, med_name: &str, time: DoseTime) -> Self {
        Self {
            kind: Some(NotificationKind::Initial),
            med_id: Some(med_id.to_string()),
            med_name: Some(med_name.to_string()),
            time: Some(time.to_string()),
            occ_key: None,
            attempt: None,
        }
    }

    /// Copy of this payload re-labelled for an escalation notification.
    pub fn escalated(&self, kind: NotificationKind, occ: &OccurrenceKey, attempt: u32) -> Self {
        Self {
            kind: Some(kind),
            med_id: Some(occ.med_id.clone()),
            med_name: self.med_name.clone(),
            time: Some(occ.time.to_string()),
            occ_key: Some(occ.to_string()),
            attempt: Some(attempt),
        }
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind.unwrap_or(NotificationKind::Unknown)
    }

    /// The dose time, if present and well formed.
    pub fn dose_time(&self) -> Option<DoseTime> {
        self.time.as_deref().and_then(|t| t.parse().ok())
    }

    /// The explicit occurrence key, if present and well formed.
    pub fn occurrence(&self) -> Option<OccurrenceKey> {
        self.occ_key.as_deref().and_then(|k| k.parse().ok())
    }
}

// ---------------------------------------------------------------------------
// Notification / Trigger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
}

impl Notification {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        data: Payload,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            data: Some(data),
        }
    }

    /// The payload, or an empty one when the notification carried none.
    pub fn payload(&self) -> Payload {
        self.data.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub fire_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub repeat_daily: bool,
}

impl Trigger {
    pub fn once(fire_at: DateTime<FixedOffset>) -> Self {
        Self {
            fire_at,
            repeat_daily: false,
        }
    }

    pub fn daily(fire_at: DateTime<FixedOffset>) -> Self {
        Self {
            fire_at,
            repeat_daily: true,
        }
    }
}

/// A registration currently held by the notification subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTrigger {
    pub notification: Notification,
    pub trigger: Trigger,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Delivered,
    ActionPress,
    Dismissed,
    #[serde(other)]
    Other,
}

impl FromStr for EventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "delivered" => Self::Delivered,
            "action_press" | "action-press" | "press" => Self::ActionPress,
            "dismissed" => Self::Dismissed,
            _ => Self::Other,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Take,
    Snooze,
    Other(String),
}

impl FromStr for Action {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "take" => Self::Take,
            "snooze" => Self::Snooze,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Take => write!(f, "take"),
            Self::Snooze => write!(f, "snooze"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressAction {
    pub id: String,
}

/// What the notification subsystem hands to the dispatcher alongside the
/// event type. Both parts may be missing on malformed events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    #[serde(default)]
    pub notification: Option<Notification>,
    #[serde(default)]
    pub press_action: Option<PressAction>,
}

impl EventDetail {
    pub fn delivered(notification: Notification) -> Self {
        Self {
            notification: Some(notification),
            press_action: None,
        }
    }

    pub fn pressed(notification: Notification, action: &Action) -> Self {
        Self {
            notification: Some(notification),
            press_action: Some(PressAction {
                id: action.to_string(),
            }),
        }
    }

    pub fn action(&self) -> Option<Action> {
        self.press_action
            .as_ref()
            .and_then(|p| p.id.parse::<Action>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_wire_names() {
        let p = Payload {
            occ_key: Some("m__2024-01-01__08:00".into()),
            attempt: Some(2),
            ..Payload::initial("m", "aspirin", "08:00".parse().unwrap())
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["kind"], "initial");
        assert_eq!(v["medId"], "m");
        assert_eq!(v["medName"], "aspirin");
        assert_eq!(v["occ_key"], "m__2024-01-01__08:00");
        assert_eq!(v["attempt"], 2);
    }

    #[test]
    fn payload_tolerates_unknown_kind_and_missing_fields() {
        let p: Payload = serde_json::from_str(r#"{"kind":"promo"}"#).unwrap();
        assert_eq!(p.kind(), NotificationKind::Unknown);
        assert!(p.med_id.is_none());
        let p: Payload = serde_json::from_str("{}").unwrap();
        assert_eq!(p.kind(), NotificationKind::Unknown);
    }

    #[test]
    fn payload_bad_time_is_none() {
        let p = Payload {
            time: Some("later".into()),
            ..Payload::default()
        };
        assert!(p.dose_time().is_none());
        assert!(p.occurrence().is_none());
    }

    #[test]
    fn notification_without_data() {
        let n: Notification = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(n.data.is_none());
        assert_eq!(n.payload(), Payload::default());
    }

    #[test]
    fn event_detail_action_parse() {
        let n = Notification::new("x", "t", "b", Payload::default());
        assert_eq!(EventDetail::pressed(n.clone(), &Action::Take).action(), Some(Action::Take));
        assert_eq!(EventDetail::delivered(n).action(), None);
        assert_eq!(
            "dismiss".parse::<Action>().unwrap(),
            Action::Other("dismiss".into())
        );
    }

    #[test]
    fn event_type_parse() {
        assert_eq!("delivered".parse::<EventType>().unwrap(), EventType::Delivered);
        assert_eq!("press".parse::<EventType>().unwrap(), EventType::ActionPress);
        assert_eq!("wat".parse::<EventType>().unwrap(), EventType::Other);
    }
}
