use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::med::{DoseTime, Medication};

/// A recorded confirmation that a dose was taken. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoseEvent {
    pub id: String,
    pub med_id: String,
    /// Denormalized so history survives medication edits and deletion.
    pub med_name: String,
    pub time: DoseTime,
    pub taken_at: DateTime<Utc>,
}

impl DoseEvent {
    pub fn new(
        med_id: impl Into<String>,
        med_name: impl Into<String>,
        time: DoseTime,
        taken_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            med_id: med_id.into(),
            med_name: med_name.into(),
            time,
            taken_at,
        }
    }

    pub fn for_medication(med: &Medication, time: DoseTime, taken_at: DateTime<Utc>) -> Self {
        Self::new(&med.id, &med.name, time, taken_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn dose_event_json_shape() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 8, 5, 0).unwrap();
        let ev = DoseEvent::new("m1", "aspirin", "08:00".parse().unwrap(), at);
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["medId"], "m1");
        assert_eq!(v["medName"], "aspirin");
        assert_eq!(v["time"], "08:00");
        assert!(v["takenAt"].as_str().unwrap().starts_with("2024-01-01T08:05:00"));
    }
}
