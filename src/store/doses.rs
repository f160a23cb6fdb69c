use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{KeyValueStore, keys, load_json, save_json};
use crate::error::Result;
use crate::models::event::DoseEvent;
use crate::models::med::DoseTime;

/// Append-only log of taken doses, keyed by calendar date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoseLog {
    days: BTreeMap<NaiveDate, Vec<DoseEvent>>,
}

impl DoseLog {
    pub async fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self> {
        load_json(store, keys::EVENTS).await
    }

    pub async fn save<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<()> {
        save_json(store, keys::EVENTS, self).await
    }

    pub fn record(&mut self, date: NaiveDate, event: DoseEvent) {
        self.days.entry(date).or_default().push(event);
    }

    pub fn on(&self, date: NaiveDate) -> &[DoseEvent] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the dose (medication, date, time) has already been recorded.
    pub fn has_dose(&self, med_id: &str, date: NaiveDate, time: DoseTime) -> bool {
        self.on(date)
            .iter()
            .any(|e| e.med_id == med_id && e.time == time)
    }

    pub fn total(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.days.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn record_appends_per_date() {
        let mut log = DoseLog::default();
        let t: DoseTime = "08:00".parse().unwrap();
        log.record(day(1), DoseEvent::new("m", "a", t, Utc::now()));
        log.record(day(1), DoseEvent::new("n", "b", t, Utc::now()));
        log.record(day(2), DoseEvent::new("m", "a", t, Utc::now()));
        assert_eq!(log.on(day(1)).len(), 2);
        assert_eq!(log.on(day(3)).len(), 0);
        assert_eq!(log.total(), 3);
        assert!(log.has_dose("m", day(2), t));
        assert!(!log.has_dose("n", day(2), t));
    }

    #[test]
    fn json_keys_are_date_strings() {
        let mut log = DoseLog::default();
        log.record(
            day(5),
            DoseEvent::new("m", "a", "08:00".parse().unwrap(), Utc::now()),
        );
        let v = serde_json::to_value(&log).unwrap();
        assert!(v["2024-01-05"].is_array());
    }
}
