use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::med::DoseTime;

const SEP: &str = "__";

/// Identity of one expected dose: (medication, calendar date, dose time).
///
/// Canonical text form is `{medId}__{date}__{time}`. Medication ids may
/// themselves contain `__`, so parsing splits from the right.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OccurrenceKey {
    pub med_id: String,
    pub date: NaiveDate,
    pub time: DoseTime,
}

impl OccurrenceKey {
    pub fn new(med_id: impl Into<String>, date: NaiveDate, time: DoseTime) -> Self {
        Self {
            med_id: med_id.into(),
            date,
            time,
        }
    }

    /// Id of the `attempt`-th follow-up notification of this occurrence.
    pub fn followup_id(&self, attempt: u32) -> String {
        format!("{self}{SEP}followup_{attempt}")
    }

    /// Id of the `seq`-th snooze notification of this occurrence.
    pub fn snooze_id(&self, seq: u32) -> String {
        format!("{self}{SEP}snooze_{seq}")
    }
}

impl fmt::Display for OccurrenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEP}{}{SEP}{}",
            self.med_id,
            self.date.format("%Y-%m-%d"),
            self.time
        )
    }
}

impl FromStr for OccurrenceKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::InvalidMedication(format!("malformed occurrence key '{s}'"));
        let mut parts = s.rsplitn(3, SEP);
        let time = parts.next().ok_or_else(bad)?;
        let date = parts.next().ok_or_else(bad)?;
        let med_id = parts.next().filter(|m| !m.is_empty()).ok_or_else(bad)?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| bad())?;
        let time: DoseTime = time.parse().map_err(|_| bad())?;
        Ok(Self::new(med_id, date, time))
    }
}
