use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::med::Medication;

/// Why a medication is or is not due on a given calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DueStatus {
    Due,
    NotStarted { starts: NaiveDate },
    Ended { ended: NaiveDate },
    /// A rest day of the dose/pause cycle.
    CycleRest { next_due: NaiveDate },
}

impl DueStatus {
    pub fn is_due(&self) -> bool {
        matches!(self, Self::Due)
    }
}

/// Classify `date` against the medication's bounds and dose/pause cycle.
///
/// Dates are calendar values; no time of day takes part in the arithmetic.
pub fn due_status(med: &Medication, date: NaiveDate) -> DueStatus {
    if date < med.start_date {
        return DueStatus::NotStarted {
            starts: med.start_date,
        };
    }
    if let Some(end) = med.end_date
        && date > end
    {
        return DueStatus::Ended { ended: end };
    }
    if med.pause_days == 0 {
        return DueStatus::Due;
    }

    let diff_days = (date - med.start_date).num_days();
    let cycle = 1 + i64::from(med.pause_days);
    let day_in_cycle = diff_days.rem_euclid(cycle);
    if day_in_cycle == 0 {
        DueStatus::Due
    } else {
        DueStatus::CycleRest {
            next_due: date + Duration::days(cycle - day_in_cycle),
        }
    }
}

/// Whether a dose of `med` is due on `date`.
pub fn is_due(med: &Medication, date: NaiveDate) -> bool {
    due_status(med, date).is_due()
}
