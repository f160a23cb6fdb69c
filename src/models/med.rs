use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// DoseTime
// ---------------------------------------------------------------------------

/// A local wall-clock time of day at which a dose is expected, `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DoseTime {
    hour: u8,
    minute: u8,
}

impl DoseTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(Error::InvalidTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // Both fields are range-checked on construction.
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// Compact form used inside notification ids (`08:30` -> `0830`).
    pub fn compact(&self) -> String {
        format!("{:02}{:02}", self.hour, self.minute)
    }
}

static DOSE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}):(\d{2})$").expect("valid regex"));

impl FromStr for DoseTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = DOSE_TIME_RE
            .captures(s.trim())
            .ok_or_else(|| Error::InvalidTime(s.to_string()))?;
        let hour: u8 = caps[1]
            .parse()
            .map_err(|_| Error::InvalidTime(s.to_string()))?;
        let minute: u8 = caps[2]
            .parse()
            .map_err(|_| Error::InvalidTime(s.to_string()))?;
        Self::new(hour, minute).map_err(|_| Error::InvalidTime(s.to_string()))
    }
}

impl fmt::Display for DoseTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for DoseTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DoseTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Interval expansion
// ---------------------------------------------------------------------------

/// Expand an interval schedule into fixed dose times.
///
/// Starting at `start`, keeps adding `interval_hours` while the hour stays
/// below 24. Minutes are carried unchanged. A zero interval yields nothing.
pub fn generate_times(interval_hours: u32, start: DoseTime) -> Vec<DoseTime> {
    if interval_hours == 0 {
        return Vec::new();
    }
    let mut times = Vec::new();
    let mut hour = u32::from(start.hour);
    while hour < 24 {
        times.push(DoseTime {
            hour: hour as u8,
            minute: start.minute,
        });
        hour += interval_hours;
    }
    times
}

/// Parse a comma-separated list of `HH:MM` times, skipping blanks.
pub fn parse_times_csv(input: &str) -> Result<Vec<DoseTime>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(DoseTime::from_str)
        .collect()
}

// ---------------------------------------------------------------------------
// Medication
// ---------------------------------------------------------------------------

pub const DEFAULT_ICON: &str = "pill";
pub const DEFAULT_COLOR: &str = "#4f46e5";

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

/// A medication definition: the schedule source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub times: Vec<DoseTime>,
    #[serde(default)]
    pub interval_hours: Option<u32>,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub pause_days: u32,
}

impl Medication {
    /// Create a medication taken at fixed times, starting on `start_date`.
    pub fn new(name: impl Into<String>, times: Vec<DoseTime>, start_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            times,
            interval_hours: None,
            icon: default_icon(),
            color: default_color(),
            start_date,
            end_date: None,
            pause_days: 0,
        }
    }

    /// Create a medication whose times are generated from an interval.
    pub fn with_interval(
        name: impl Into<String>,
        interval_hours: u32,
        first_dose: DoseTime,
        start_date: NaiveDate,
    ) -> Result<Self> {
        if interval_hours == 0 {
            return Err(Error::InvalidMedication(
                "interval must be a positive number of hours".to_string(),
            ));
        }
        let mut med = Self::new(name, generate_times(interval_hours, first_dose), start_date);
        med.interval_hours = Some(interval_hours);
        Ok(med)
    }

    /// Check the construction invariants: a name and at least one dose time.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidMedication("name must not be empty".to_string()));
        }
        if self.times.is_empty() {
            return Err(Error::InvalidMedication(format!(
                "'{}' has no dose times",
                self.name
            )));
        }
        if let Some(end) = self.end_date
            && end < self.start_date
        {
            return Err(Error::InvalidMedication(format!(
                "end date {end} is before start date {}",
                self.start_date
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
