#![allow(dead_code)]

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use medremind::core::clock::FixedClock;
use medremind::core::dispatch::Dispatcher;
use medremind::db::Database;
use medremind::models::med::Medication;
use medremind::models::notification::Notification;
use medremind::notify::MemoryNotifier;
use medremind::store::{MedicationStore, MemoryStore};
use tempfile::TempDir;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A local instant in UTC+01:00.
pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
}

/// A medication taken at the given `HH:MM` times, starting on `start`.
pub fn med(name: &str, times: &[&str], start: NaiveDate) -> Medication {
    let times = times.iter().map(|t| t.parse().unwrap()).collect();
    Medication::new(name, times, start)
}

/// Create a temporary database for testing.
pub fn setup_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).unwrap();
    (dir, db)
}

/// In-memory store, recording notifier and a clock that only moves on demand.
pub struct Harness {
    pub store: MemoryStore,
    pub notifier: MemoryNotifier,
    pub clock: FixedClock,
}

impl Harness {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            store: MemoryStore::new(),
            notifier: MemoryNotifier::new(),
            clock: FixedClock::new(now),
        }
    }

    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.store, &self.notifier, &self.clock)
    }

    /// Store `meds` directly, without scheduling anything.
    pub async fn seed(&self, meds: &[Medication]) {
        MedicationStore::new(meds.to_vec())
            .save(&self.store)
            .await
            .unwrap();
    }

    /// Fire a pending trigger as the OS would, returning its notification.
    pub fn fire(&self, id: &str) -> Notification {
        self.notifier
            .fire(id)
            .unwrap_or_else(|| panic!("no pending trigger '{id}'"))
    }
}
