//! Bounded in-process log journal, persisted under the logs key.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::error::Result;
use crate::store::{KeyValueStore, keys, load_json, save_json};

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl LogEntry {
    pub fn new(level: Level, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: level.as_str().to_string(),
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JournalStats {
    pub total: usize,
    pub by_level: BTreeMap<String, usize>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Cloneable handle to a ring buffer of recent entries, newest first.
#[derive(Debug, Clone)]
pub struct LogJournal {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl Default for LogJournal {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogJournal {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, entry: LogEntry) {
        let mut entries = self.lock();
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Entries at exactly `level` (case-insensitive).
    pub fn filter_level(&self, level: &str) -> Vec<LogEntry> {
        self.lock()
            .iter()
            .filter(|e| e.level.eq_ignore_ascii_case(level))
            .cloned()
            .collect()
    }

    /// Entries whose message, target or field values contain `term`,
    /// ignoring case.
    pub fn search(&self, term: &str) -> Vec<LogEntry> {
        let needle = term.to_lowercase();
        self.lock()
            .iter()
            .filter(|e| {
                e.message.to_lowercase().contains(&needle)
                    || e.target.to_lowercase().contains(&needle)
                    || e.fields.values().any(|v| v.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> JournalStats {
        let entries = self.lock();
        let mut by_level = BTreeMap::new();
        for e in entries.iter() {
            *by_level.entry(e.level.clone()).or_insert(0) += 1;
        }
        JournalStats {
            total: entries.len(),
            by_level,
            newest: entries.front().map(|e| e.timestamp),
            oldest: entries.back().map(|e| e.timestamp),
        }
    }

    /// Restore persisted entries behind whatever this process has already
    /// recorded.
    pub async fn load<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<usize> {
        let stored: Vec<LogEntry> = load_json(store, keys::LOGS).await?;
        let mut entries = self.lock();
        let room = self.capacity.saturating_sub(entries.len());
        let restored = stored.len().min(room);
        entries.extend(stored.into_iter().take(room));
        Ok(restored)
    }

    pub async fn flush<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<()> {
        let snapshot = self.entries();
        save_json(store, keys::LOGS, &snapshot).await
    }

    /// Empty the buffer and its persisted copy.
    pub async fn clear<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<()> {
        self.lock().clear();
        store.remove_key(keys::LOGS).await
    }
}

// ---------------------------------------------------------------------------
// tracing layer
// ---------------------------------------------------------------------------

/// Feeds every event that passes its filter into a [`LogJournal`].
pub struct JournalLayer {
    journal: LogJournal,
}

impl JournalLayer {
    pub fn new(journal: LogJournal) -> Self {
        Self { journal }
    }
}

#[derive(Default)]
struct EntryVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl Visit for EntryVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for JournalLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        let mut entry = LogEntry::new(*meta.level(), meta.target(), visitor.message);
        entry.fields = visitor.fields;
        self.journal.record(entry);
    }
}
