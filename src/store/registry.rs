use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::{KeyValueStore, keys, load_json, save_json};
use crate::error::Result;
use crate::models::occurrence::OccurrenceKey;

/// Outstanding escalation notification ids for one link of an occurrence's
/// chain. An occurrence's family is every entry naming it in `occurrence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub med_id: String,
    pub occurrence: String,
    pub ids: Vec<String>,
}

/// Older documents stored a bare id array and relied on key prefixes.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Linked(RegistryEntry),
    Legacy(Vec<String>),
}

fn legacy_occurrence(key: &str) -> String {
    let base = key.split("_snooze").next().unwrap_or(key);
    base.trim_end_matches('_').to_string()
}

fn legacy_med_id(occurrence: &str) -> String {
    match occurrence.parse::<OccurrenceKey>() {
        Ok(occ) => occ.med_id,
        Err(_) => occurrence
            .split("__")
            .next()
            .unwrap_or(occurrence)
            .to_string(),
    }
}

/// Persisted map from entry key to the escalation ids outstanding under it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FollowupRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl<'de> Deserialize<'de> for FollowupRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, StoredEntry>::deserialize(deserializer)?;
        let entries = raw
            .into_iter()
            .map(|(key, stored)| {
                let entry = match stored {
                    StoredEntry::Linked(e) => e,
                    StoredEntry::Legacy(ids) => {
                        let occurrence = legacy_occurrence(&key);
                        RegistryEntry {
                            med_id: legacy_med_id(&occurrence),
                            occurrence,
                            ids,
                        }
                    }
                };
                (key, entry)
            })
            .collect();
        Ok(Self { entries })
    }
}

impl FollowupRegistry {
    pub async fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self> {
        load_json(store, keys::FOLLOWUPS).await
    }

    pub async fn save<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<()> {
        save_json(store, keys::FOLLOWUPS, self).await
    }

    /// Store `ids` under `entry_key`, replacing whatever was there.
    pub fn save_entry(
        &mut self,
        entry_key: impl Into<String>,
        occ: &OccurrenceKey,
        ids: Vec<String>,
    ) {
        self.entries.insert(
            entry_key.into(),
            RegistryEntry {
                med_id: occ.med_id.clone(),
                occurrence: occ.to_string(),
                ids,
            },
        );
    }

    pub fn entry(&self, entry_key: &str) -> Option<&RegistryEntry> {
        self.entries.get(entry_key)
    }

    pub fn has_occurrence(&self, occ: &OccurrenceKey) -> bool {
        let occ = occ.to_string();
        self.entries.values().any(|e| e.occurrence == occ)
    }

    /// Every id outstanding for the occurrence's whole chain.
    pub fn ids_for(&self, occ: &OccurrenceKey) -> Vec<String> {
        let occ = occ.to_string();
        self.entries
            .values()
            .filter(|e| e.occurrence == occ)
            .flat_map(|e| e.ids.iter().cloned())
            .collect()
    }

    /// Drop the occurrence's whole chain, returning the ids it held.
    pub fn remove_occurrence(&mut self, occ: &OccurrenceKey) -> Vec<String> {
        let occ = occ.to_string();
        self.drain_where(|e| e.occurrence == occ)
    }

    /// Drop every chain belonging to a medication, returning the ids held.
    pub fn remove_medication(&mut self, med_id: &str) -> Vec<String> {
        self.drain_where(|e| e.med_id == med_id)
    }

    /// Drop the medication's chains for every occurrence other than `occ`,
    /// returning the ids they held.
    pub fn remove_superseded(&mut self, med_id: &str, occ: &OccurrenceKey) -> Vec<String> {
        let occ = occ.to_string();
        self.drain_where(|e| e.med_id == med_id && e.occurrence != occ)
    }

    /// Swap a requested id for the one the subsystem actually assigned.
    pub fn replace_id(&mut self, old: &str, new: &str) {
        for entry in self.entries.values_mut() {
            for id in entry.ids.iter_mut().filter(|id| id.as_str() == old) {
                *id = new.to_string();
            }
        }
    }

    /// Ids under every entry key starting with `prefix`.
    pub fn get_by_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .flat_map(|(_, e)| e.ids.iter().cloned())
            .collect()
    }

    /// Remove every entry key starting with `prefix`; returns how many went.
    pub fn delete_by_prefix(&mut self, prefix: &str) -> usize {
        let doomed: Vec<String> = self
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for k in &doomed {
            self.entries.remove(k);
        }
        doomed.len()
    }

    /// Drop specific ids wherever they appear; entries left empty go too.
    pub fn forget_ids(&mut self, ids: &[String]) {
        self.entries.retain(|_, e| {
            e.ids.retain(|id| !ids.contains(id));
            !e.ids.is_empty()
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &RegistryEntry)> {
        self.entries.iter()
    }

    fn drain_where(&mut self, pred: impl Fn(&RegistryEntry) -> bool) -> Vec<String> {
        let mut ids = Vec::new();
        self.entries.retain(|_, e| {
            if pred(e) {
                ids.append(&mut e.ids);
                false
            } else {
                true
            }
        });
        ids
    }
}
