use super::{KeyValueStore, keys, load_json, save_json};
use crate::error::{Error, Result};
use crate::models::med::Medication;

/// The persisted list of medication definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicationStore {
    meds: Vec<Medication>,
}

impl MedicationStore {
    pub fn new(meds: Vec<Medication>) -> Self {
        Self { meds }
    }

    pub async fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self> {
        let meds: Vec<Medication> = load_json(store, keys::MEDS).await?;
        Ok(Self { meds })
    }

    pub async fn save<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<()> {
        save_json(store, keys::MEDS, &self.meds).await
    }

    pub fn all(&self) -> &[Medication] {
        &self.meds
    }

    pub fn find(&self, id: &str) -> Option<&Medication> {
        self.meds.iter().find(|m| m.id == id)
    }

    /// Look up by id first, then by case-insensitive name.
    pub fn resolve(&self, id_or_name: &str) -> Result<&Medication> {
        self.find(id_or_name)
            .or_else(|| {
                self.meds
                    .iter()
                    .find(|m| m.name.eq_ignore_ascii_case(id_or_name))
            })
            .ok_or_else(|| Error::MedicationNotFound(id_or_name.to_string()))
    }

    /// Append a new medication or replace the one with the same id.
    pub fn upsert(&mut self, med: Medication) {
        match self.meds.iter_mut().find(|m| m.id == med.id) {
            Some(existing) => *existing = med,
            None => self.meds.push(med),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Medication> {
        let idx = self.meds.iter().position(|m| m.id == id)?;
        Some(self.meds.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.meds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meds.is_empty()
    }
}
