//! The key-value persistence seam and the typed documents kept behind it.
//!
//! The store itself only knows strings; JSON encoding belongs to this module.
//! Each logical document (medications, dose log, follow-up registry) lives
//! under one key and is rewritten whole on every mutation.

pub mod doses;
pub mod memory;
pub mod meds;
pub mod registry;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

pub use doses::DoseLog;
pub use memory::MemoryStore;
pub use meds::MedicationStore;
pub use registry::{FollowupRegistry, RegistryEntry};

pub mod keys {
    pub const MEDS: &str = "@medremind:meds";
    pub const EVENTS: &str = "@medremind:events";
    pub const FOLLOWUPS: &str = "@medremind:followups";
    pub const SETTINGS: &str = "@medremind:settings";
    pub const LOGS: &str = "@medremind:logs";

    /// Every key removed by a full reset. Logs survive a reset.
    pub const RESETTABLE: [&str; 4] = [MEDS, EVENTS, FOLLOWUPS, SETTINGS];
}

/// String-keyed persistent storage supplied by the host.
///
/// Every call may suspend; nothing is assumed to complete synchronously.
#[async_trait(?Send)]
pub trait KeyValueStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    async fn remove_key(&self, key: &str) -> Result<()>;

    async fn remove_keys(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove_key(key).await?;
        }
        Ok(())
    }
}

/// Read and decode a JSON document, or its default when the key is absent.
pub async fn load_json<T, S>(store: &S, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    match store.get_string(key).await? {
        Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
        _ => Ok(T::default()),
    }
}

/// Encode and write a JSON document, returning once the store has it.
pub async fn save_json<T, S>(store: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set_string(key, &raw).await
}
