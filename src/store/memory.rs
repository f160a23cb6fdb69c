use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use super::KeyValueStore;
use crate::error::{Error, Result};

/// A process-local `KeyValueStore`.
///
/// Useful for hosts without durable storage and for tests; writes can be
/// made to fail to exercise the transient-failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RefCell<HashMap<String, String>>,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Raw stored string for `key`, bypassing the async interface.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.data.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if self.fail_writes.get() {
            return Err(Error::Storage(format!("write to '{key}' rejected")));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.borrow().get(key).cloned())
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable(key)?;
        self.data
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_key(&self, key: &str) -> Result<()> {
        self.check_writable(key)?;
        self.data.borrow_mut().remove(key);
        Ok(())
    }
}
