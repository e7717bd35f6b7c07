//! Single source of truth for the guest list.
//!
//! The whole collection lives as one JSON document under [`CONTACTS_KEY`].
//! Every mutation reads the full document, changes it, and writes it back.
//! There is no locking: two processes sharing a store file race and the last
//! writer wins.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::contact::{assign_missing_ids, is_valid_intimacy, Contact, ContactPatch};

pub const CONTACTS_KEY: &str = "contacts";
/// Transient position handed from the results view to the review view.
pub const CURSOR_KEY: &str = "currentContactIndex";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored contact data is malformed: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("contact {} does not exist (have {len})", .index + 1)]
    IndexOutOfRange { index: usize, len: usize },
    #[error("intimacy must be a number from 1 to 5, got {0:?}")]
    InvalidIntimacy(String),
    #[error("storage backend failed: {0:#}")]
    Backend(anyhow::Error),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Backend(err)
    }
}

/// Minimal string slot storage the contact store is layered on.
pub trait KeyValue {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn put(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn delete(&mut self, key: &str) -> anyhow::Result<()>;
}

/// In-process slot storage, used by tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryKv {
    slots: HashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValue for MemoryKv {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        self.slots.remove(key);
        Ok(())
    }
}

/// Capability interface every view goes through.
pub trait ContactStore {
    /// Parse the stored collection, or an empty one if nothing is stored.
    fn load(&mut self) -> Result<Vec<Contact>, StoreError>;
    /// Replace the whole collection.
    fn replace_all(&mut self, contacts: &[Contact]) -> Result<(), StoreError>;
    /// Patch one record by 0-based index and persist the whole collection.
    fn update_at(&mut self, index: usize, patch: &ContactPatch) -> Result<Contact, StoreError>;
    /// Drop the collection and any pending handoff.
    fn clear(&mut self) -> Result<(), StoreError>;
    /// The stored document verbatim.
    fn raw(&self) -> Result<Option<String>, StoreError>;
    fn set_cursor(&mut self, index: usize) -> Result<(), StoreError>;
    /// Read and forget the pending handoff position.
    fn take_cursor(&mut self) -> Result<Option<usize>, StoreError>;
}

/// [`ContactStore`] over any [`KeyValue`] backend.
pub struct SlotStore<K: KeyValue> {
    kv: K,
}

impl<K: KeyValue> SlotStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn backend(&self) -> &K {
        &self.kv
    }

    fn write(&mut self, contacts: &[Contact]) -> Result<(), StoreError> {
        let blob = serde_json::to_string(contacts).map_err(StoreError::Corrupt)?;
        self.kv.put(CONTACTS_KEY, &blob)?;
        Ok(())
    }
}

impl<K: KeyValue> ContactStore for SlotStore<K> {
    fn load(&mut self) -> Result<Vec<Contact>, StoreError> {
        let Some(raw) = self.kv.get(CONTACTS_KEY)? else {
            return Ok(Vec::new());
        };
        let mut contacts: Vec<Contact> =
            serde_json::from_str(&raw).map_err(StoreError::Corrupt)?;

        let assigned = assign_missing_ids(&mut contacts);
        if assigned > 0 {
            debug!(assigned, "assigned ids to stored contacts");
            self.write(&contacts)?;
        }
        Ok(contacts)
    }

    fn replace_all(&mut self, contacts: &[Contact]) -> Result<(), StoreError> {
        let mut contacts = contacts.to_vec();
        assign_missing_ids(&mut contacts);
        self.write(&contacts)?;
        self.kv.delete(CURSOR_KEY)?;
        info!(count = contacts.len(), "replaced contact list");
        Ok(())
    }

    fn update_at(&mut self, index: usize, patch: &ContactPatch) -> Result<Contact, StoreError> {
        if let Some(value) = patch.intimacy.as_deref().filter(|v| !v.is_empty()) {
            if !is_valid_intimacy(value) {
                return Err(StoreError::InvalidIntimacy(value.to_string()));
            }
        }

        let mut contacts = self.load()?;
        let len = contacts.len();
        let contact = contacts
            .get_mut(index)
            .ok_or(StoreError::IndexOutOfRange { index, len })?;

        if contact.apply(patch) {
            let updated = contact.clone();
            self.write(&contacts)?;
            debug!(index, id = %updated.id, "updated contact");
            Ok(updated)
        } else {
            Ok(contact.clone())
        }
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.kv.delete(CONTACTS_KEY)?;
        self.kv.delete(CURSOR_KEY)?;
        info!("cleared contact list");
        Ok(())
    }

    fn raw(&self) -> Result<Option<String>, StoreError> {
        Ok(self.kv.get(CONTACTS_KEY)?)
    }

    fn set_cursor(&mut self, index: usize) -> Result<(), StoreError> {
        self.kv.put(CURSOR_KEY, &index.to_string())?;
        Ok(())
    }

    fn take_cursor(&mut self) -> Result<Option<usize>, StoreError> {
        let Some(raw) = self.kv.get(CURSOR_KEY)? else {
            return Ok(None);
        };
        self.kv.delete(CURSOR_KEY)?;
        match raw.trim().parse::<usize>() {
            Ok(index) => Ok(Some(index)),
            Err(_) => {
                warn!(value = %raw, "ignoring malformed handoff index");
                Ok(None)
            }
        }
    }
}
