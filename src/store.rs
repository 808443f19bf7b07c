use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::errors::{LendingError, Result};

/// collection names used by the engine
pub mod collections {
    pub const LOANS: &str = "loans";
    pub const WALLETS: &str = "wallets";
    pub const ESCROWS: &str = "escrows";
    pub const SCHEDULES: &str = "schedules";
    pub const TRANSACTIONS: &str = "transactions";
    pub const ROI_MILESTONES: &str = "roi_milestones";
}

/// document persistence keyed by collection and id
pub trait DocumentStore: Send + Sync {
    /// fetch one document
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// insert or overwrite one document
    fn put(&self, collection: &str, id: &str, document: Value) -> Result<()>;

    /// remove one document, reporting whether it existed
    fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    /// all documents whose `field` equals `value`
    fn find_eq(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Value>>;

    /// atomically rewrite one document; `apply` sees the current document
    /// (none if absent) and returns the replacement. an error from `apply`
    /// aborts the update and leaves the document untouched
    fn update(
        &self,
        collection: &str,
        id: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Result<Value>,
    ) -> Result<Value>;
}

/// serialize an entity into its stored document form
pub fn to_document<T: Serialize>(entity: &T) -> Result<Value> {
    Ok(serde_json::to_value(entity)?)
}

/// deserialize an entity out of its stored document form
pub fn from_document<T: DeserializeOwned>(document: Value) -> Result<T> {
    Ok(serde_json::from_value(document)?)
}

type Collections = HashMap<String, BTreeMap<String, Value>>;

/// in-memory document store backed by a single lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>> {
        self.collections.lock().map_err(|_| LendingError::Store {
            message: "store lock poisoned".to_string(),
        })
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn put(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        let mut collections = self.lock()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let mut collections = self.lock()?;
        Ok(collections
            .get_mut(collection)
            .map(|docs| docs.remove(id).is_some())
            .unwrap_or(false))
    }

    fn find_eq(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Value>> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| doc.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Result<Value>,
    ) -> Result<Value> {
        // the lock spans read and write, so the rewrite is atomic
        let mut collections = self.lock()?;
        let docs = collections.entry(collection.to_string()).or_default();
        let current = docs.get(id).cloned();
        let replacement = apply(current)?;
        docs.insert(id.to_string(), replacement.clone());
        Ok(replacement)
    }
}
