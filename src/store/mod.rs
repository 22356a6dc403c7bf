mod progress;
mod sqlite;
mod token;

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use anyhow::Result;

pub use progress::ProgressStore;
pub use sqlite::SqliteStore;
pub use token::TokenStore;

/// String-keyed persistent slots. Both stores sit on top of this so tests
/// and `--ephemeral` runs can swap the SQLite file for a map.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_overwrites_and_removes() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").expect("get"), None);

        store.set("k", "one").expect("set");
        store.set("k", "two").expect("overwrite");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("two"));

        store.remove("k").expect("remove");
        store.remove("k").expect("removing a missing key is fine");
        assert_eq!(store.get("k").expect("get"), None);
    }
}
