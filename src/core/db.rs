use std::collections::HashMap;
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// In-process JSON document store.
///
/// Every record is a JSON document under a string key (`user:{id}`,
/// `post:{id}`, `notification:{id}`, plus index lists such as `users_list`
/// and `feed`). The flat get/set/delete surface is the seam for a real
/// document database; nothing above this module assumes anything richer.
///
/// There is no multi-record transaction. Operations that touch two records
/// (follow edges, like marks) perform two independent writes, so concurrent
/// callers can race and a reader can observe a transient one-sided edge.
/// That limitation is accepted here rather than papered over.
pub struct Store {
    docs: RwLock<HashMap<String, Vec<u8>>>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let docs = self.docs.read().expect("store lock poisoned");
        match docs.get(key) {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(value)?;
        let mut docs = self.docs.write().expect("store lock poisoned");
        docs.insert(key.to_string(), bytes);
        Ok(())
    }

    /// Deleting an absent key is not an error.
    pub fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut docs = self.docs.write().expect("store lock poisoned");
        docs.remove(key);
        Ok(())
    }

    pub fn exists(&self, key: &str) -> bool {
        let docs = self.docs.read().expect("store lock poisoned");
        docs.contains_key(key)
    }

    /// Read an id index list, defaulting to empty when unset.
    pub fn get_list(&self, key: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.get_json::<Vec<String>>(key)?.unwrap_or_default())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete_round_trip() {
        let store = Store::new();
        store.set_json("user:abc", &vec!["x".to_string()]).unwrap();
        let got: Option<Vec<String>> = store.get_json("user:abc").unwrap();
        assert_eq!(got.unwrap(), vec!["x".to_string()]);

        store.delete("user:abc").unwrap();
        assert!(!store.exists("user:abc"));
        // deleting again stays Ok
        store.delete("user:abc").unwrap();
    }

    #[test]
    fn missing_list_reads_empty() {
        let store = Store::new();
        assert!(store.get_list("feed").unwrap().is_empty());
    }
}
