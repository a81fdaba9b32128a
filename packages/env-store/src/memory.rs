//! In-memory store.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{StoreError, VarReader, VarWriter};

/// A private key-value map with the same interface as the process
/// environment.
///
/// Useful in tests (no cross-test interference through the real environment)
/// and for programs that want to bind records to configuration gathered from
/// somewhere else.
///
/// Serializes as a flat JSON object, so fixtures can be loaded with serde:
///
/// ```rust
/// use envio_store::{MemoryEnv, VarReader};
///
/// let store: MemoryEnv = serde_json::from_str(r#"{"APP_PORT": "8080"}"#).unwrap();
/// assert_eq!(store.read("APP_PORT").unwrap(), Some("8080".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct MemoryEnv {
    vars: RwLock<BTreeMap<String, String>>,
}

impl MemoryEnv {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            vars: RwLock::new(vars),
        }
    }

    /// Copy of the current contents, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.vars().clone()
    }

    pub fn len(&self) -> usize {
        self.vars().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars().contains_key(key)
    }

    // The map stays consistent across a panicking writer (single insert or
    // remove), so poisoning is ignored.
    fn vars(&self) -> RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.vars.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn vars_mut(&self) -> RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.vars.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VarReader for MemoryEnv {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.vars().get(key).cloned())
    }

    fn read_into(&self, key: &str, buf: &mut String) -> Result<bool, StoreError> {
        match self.vars().get(key) {
            Some(value) => {
                buf.push_str(value);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl VarWriter for MemoryEnv {
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::invalid_key(key, "empty key"));
        }
        tracing::trace!(key, "writing variable");
        self.vars_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.vars_mut().remove(key);
        Ok(())
    }
}

impl Clone for MemoryEnv {
    fn clone(&self) -> Self {
        Self {
            vars: RwLock::new(self.snapshot()),
        }
    }
}

impl Serialize for MemoryEnv {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.vars().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MemoryEnv {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let vars = BTreeMap::<String, String>::deserialize(deserializer)?;
        Ok(Self {
            vars: RwLock::new(vars),
        })
    }
}
