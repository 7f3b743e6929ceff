use crate::Error;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Key under which the serialized note array is stored.
pub const NOTES_KEY: &str = "notes";
/// Key under which the next id to assign is stored.
pub const ID_KEY: &str = "id";

/// Durable key-value storage scoped to one namespace.
///
/// Implementations apply their namespace to every key, so two stores with
/// different namespaces never see each other's data even when they share a
/// backend. Uses `async_trait` with `?Send` so single-threaded backends can
/// hold non-`Send` state.
#[async_trait::async_trait(?Send)]
pub trait KeyValueStorage {
    /// Read a value. Returns `Ok(None)` if the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Write a value. Failures are reported as [`Error::Persistence`].
    async fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Remove a value. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Check that a namespace is safe to embed in file names and keys.
pub fn validate_namespace(namespace: &str) -> Result<(), Error> {
    if namespace.is_empty() {
        return Err(Error::Validation("namespace cannot be empty".into()));
    }
    if !namespace
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(Error::Validation(format!(
            "namespace may only contain ASCII letters, digits, '-', '_' and '.': {:?}",
            namespace
        )));
    }
    Ok(())
}

/// The fully qualified key for `key` inside `namespace`.
pub fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{}-{}", namespace, key)
}

/// In-memory storage, optionally limited by a byte quota.
///
/// Clones share the same entries, which lets a test drop a store and open a
/// fresh one over the same data to simulate a restart.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
    namespace: String,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new(namespace: &str) -> Result<Self, Error> {
        validate_namespace(namespace)?;
        Ok(Self {
            entries: Rc::new(RefCell::new(BTreeMap::new())),
            namespace: namespace.to_string(),
            quota: None,
        })
    }

    /// Limit the total size in bytes of all keys and values across every
    /// namespace sharing these entries.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// A view of the same entries under a different namespace.
    pub fn scoped(&self, namespace: &str) -> Result<Self, Error> {
        validate_namespace(namespace)?;
        Ok(Self {
            entries: Rc::clone(&self.entries),
            namespace: namespace.to_string(),
            quota: self.quota,
        })
    }

    /// All fully qualified keys currently stored, in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    fn used_bytes(entries: &BTreeMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

#[async_trait::async_trait(?Send)]
impl KeyValueStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let key = namespaced_key(&self.namespace, key);
        Ok(self.entries.borrow().get(&key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = namespaced_key(&self.namespace, key);
        let mut entries = self.entries.borrow_mut();

        if let Some(quota) = self.quota {
            let current = entries.get(&key).map(|v| key.len() + v.len()).unwrap_or(0);
            let needed = Self::used_bytes(&entries) - current + key.len() + value.len();
            if needed > quota {
                return Err(Error::Persistence(format!(
                    "quota exceeded: {} of {} bytes",
                    needed, quota
                )));
            }
        }

        entries.insert(key, value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        let key = namespaced_key(&self.namespace, key);
        self.entries.borrow_mut().remove(&key);
        Ok(())
    }
}
