//! ==============================================================================
//! store.rs - persistent key-value slot and the credential store on top of it
//! ==============================================================================
//!
//! purpose:
//!     keeps the single bearer token between runs. the key-value layer is a
//!     trait so tests and ephemeral runs can use memory, while the cli uses a
//!     json file on disk.
//!
//! relationships:
//!     - used by: api.rs (load before protected calls)
//!     - used by: workflow/session.rs (save on login, clear on logout)
//!
//! ==============================================================================

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::domain::Credential;
use crate::error::ClientError;

/// key the token is stored under
pub const TOKEN_KEY: &str = "token";

pub trait KeyValueStore: Send + Sync {
    fn set_item(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn get_item(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn remove_item(&self, key: &str) -> Result<(), ClientError>;
}

// ==============================================================================
// in-memory store
// ==============================================================================

#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_items<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> T,
    ) -> Result<T, ClientError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| ClientError::Storage("memory store lock poisoned".to_string()))?;
        Ok(f(&mut items))
    }
}

impl KeyValueStore for MemoryStore {
    fn set_item(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.with_items(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.with_items(|items| items.get(key).cloned())
    }

    fn remove_item(&self, key: &str) -> Result<(), ClientError> {
        self.with_items(|items| {
            items.remove(key);
        })
    }
}

// ==============================================================================
// json file store
// ==============================================================================
// the whole map is rewritten on every change. writes go to a sibling temp
// file first and are renamed into place so a crash never leaves half a file.

pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, ClientError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(ClientError::Storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            ClientError::Storage(format!("corrupt store {}: {}", self.path.display(), e))
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), ClientError> {
        let storage_err = |e: std::io::Error| {
            ClientError::Storage(format!("failed to write {}: {}", self.path.display(), e))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let body = serde_json::to_string_pretty(map)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body).map_err(storage_err)?;
        std::fs::rename(&tmp, &self.path).map_err(storage_err)
    }

    fn update(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), ClientError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| ClientError::Storage("file store lock poisoned".to_string()))?;
        let mut map = self.read_map()?;
        f(&mut map);
        self.write_map(&map)
    }
}

impl KeyValueStore for FileStore {
    fn set_item(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.read_map()?.remove(key))
    }

    fn remove_item(&self, key: &str) -> Result<(), ClientError> {
        self.update(|map| {
            map.remove(key);
        })
    }
}

// ==============================================================================
// credential store
// ==============================================================================

/// the single token slot, injected into the api client and workflows
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// overwrite whatever token is stored
    pub fn save(&self, token: &str) -> Result<(), ClientError> {
        self.backend.set_item(TOKEN_KEY, token)?;
        tracing::debug!("credential saved");
        Ok(())
    }

    pub fn load(&self) -> Result<Option<Credential>, ClientError> {
        Ok(self
            .backend
            .get_item(TOKEN_KEY)?
            .filter(|token| !token.is_empty())
            .map(Credential::new))
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        self.backend.remove_item(TOKEN_KEY)?;
        tracing::debug!("credential cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_returns_the_same_token() {
        let store = CredentialStore::in_memory();
        assert_eq!(store.load().expect("load"), None);

        store.save("abc").expect("save");
        assert_eq!(store.load().expect("load"), Some(Credential::new("abc")));
    }

    #[test]
    fn later_save_wins() {
        let store = CredentialStore::in_memory();
        store.save("first").expect("save");
        store.save("second").expect("save");
        assert_eq!(store.load().expect("load").expect("present").as_str(), "second");
    }

    #[test]
    fn clear_empties_the_slot_and_is_idempotent() {
        let store = CredentialStore::in_memory();
        store.save("abc").expect("save");
        store.clear().expect("clear");
        store.clear().expect("clear twice");
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("store.json");

        CredentialStore::new(Arc::new(FileStore::new(&path)))
            .save("persisted")
            .expect("save");

        let reopened = CredentialStore::new(Arc::new(FileStore::new(&path)));
        assert_eq!(
            reopened.load().expect("load").expect("present").as_str(),
            "persisted"
        );
    }

    #[test]
    fn file_store_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let kv = FileStore::new(dir.path().join("store.json"));
        kv.set_item("theme", "dark").expect("set");
        kv.set_item(TOKEN_KEY, "t").expect("set");
        kv.remove_item(TOKEN_KEY).expect("remove");

        assert_eq!(kv.get_item("theme").expect("get").as_deref(), Some("dark"));
        assert_eq!(kv.get_item(TOKEN_KEY).expect("get"), None);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let kv = FileStore::new(dir.path().join("absent.json"));
        assert_eq!(kv.get_item(TOKEN_KEY).expect("get"), None);
    }

    #[test]
    fn corrupt_file_fails_loudly() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").expect("write");

        let err = FileStore::new(&path).get_item(TOKEN_KEY).expect_err("corrupt");
        assert!(matches!(err, ClientError::Storage(_)));
    }
}
