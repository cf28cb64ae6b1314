//! Persistent key-value storage for client state (session token, profile,
//! user-edited soil metrics). Writers do not coordinate: last write wins.

use std::{collections::HashMap, fmt::Debug, fs, path::PathBuf};

use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{ClientError, ClientResult};

pub const KEY_USER_PROFILE: &str = "userProfile";
pub const KEY_AUTH_TOKEN: &str = "auth_token";
pub const KEY_TOKEN: &str = "token";
pub const KEY_SOIL_METRICS: &str = "userSoilMetrics";
pub const KEY_USER: &str = "user";

pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;
}

/// Read a JSON-serialized record.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> ClientResult<Option<T>> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| ClientError::Storage(format!("invalid JSON under '{key}': {e}"))),
        None => Ok(None),
    }
}

pub fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> ClientResult<()> {
    let raw = serde_json::to_string(value)
        .map_err(|e| ClientError::Storage(format!("failed to serialize '{key}': {e}")))?;
    store.set(key, &raw)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// All keys in one JSON object file. The whole file is rewritten on every
/// mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    /// Store in the platform data directory.
    pub fn open_default() -> ClientResult<Self> {
        let dirs = crate::config::project_dirs().map_err(|e| ClientError::Storage(e.to_string()))?;
        Ok(Self::new(dirs.data_dir().join("storage.json")))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_all(&self) -> ClientResult<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| ClientError::Storage(format!("failed to read {}: {e}", self.path.display())))?;

        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&contents)
            .map_err(|e| ClientError::Storage(format!("failed to parse {}: {e}", self.path.display())))
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ClientError::Storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| ClientError::Storage(e.to_string()))?;

        fs::write(&self.path, json)
            .map_err(|e| ClientError::Storage(format!("failed to write {}: {e}", self.path.display())))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        lat: f64,
    }

    fn temp_store(name: &str) -> FileStore {
        let dir = std::env::temp_dir().join(format!("agri-core-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        FileStore::new(dir.join("storage.json"))
    }

    #[test]
    fn memory_store_last_writer_wins() {
        let store = MemoryStore::new();
        store.set(KEY_TOKEN, "a").unwrap();
        store.set(KEY_TOKEN, "b").unwrap();
        assert_eq!(store.get(KEY_TOKEN).unwrap().as_deref(), Some("b"));

        store.remove(KEY_TOKEN).unwrap();
        assert_eq!(store.get(KEY_TOKEN).unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let store = temp_store("persist");
        store.set(KEY_AUTH_TOKEN, "jwt").unwrap();
        store.set(KEY_USER, "someone").unwrap();

        let reopened = FileStore::new(store.path().clone());
        assert_eq!(reopened.get(KEY_AUTH_TOKEN).unwrap().as_deref(), Some("jwt"));

        reopened.remove(KEY_AUTH_TOKEN).unwrap();
        assert_eq!(store.get(KEY_AUTH_TOKEN).unwrap(), None);
        assert_eq!(store.get(KEY_USER).unwrap().as_deref(), Some("someone"));
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let store = temp_store("missing");
        assert_eq!(store.get(KEY_TOKEN).unwrap(), None);
        store.remove(KEY_TOKEN).unwrap();
    }

    #[test]
    fn json_helpers_roundtrip_and_reject_garbage() {
        let store = MemoryStore::new();
        let profile = Profile { name: "Asha".into(), lat: 19.07 };
        set_json(&store, KEY_USER_PROFILE, &profile).unwrap();

        let back: Option<Profile> = get_json(&store, KEY_USER_PROFILE).unwrap();
        assert_eq!(back, Some(profile));

        store.set(KEY_USER_PROFILE, "{not json").unwrap();
        let err = get_json::<Profile>(&store, KEY_USER_PROFILE).unwrap_err();
        assert!(matches!(err, ClientError::Storage(_)));
    }
}
