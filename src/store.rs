//! Write-through persistence for the storefront state.
//!
//! State is hydrated once at startup through [`PersistedStore::load`] and each
//! collection is written back in full whenever it changes. The backend is a
//! plain key-value string store so the mechanism (files, an in-process map,
//! something else later) can be swapped without touching the aggregates.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub const PRODUCTS_KEY: &str = "palo-rosa-products";
pub const OFFERS_KEY: &str = "palo-rosa-offers";
pub const CART_KEY: &str = "palo-rosa-cart";
pub const ADMIN_PASSWORD_KEY: &str = "palo-rosa-admin-pass";

/// Raw string storage keyed by name.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

/// In-process backend. Contents are lost with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.write().map_err(|_| io::Error::new(io::ErrorKind::Other, "memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One file per key, named after the key, inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    fn path_for(&self, key: &str) -> PathBuf { self.dir.join(key) }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        fs::write(self.path_for(key), value)
    }
}

pub struct PersistedStore {
    backend: Box<dyn KeyValueStore>,
}

impl PersistedStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self { Self { backend: Box::new(backend) } }
    pub fn in_memory() -> Self { Self::new(MemoryStore::new()) }

    /// Parsed value under `key`, or `fallback` when it is missing or does not parse.
    pub fn load<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let Some(raw) = self.backend.get(key) else { return fallback };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable stored value");
                fallback
            }
        }
    }

    /// Serialize and write. Failures are logged and otherwise ignored.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => { warn!(key, error = %e, "failed to serialize value"); return; }
        };
        self.write(key, &raw);
    }

    /// Plain string value; empty counts as absent.
    pub fn load_text(&self, key: &str, fallback: &str) -> String {
        self.backend.get(key).filter(|v| !v.is_empty()).unwrap_or_else(|| fallback.to_string())
    }

    pub fn save_text(&self, key: &str, value: &str) { self.write(key, value); }

    fn write(&self, key: &str, raw: &str) {
        match self.backend.set(key, raw) {
            Ok(()) => debug!(key, bytes = raw.len(), "persisted"),
            Err(e) => warn!(key, error = %e, "failed to persist value"),
        }
    }
}

impl std::fmt::Debug for PersistedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("PersistedStore").finish_non_exhaustive() }
}
