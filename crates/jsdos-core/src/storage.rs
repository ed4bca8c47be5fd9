//! Durable key-value storage for run options
//!
//! Each run option owns exactly one key. Values are strings, written
//! synchronously by the option's mutator and read once when a fresh
//! session is constructed.

use crate::errors::{Result, StorageError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

// ----------------------------------------------------------------------------
// Storage Keys
// ----------------------------------------------------------------------------

/// Keys used for persisted run options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StorageKey {
    Worker,
    Backend,
    RenderBackend,
    RenderAspect,
    Volume,
    MouseSensitivity,
}

impl StorageKey {
    pub const ALL: [StorageKey; 6] = [
        StorageKey::Worker,
        StorageKey::Backend,
        StorageKey::RenderBackend,
        StorageKey::RenderAspect,
        StorageKey::Volume,
        StorageKey::MouseSensitivity,
    ];

    /// Key string in durable storage
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Worker => "worker",
            StorageKey::Backend => "backend",
            StorageKey::RenderBackend => "renderBackend",
            StorageKey::RenderAspect => "renderAspect",
            StorageKey::Volume => "volume",
            StorageKey::MouseSensitivity => "mouse_sensitivity",
        }
    }
}

// ----------------------------------------------------------------------------
// Storage Trait
// ----------------------------------------------------------------------------

/// String key-value storage that outlives the session
pub trait KeyValueStorage: Send + Sync {
    /// Read a value, `None` when absent
    fn get_item(&self, key: &str) -> Option<String>;

    /// Write a value
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value
    fn remove_item(&self, key: &str) -> Result<()>;
}

// ----------------------------------------------------------------------------
// Memory Storage Implementation
// ----------------------------------------------------------------------------

/// In-memory storage implementation for testing and fallback
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-populated with entries
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let data = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            data: RwLock::new(data),
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.data.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// JSON File Storage Implementation
// ----------------------------------------------------------------------------

/// Storage backed by a single JSON object on disk
///
/// The whole file is rewritten on every mutation.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    data: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStorage {
    /// Open storage at `path`; a missing file is an empty storage
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(StorageError::from)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StorageError::from(e).into()),
        };
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, data: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(StorageError::from)?;
            }
        }
        let text = serde_json::to_string_pretty(data).map_err(StorageError::from)?;
        fs::write(&self.path, text).map_err(StorageError::from)?;
        Ok(())
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.insert(key.to_string(), value.to_string());
        self.flush(&data)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        if data.remove(key).is_some() {
            self.flush(&data)?;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Value Encoding
// ----------------------------------------------------------------------------

/// Encode a boolean option
pub fn encode_bool(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// Encode a numeric option with shortest decimal formatting
pub fn encode_number(value: f64) -> String {
    // f64 Display already drops a trailing ".0"
    format!("{}", value)
}
