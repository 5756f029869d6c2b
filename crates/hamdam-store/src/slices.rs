//! Named, independently persisted state slices.
//!
//! [`SliceStore`] keeps an in-memory mirror of every slice it has touched so
//! reads are synchronous and never fail. Writes go to the mirror first and
//! are then handed to a [`SliceBackend`]; a backend failure is logged and
//! otherwise ignored, so the session keeps the new value even when it could
//! not be persisted.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::database::Database;
use crate::error::{Result, StoreError};

/// Durable storage for slice documents.
pub trait SliceBackend: Send {
    /// Read the serialized document stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the document stored under `key`.
    fn save(&self, key: &str, json: &str) -> Result<()>;
}

impl Database {
    pub fn load_slice(&self, key: &str) -> Result<Option<String>> {
        let json = self
            .conn()
            .query_row(
                "SELECT json FROM slices WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(json)
    }

    pub fn save_slice(&self, key: &str, json: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO slices (key, json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET json = excluded.json, updated_at = excluded.updated_at",
            params![key, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl SliceBackend for Database {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.load_slice(key)
    }

    fn save(&self, key: &str, json: &str) -> Result<()> {
        self.save_slice(key, json)
    }
}

/// Process-local backend. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    docs: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SliceBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let docs = self.docs.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(docs.get(key).cloned())
    }

    fn save(&self, key: &str, json: &str) -> Result<()> {
        let mut docs = self.docs.lock().map_err(|_| StoreError::LockPoisoned)?;
        docs.insert(key.to_string(), json.to_string());
        Ok(())
    }
}

/// Typed get/set access to named slices over a pluggable backend.
pub struct SliceStore {
    backend: Box<dyn SliceBackend>,
    mirror: HashMap<String, Value>,
    /// List entries that did not decode on the last read, per key. They are
    /// written back untouched with the next typed write of that key.
    held_back: HashMap<String, Vec<Value>>,
}

impl SliceStore {
    pub fn new(backend: impl SliceBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            mirror: HashMap::new(),
            held_back: HashMap::new(),
        }
    }

    /// A store that keeps everything in memory.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Read `key`, falling back to `default`.
    ///
    /// An absent slice gets the default written back so later reads see a
    /// stable shape. A slice that exists but no longer decodes into `T` is
    /// left untouched and the default is returned.
    pub fn get<T, F>(&mut self, key: &str, default: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.raw(key) {
            Some(value) => match serde_json::from_value(value) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(key, error = %e, "slice does not decode, using default");
                    default()
                }
            },
            None => {
                let value = default();
                self.set(key, &value);
                value
            }
        }
    }

    /// Read a list slice entry by entry.
    ///
    /// Entries that do not decode into `T` are logged and left out of the
    /// result, and the next [`set`](Self::set) of `key` appends them again so
    /// one bad record never costs the rest of the list.
    pub fn get_list<T, F>(&mut self, key: &str, default: F) -> Vec<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Vec<T>,
    {
        let items = match self.raw(key) {
            Some(Value::Array(items)) => items,
            Some(_) => return self.get(key, default),
            None => {
                let value = default();
                self.set(key, &value);
                return value;
            }
        };

        let mut decoded = Vec::with_capacity(items.len());
        let mut rejected = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<T>(item.clone()) {
                Ok(entry) => decoded.push(entry),
                Err(e) => {
                    tracing::warn!(key, index, error = %e, "skipping slice entry that does not decode");
                    rejected.push(item);
                }
            }
        }

        if rejected.is_empty() {
            self.held_back.remove(key);
        } else {
            self.held_back.insert(key.to_string(), rejected);
        }
        decoded
    }

    /// Replace `key`. Always updates the in-memory mirror; persistence is
    /// best effort.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) {
        let mut value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(key, error = %e, "failed to encode slice");
                return;
            }
        };
        if let (Value::Array(items), Some(held)) = (&mut value, self.held_back.get(key)) {
            items.extend(held.iter().cloned());
        }
        self.write(key, value);
    }

    /// Slice document as stored, without decoding.
    pub fn raw(&mut self, key: &str) -> Option<Value> {
        if let Some(value) = self.mirror.get(key) {
            return Some(value.clone());
        }

        let json = match self.backend.load(key) {
            Ok(json) => json?,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read slice");
                return None;
            }
        };

        match serde_json::from_str::<Value>(&json) {
            Ok(value) => {
                self.mirror.insert(key.to_string(), value.clone());
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "stored slice is not valid JSON");
                None
            }
        }
    }

    /// Replace `key` with a document as-is, dropping anything held back
    /// from an earlier read.
    pub fn set_raw(&mut self, key: &str, value: Value) {
        self.held_back.remove(key);
        self.write(key, value);
    }

    fn write(&mut self, key: &str, value: Value) {
        let json = value.to_string();
        self.mirror.insert(key.to_string(), value);

        if let Err(e) = self.backend.save(key, &json) {
            tracing::warn!(key, error = %e, "failed to persist slice, keeping in-memory value");
        }
    }
}
