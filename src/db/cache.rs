//! Key-value store for persisted schema metadata.
//!
//! Schema introspection writes its per-table metadata here as JSON so that
//! it survives the in-memory maps of a single connection. Entries can be
//! tagged, and a whole tag can be dropped at once.

use crate::config::SchemaCacheOptions;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Store used by `Schema` to persist table metadata.
///
/// Implementations are shared between connections and must tolerate
/// concurrent use; last write wins.
pub trait SchemaCache: Send + Sync + fmt::Debug {
    fn is_enabled(&self) -> bool;

    /// Whether metadata for `table` must never be persisted.
    fn is_excluded(&self, table: &str) -> bool;

    /// Time-to-live for new entries; `None` keeps them until invalidated.
    fn duration(&self) -> Option<Duration>;

    fn get(&self, key: &str) -> Option<JsonValue>;

    fn set(&self, key: &str, value: JsonValue, ttl: Option<Duration>, tag: Option<&str>);

    /// Return the stored value, or store and return the loader's result.
    fn get_or_set(
        &self,
        key: &str,
        ttl: Option<Duration>,
        tag: Option<&str>,
        loader: &mut dyn FnMut() -> JsonValue,
    ) -> JsonValue {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = loader();
        self.set(key, value.clone(), ttl, tag);
        value
    }

    fn remove(&self, key: &str);

    /// Drop every entry stored under `tag`.
    fn invalidate(&self, tag: &str);
}

struct Entry {
    value: JsonValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

#[derive(Default)]
struct Entries {
    values: HashMap<String, Entry>,
    tags: HashMap<String, HashSet<String>>,
}

impl Entries {
    fn remove(&mut self, key: &str) {
        self.values.remove(key);
        self.tags.retain(|_, keys| {
            keys.remove(key);
            !keys.is_empty()
        });
    }

    fn purge_expired(&mut self) {
        let expired: Vec<String> = self
            .values
            .iter()
            .filter(|(_, e)| e.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.remove(&key);
        }
    }
}

/// In-process [`SchemaCache`] with TTL expiry and tag invalidation.
pub struct MemorySchemaCache {
    enabled: AtomicBool,
    duration: Option<Duration>,
    exclude: Vec<String>,
    entries: RwLock<Entries>,
}

impl MemorySchemaCache {
    /// An enabled cache with no expiry and no exclusions.
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            duration: None,
            exclude: Vec::new(),
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn from_options(options: &SchemaCacheOptions) -> Self {
        Self {
            enabled: AtomicBool::new(options.enabled),
            duration: Some(options.duration()).filter(|d| !d.is_zero()),
            exclude: options.exclude.clone(),
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_exclude(mut self, tables: Vec<String>) -> Self {
        self.exclude = tables;
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values.values().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemorySchemaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySchemaCache")
            .field("enabled", &self.is_enabled())
            .field("duration", &self.duration)
            .field("exclude", &self.exclude)
            .field("len", &self.len())
            .finish()
    }
}

impl SchemaCache for MemorySchemaCache {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn is_excluded(&self, table: &str) -> bool {
        self.exclude.iter().any(|t| t == table)
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn get(&self, key: &str) -> Option<JsonValue> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.values.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.values.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
        }
        None
    }

    fn set(&self, key: &str, value: JsonValue, ttl: Option<Duration>, tag: Option<&str>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.purge_expired();
        entries.values.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        if let Some(tag) = tag {
            entries
                .tags
                .entry(tag.to_string())
                .or_default()
                .insert(key.to_string());
        }
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn invalidate(&self, tag: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let Some(keys) = entries.tags.remove(tag) else {
            return;
        };
        debug!(tag = %tag, count = keys.len(), "Invalidating schema cache tag");
        for key in keys {
            entries.values.remove(&key);
        }
    }
}
