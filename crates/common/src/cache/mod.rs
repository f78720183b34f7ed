//! In-process TTL cache with LRU eviction
//!
//! Provides:
//! - Generic get/set with per-instance TTL
//! - Least-recently-used eviction past a fixed capacity
//! - Hit/miss statistics
//! - Optional write-behind persistence to a flat JSON file
//!
//! Every mutation (insert, evict, recency update) happens under one
//! mutex per cache instance. Mutations only signal a background writer,
//! which coalesces bursts and copies the shared values out itself before
//! writing.

pub mod keys;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::metrics;

/// Cache instance configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Name used in logs, metrics and the persistence file name
    pub name: String,
    /// Maximum age before an entry is considered stale
    pub ttl: Duration,
    /// Capacity bound; the LRU entry is evicted before inserting past it
    pub max_entries: usize,
    /// Directory for `{name}_cache.json` (persistence disabled when None)
    pub persist_dir: Option<PathBuf>,
}

impl CacheConfig {
    pub fn new(name: impl Into<String>, ttl: Duration, max_entries: usize) -> Self {
        Self {
            name: name.into(),
            ttl,
            max_entries,
            persist_dir: None,
        }
    }

    pub fn with_persistence(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_dir = Some(dir.into());
        self
    }

    /// Path of the flat persistence file, if enabled
    pub fn persist_path(&self) -> Option<PathBuf> {
        self.persist_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}_cache.json", self.name)))
    }
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub size: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// On-disk representation of one entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedEntry<V> {
    data: V,
    inserted_at: DateTime<Utc>,
}

/// Borrowed form of `PersistedEntry` used when writing
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedRef<'a, V> {
    data: &'a V,
    inserted_at: DateTime<Utc>,
}

struct Entry<V> {
    value: Arc<V>,
    inserted_at: Instant,
    inserted_wall: DateTime<Utc>,
    last_used: u64,
}

struct CacheState<V> {
    entries: HashMap<String, Entry<V>>,
    /// use tick -> key, oldest first
    recency: BTreeMap<u64, String>,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl<V> CacheState<V> {
    fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            tick: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &str) {
        let tick = self.next_tick();
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.last_used);
            entry.last_used = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    fn remove(&mut self, key: &str) -> Option<Entry<V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.last_used);
        Some(entry)
    }

    fn evict_lru(&mut self) -> Option<String> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }

    fn insert(&mut self, key: String, value: V, inserted_at: Instant, inserted_wall: DateTime<Utc>) {
        let tick = self.next_tick();
        self.recency.insert(tick, key.clone());
        self.entries.insert(
            key,
            Entry {
                value: Arc::new(value),
                inserted_at,
                inserted_wall,
                last_used: tick,
            },
        );
    }
}

/// TTL + LRU cache shared across concurrent requests
pub struct TtlCache<V> {
    config: CacheConfig,
    state: Arc<Mutex<CacheState<V>>>,
    persist_tx: Option<watch::Sender<()>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a cache, restoring persisted entries when persistence is enabled.
    ///
    /// A missing or corrupt file starts an empty cache. The write-behind task
    /// needs a Tokio runtime; without one persistence is disabled.
    pub fn new(config: CacheConfig) -> Self {
        let mut state = CacheState::empty();
        let persist_path = config.persist_path();

        if let Some(path) = &persist_path {
            for (key, entry) in load_snapshot::<V>(path, config.ttl) {
                state.insert(key, entry.value, entry.inserted_at, entry.inserted_wall);
            }
            while state.entries.len() > config.max_entries.max(1) {
                state.evict_lru();
            }
        }

        debug!(
            cache = %config.name,
            restored = state.entries.len(),
            ttl_secs = config.ttl.as_secs(),
            max_entries = config.max_entries,
            "Cache initialized"
        );

        let state = Arc::new(Mutex::new(state));
        let mut persist_tx = None;

        if let Some(path) = persist_path {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let (tx, rx) = watch::channel(());
                    handle.spawn(write_behind(path, Arc::clone(&state), rx));
                    persist_tx = Some(tx);
                }
                Err(_) => {
                    warn!(cache = %config.name, "No async runtime, cache persistence disabled");
                }
            }
        }

        Self { config, state, persist_tx }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Get a live value; expired entries are evicted by the read that finds them
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock().await;

        let expired = match state.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() > self.config.ttl,
            None => {
                state.misses += 1;
                metrics::record_cache(false, &self.config.name);
                debug!(cache = %self.config.name, key, "Cache miss");
                return None;
            }
        };

        if expired {
            state.remove(key);
            state.misses += 1;
            metrics::record_cache(false, &self.config.name);
            debug!(cache = %self.config.name, key, "Cache entry expired");
            return None;
        }

        state.touch(key);
        state.hits += 1;
        metrics::record_cache(true, &self.config.name);
        debug!(cache = %self.config.name, key, "Cache hit");
        state.entries.get(key).map(|entry| V::clone(&entry.value))
    }

    /// Insert or replace a value, evicting least-recently-used entries first
    pub async fn set(&self, key: &str, value: V) {
        let mut state = self.state.lock().await;

        state.remove(key);
        while state.entries.len() >= self.config.max_entries.max(1) {
            match state.evict_lru() {
                Some(evicted) => debug!(cache = %self.config.name, key = %evicted, "Cache eviction"),
                None => break,
            }
        }
        state.insert(key.to_string(), value, Instant::now(), Utc::now());

        debug!(cache = %self.config.name, key, size = state.entries.len(), "Cache set");
        self.schedule_persist();
    }

    /// Remove one entry; true when it existed
    pub async fn invalidate(&self, key: &str) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.remove(key).is_some();
        if removed {
            self.schedule_persist();
        }
        removed
    }

    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.recency.clear();
        self.schedule_persist();
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        let mut state = self.state.lock().await;
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() > self.config.ttl)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }
        if !expired.is_empty() {
            self.schedule_persist();
        }
        expired.len()
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        let lookups = state.hits + state.misses;
        CacheStats {
            name: self.config.name.clone(),
            size: state.entries.len(),
            max_entries: self.config.max_entries,
            ttl_secs: self.config.ttl.as_secs(),
            hits: state.hits,
            misses: state.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                state.hits as f64 / lookups as f64
            },
        }
    }

    /// Tell the writer the contents changed; never waits on it
    fn schedule_persist(&self) {
        if let Some(tx) = &self.persist_tx {
            tx.send_replace(());
        }
    }
}

struct Restored<V> {
    value: V,
    inserted_at: Instant,
    inserted_wall: DateTime<Utc>,
}

/// Read a persisted snapshot, keeping only entries younger than the TTL
fn load_snapshot<V: DeserializeOwned>(path: &Path, ttl: Duration) -> Vec<(String, Restored<V>)> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read cache file, starting empty");
            return Vec::new();
        }
    };

    let persisted: BTreeMap<String, PersistedEntry<V>> = match serde_json::from_slice(&raw) {
        Ok(persisted) => persisted,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt cache file, starting empty");
            return Vec::new();
        }
    };

    let now_wall = Utc::now();
    let now = Instant::now();
    let mut restored: Vec<(String, Restored<V>)> = persisted
        .into_iter()
        .filter_map(|(key, entry)| {
            let age = (now_wall - entry.inserted_at).to_std().unwrap_or_default();
            if age > ttl {
                return None;
            }
            let inserted_at = now.checked_sub(age).unwrap_or(now);
            Some((
                key,
                Restored {
                    value: entry.data,
                    inserted_at,
                    inserted_wall: entry.inserted_at,
                },
            ))
        })
        .collect();

    // oldest first so recency order follows insertion time
    restored.sort_by_key(|(_, entry)| entry.inserted_wall);
    restored
}

/// Background writer: on each change signal, snapshot and persist the
/// current contents; signals that arrive mid-write collapse into one
async fn write_behind<V>(path: PathBuf, state: Arc<Mutex<CacheState<V>>>, mut rx: watch::Receiver<()>)
where
    V: Serialize + Send + Sync + 'static,
{
    while rx.changed().await.is_ok() {
        let snapshot: Vec<(String, Arc<V>, DateTime<Utc>)> = {
            let state = state.lock().await;
            state
                .entries
                .iter()
                .map(|(key, entry)| (key.clone(), Arc::clone(&entry.value), entry.inserted_wall))
                .collect()
        };

        if let Err(e) = write_snapshot(&path, &snapshot).await {
            warn!(path = %path.display(), error = %e, "Cache persistence failed");
        }
    }
}

async fn write_snapshot<V: Serialize>(path: &Path, snapshot: &[(String, Arc<V>, DateTime<Utc>)]) -> crate::Result<()> {
    let entries: BTreeMap<&str, PersistedRef<'_, V>> = snapshot
        .iter()
        .map(|(key, value, inserted_at)| {
            (
                key.as_str(),
                PersistedRef {
                    data: value.as_ref(),
                    inserted_at: *inserted_at,
                },
            )
        })
        .collect();

    let json = serde_json::to_vec(&entries)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
