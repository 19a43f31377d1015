use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::CacheError;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub default_ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: 128,
            default_ttl_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
    pub capacity: usize,
    pub hit_rate: f64,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

struct CacheInner<V> {
    entries: LruCache<String, Entry<V>>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<V> CacheInner<V> {
    /// Peeks without touching recency.
    fn drop_if_expired(&mut self, key: &str, now: Instant) -> bool {
        let expired = self
            .entries
            .peek(key)
            .map_or(false, |entry| entry.expires_at <= now);
        if expired {
            self.entries.pop(key);
            self.expirations += 1;
        }
        expired
    }
}

/// String-keyed cache with per-entry TTL and least-recently-used eviction.
pub struct Cache<V, C: Clock = SystemClock> {
    inner: Mutex<CacheInner<V>>,
    clock: C,
    config: CacheConfig,
}

impl<V, C: Clock> fmt::Debug for Cache<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .field("size", &self.inner.lock().entries.len())
            .finish()
    }
}

impl<V: Clone> Cache<V, SystemClock> {
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        Cache::with_clock(config, SystemClock)
    }
}

impl<V: Clone, C: Clock> Cache<V, C> {
    pub fn with_clock(config: CacheConfig, clock: C) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(config.capacity).ok_or(CacheError::ZeroCapacity)?;
        if config.default_ttl_ms == 0 {
            return Err(CacheError::ZeroTtl);
        }
        Ok(Cache {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
            clock,
            config,
        })
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.config.default_ttl_ms)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        if inner.drop_if_expired(key, now) {
            inner.misses += 1;
            return None;
        }
        let value = inner.entries.get(key).map(|entry| entry.value.clone());
        if value.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        value
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl());
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let expires_at = self.clock.now() + ttl;
        let mut inner = self.inner.lock();
        let displaced = inner.entries.push(key.clone(), Entry { value, expires_at });
        if let Some((evicted, _)) = displaced.filter(|(old, _)| *old != key) {
            inner.evictions += 1;
            trace!(key = %evicted, "cache.evicted");
        }
    }

    /// Presence check that neither counts as a hit nor refreshes recency.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        !inner.drop_if_expired(key, now) && inner.entries.contains(key)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().entries.pop(key).is_some()
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.entries.pop(key);
        }
        inner.expirations += expired.len() as u64;
        expired.len()
    }

    /// Returns the cached value, or computes, stores and returns it. The
    /// factory runs without the lock held.
    pub fn get_or_set<F>(&self, key: &str, factory: F, ttl: Option<Duration>) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = factory();
        self.set_with_ttl(key, value.clone(), ttl.unwrap_or_else(|| self.default_ttl()));
        value
    }

    pub fn try_get_or_set<F, E>(&self, key: &str, factory: F, ttl: Option<Duration>) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = factory()?;
        self.set_with_ttl(key, value.clone(), ttl.unwrap_or_else(|| self.default_ttl()));
        Ok(value)
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let lookups = inner.hits + inner.misses;
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            expirations: inner.expirations,
            size: inner.entries.len(),
            capacity: self.config.capacity,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
        }
    }
}
