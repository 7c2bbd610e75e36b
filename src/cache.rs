use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;
use xxhash_rust::xxh64::xxh64;

use crate::{MAX_CACHE_SIZE, MAX_OBJECT_SIZE};

/// Hashes the canonical `<hostname>:<port><path>` form of a request.
///
/// The port is the verbatim string filled in during parsing, so
/// `example.com/x` and `example.com:80/x` both canonicalize to port `"80"`
/// and share a cache slot.
pub fn object_key(hostname: &str, port: &str, path: &str) -> u64 {
    xxh64(format!("{hostname}:{port}{path}").as_bytes(), 0)
}

struct CacheInner {
    // Unbounded by entry count; the byte budget below is the only
    // eviction driver.
    entries: LruCache<u64, Bytes>,
    bytes: usize,
}

/// Byte-bounded LRU store for whole upstream responses.
///
/// Every operation takes the single internal lock for its full duration and
/// performs no I/O while holding it. Reads hand out an owned handle to the
/// stored bytes, so workers write to sockets after the lock is gone.
#[derive(Clone)]
pub struct ObjectCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: LruCache::unbounded(),
                bytes: 0,
            })),
        }
    }

    /// Looks up `key`, promoting the entry to most-recently-used on a hit.
    pub async fn get(&self, key: u64) -> Option<Bytes> {
        let mut inner = self.inner.lock().await;
        inner.entries.get(&key).cloned()
    }

    /// Stores a response under `key`, evicting from the LRU tail until the
    /// byte budget holds.
    ///
    /// Empty and over-cap objects are rejected outright. An existing entry
    /// for the same key is removed first rather than updated in place. If
    /// the object still does not fit after the eviction loop has drained
    /// the cache, the insertion is abandoned.
    pub async fn insert(&self, key: u64, data: Bytes) -> bool {
        let size = data.len();
        if size == 0 || size > MAX_OBJECT_SIZE {
            return false;
        }

        let mut inner = self.inner.lock().await;

        if let Some(old) = inner.entries.pop(&key) {
            inner.bytes -= old.len();
        }

        while inner.bytes + size > MAX_CACHE_SIZE {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => inner.bytes -= evicted.len(),
                None => break,
            }
        }
        if inner.bytes + size > MAX_CACHE_SIZE {
            return false;
        }

        inner.entries.put(key, data);
        inner.bytes += size;
        true
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }

    /// Bytes currently held across all entries.
    pub async fn total_bytes(&self) -> usize {
        self.inner.lock().await.bytes
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.bytes = 0;
    }
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new()
    }
}
