use parking_lot::Mutex;

use super::byteview::ByteView;
use super::lru::LruCache;

/// The per-group store: an `LruCache` behind a single exclusive lock.
///
/// Every operation takes the lock for its whole (short, non-async) duration.
pub struct LocalCache {
    lru: Mutex<LruCache<ByteView>>,
}

impl LocalCache {
    pub fn new(lru: LruCache<ByteView>) -> Self {
        Self {
            lru: Mutex::new(lru),
        }
    }

    /// Returns a clone of the cached view and promotes the entry.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        self.lru.lock().get(key).cloned()
    }

    pub fn add(&self, key: &str, value: ByteView) {
        self.lru.lock().add(key, value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lru.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lru.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.lock().is_empty()
    }

    pub fn bytes(&self) -> u64 {
        self.lru.lock().bytes()
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.lru
            .lock()
            .iter()
            .map(|(key, _)| key.to_string())
            .collect()
    }
}
