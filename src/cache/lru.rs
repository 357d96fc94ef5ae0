//! Byte-budgeted LRU store.
//!
//! Entries live in a slot vector and are linked by index into a doubly linked
//! recency list (head = most recently used). A `HashMap` maps keys to slots so
//! `get`, `add` and tail eviction are all O(1).
//!
//! ```text
//!   index: "a" -> 2, "b" -> 0, "c" -> 1
//!
//!   head ─► [2:"a"] ◄──► [0:"b"] ◄──► [1:"c"] ◄── tail (next to evict)
//! ```
//!
//! The cache is not synchronized; owners wrap it in a lock.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU64;

/// Anything stored in the cache reports how many bytes it accounts for.
pub trait CacheValue {
    fn byte_len(&self) -> usize;
}

impl CacheValue for Vec<u8> {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl CacheValue for String {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

/// Observer invoked with every entry removed from the tail.
pub type EvictionHook<V> = Box<dyn FnMut(&str, &V) + Send>;

struct Node<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

pub struct LruCache<V> {
    /// 0 means eviction is disabled; only reachable through `unbounded()`.
    max_bytes: u64,
    n_bytes: u64,
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    on_evicted: Option<EvictionHook<V>>,
}

impl<V: CacheValue> LruCache<V> {
    /// Creates a cache that evicts once more than `max_bytes` are accounted.
    pub fn new(max_bytes: NonZeroU64) -> Self {
        Self::with_limit(max_bytes.get())
    }

    /// Creates a cache that never evicts. Memory use is bounded only by the caller.
    pub fn unbounded() -> Self {
        Self::with_limit(0)
    }

    fn with_limit(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            n_bytes: 0,
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            on_evicted: None,
        }
    }

    /// Installs an observer called with each evicted `(key, value)`.
    pub fn with_eviction_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&str, &V) + Send + 'static,
    {
        self.on_evicted = Some(Box::new(hook));
        self
    }

    /// Looks up `key` and marks it as most recently used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.move_to_front(idx);
        self.slots[idx].as_ref().map(|node| &node.value)
    }

    /// Looks up `key` without touching its recency.
    pub fn peek(&self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.slots[idx].as_ref().map(|node| &node.value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Inserts or replaces `key`, then evicts from the tail until the byte total
    /// fits the budget again.
    pub fn add(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        let new_len = value.byte_len() as u64;

        if let Some(&idx) = self.index.get(key.as_str()) {
            self.move_to_front(idx);
            if let Some(node) = self.slots[idx].as_mut() {
                let old_len = node.value.byte_len() as u64;
                node.value = value;
                self.n_bytes = self.n_bytes - old_len + new_len;
            }
        } else {
            self.n_bytes += key.len() as u64 + new_len;
            let idx = self.alloc(Node {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            });
            self.attach_front(idx);
            self.index.insert(key, idx);
        }

        while self.max_bytes != 0 && self.n_bytes > self.max_bytes {
            if self.remove_oldest().is_none() {
                break;
            }
        }
    }

    /// Evicts the least recently used entry, notifying the eviction hook.
    pub fn remove_oldest(&mut self) -> Option<(String, V)> {
        let idx = self.tail?;
        self.detach(idx);
        let node = self.slots[idx].take()?;
        self.free.push(idx);
        self.index.remove(&node.key);
        self.n_bytes -= node.key.len() as u64 + node.value.byte_len() as u64;

        if let Some(hook) = self.on_evicted.as_mut() {
            hook(&node.key, &node.value);
        }
        Some((node.key, node.value))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Bytes currently accounted: sum of key and value lengths.
    pub fn bytes(&self) -> u64 {
        self.n_bytes
    }

    /// Configured budget, `None` when eviction is disabled.
    pub fn max_bytes(&self) -> Option<u64> {
        (self.max_bytes != 0).then_some(self.max_bytes)
    }

    /// Iterates from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.slots.get(cursor?)?.as_ref()?;
            cursor = node.next;
            Some((node.key.as_str(), &node.value))
        })
    }

    fn alloc(&mut self, node: Node<V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.attach_front(idx);
    }

    fn detach(&mut self, idx: usize) {
        let Some(node) = self.slots[idx].as_mut() else {
            return;
        };
        let (prev, next) = (node.prev.take(), node.next.take());

        match prev {
            Some(p) => {
                if let Some(prev_node) = self.slots[p].as_mut() {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(next_node) = self.slots[n].as_mut() {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head
            && let Some(head_node) = self.slots[h].as_mut()
        {
            head_node.prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }
}

impl<V> fmt::Debug for LruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("max_bytes", &self.max_bytes)
            .field("n_bytes", &self.n_bytes)
            .field("len", &self.index.len())
            .finish()
    }
}
