//! Three bounded caches fronting the mapped file: key→position,
//! position→node, and position→tree-info (spec §4.5, §9).
//!
//! The teacher's own `clru` module hand-rolls an LRU rather than pulling
//! in a crates.io `lru` dependency, but does so for a concurrent,
//! multi-reader design with a background evictor thread. Kinbaku is
//! single-writer and synchronous, so this is a much smaller structure:
//! a `HashMap` plus a recency vector, evicted from the front on
//! overflow. Per the cache-coherence note in spec §9, removal must evict
//! a node by every key at once — a partial eviction leaves a phantom
//! entry that will serve stale data forever.

use std::collections::HashMap;
use std::hash::Hash;

use crate::codec::NodeRecord;

/// Small synchronous LRU: `HashMap` for O(1) lookup, a recency `Vec` for
/// eviction order. `touch`/`evict` are O(n) in the *current* size, not a
/// concern at the cache sizes this crate is configured for.
#[derive(Debug)]
struct Lru<K, V> {
    capacity: usize,
    map: HashMap<K, V>,
    recency: Vec<K>,
}

impl<K: Eq + Hash + Clone, V: Clone> Lru<K, V> {
    fn new(capacity: usize) -> Lru<K, V> {
        Lru {
            capacity,
            map: HashMap::new(),
            recency: Vec::new(),
        }
    }

    fn get(&mut self, key: &K) -> Option<V> {
        let value = self.map.get(key).cloned();
        if value.is_some() {
            self.touch(key);
        }
        value
    }

    fn put(&mut self, key: K, value: V) {
        if !self.map.contains_key(&key) && self.map.len() >= self.capacity && self.capacity > 0 {
            if !self.recency.is_empty() {
                let oldest = self.recency.remove(0);
                self.map.remove(&oldest);
            }
        }
        self.map.insert(key.clone(), value);
        self.touch(&key);
    }

    fn remove(&mut self, key: &K) {
        self.map.remove(key);
        if let Some(i) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(i);
        }
    }

    fn touch(&mut self, key: &K) {
        if let Some(i) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(i);
        }
        self.recency.push(key.clone());
    }

    fn clear(&mut self) {
        self.map.clear();
        self.recency.clear();
    }
}

/// Tree-descent fast path prefix: `(hash, left, right)`.
pub type TreeInfo = (u32, u64, u64);

pub struct GraphCache {
    key_to_pos: Lru<String, u64>,
    pos_to_node: Lru<u64, NodeRecord>,
    pos_to_tree_info: Lru<u64, TreeInfo>,
}

impl GraphCache {
    pub fn new(cache_len: usize) -> GraphCache {
        GraphCache {
            key_to_pos: Lru::new(cache_len),
            pos_to_node: Lru::new(cache_len),
            pos_to_tree_info: Lru::new(cache_len),
        }
    }

    pub fn position_for_key(&mut self, key: &str) -> Option<u64> {
        self.key_to_pos.get(&key.to_string())
    }

    /// Hash/left/right prefix for `pos`, the BST-descent fast path
    /// consulted by [crate::tree::node_bst::find_node_pos] on every level
    /// before it falls back to a full record read.
    pub fn tree_info(&mut self, pos: u64) -> Option<TreeInfo> {
        self.pos_to_tree_info.get(&pos)
    }

    /// Record just the tree-info prefix for `pos`, without a full
    /// [NodeRecord] in hand. Used mid-descent, where only the cheap
    /// prefix has been read off disk; [GraphCache::remember] supersedes
    /// this once the full record is fetched.
    pub fn put_tree_info(&mut self, pos: u64, info: TreeInfo) {
        self.pos_to_tree_info.put(pos, info);
    }

    /// Full record for `pos`, consulted by [crate::graph::Graph::resolve]
    /// on a `key_to_pos` hit before falling back to a file read.
    pub fn node_at(&mut self, pos: u64) -> Option<NodeRecord> {
        self.pos_to_node.get(&pos)
    }

    pub fn remember(&mut self, node: &NodeRecord) {
        self.key_to_pos.put(node.key.clone(), node.position);
        self.pos_to_tree_info
            .put(node.position, (node.hash, node.left, node.right));
        self.pos_to_node.put(node.position, node.clone());
    }

    /// Evict `node` from every cache at once. Must be called on every
    /// structural change to the node (rename is not supported, but
    /// removal and BST rewiring both touch `left`/`right`/`hash` via the
    /// tree-info cache).
    pub fn forget(&mut self, node: &NodeRecord) {
        self.key_to_pos.remove(&node.key);
        self.pos_to_tree_info.remove(&node.position);
        self.pos_to_node.remove(&node.position);
    }

    pub fn clear(&mut self) {
        self.key_to_pos.clear();
        self.pos_to_tree_info.clear();
        self.pos_to_node.clear();
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;
