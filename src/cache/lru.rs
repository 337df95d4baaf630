//! Recency List Module
//!
//! Implements Least Recently Used ordering for capacity eviction.

use crate::cache::list::{NodeHandle, NodeList};

// == Recency List ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys are stored in an arena-backed linked list where:
/// - Front = Most recently used
/// - Back = Least recently used
///
/// Every operation is `O(1)` given the handle the entry keeps.
#[derive(Debug)]
pub struct RecencyList<K> {
    /// Order of keys by access time
    order: NodeList<K>,
    /// Maximum number of entries before eviction
    capacity: usize,
}

impl<K> RecencyList<K> {
    // == Constructor ==
    /// Creates a new empty recency list bounded at `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            order: NodeList::new(),
            capacity,
        }
    }

    // == Capacity ==
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Push ==
    /// Records a newly inserted key as most recently used.
    pub fn push(&mut self, key: K) -> NodeHandle {
        self.order.push_front(key)
    }

    // == Touch ==
    /// Marks a key as recently used (moves to front).
    pub fn touch(&mut self, handle: NodeHandle) {
        self.order.move_to_front(handle);
    }

    // == Unlink ==
    /// Removes a key from the list.
    pub fn unlink(&mut self, handle: NodeHandle) -> Option<K> {
        self.order.remove(handle)
    }

    // == Least Recent ==
    /// Returns the least recently used key without removing it.
    pub fn least_recent(&self) -> Option<&K> {
        self.order.back()
    }

    // == Is Over Capacity ==
    /// Returns true when `len` entries exceed the configured bound.
    pub fn is_over_capacity(&self, len: usize) -> bool {
        len > self.capacity
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Keys ==
    /// Iterates keys from most to least recently used.
    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.iter()
    }
}
