//! Node List Module
//!
//! Arena-backed doubly linked list addressed by stable slot handles.
//!
//! Both the recency list and the expiry list are built on this type. An entry
//! keeps the [`NodeHandle`] returned by `push_front`, which makes touching and
//! unlinking that entry `O(1)` without shared pointers between the lists.

// == Node Handle ==
/// Index of a node slot inside a [`NodeList`].
///
/// A handle stays valid until the node it names is removed; after that the
/// slot may be reused by a later push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Node List ==
/// Doubly linked list whose nodes live in a `Vec` of reusable slots.
///
/// - Front = most recently pushed or moved
/// - Back = oldest position
#[derive(Debug)]
pub struct NodeList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for NodeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeList<T> {
    // == Constructor ==
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Inserts a value at the front and returns its handle.
    pub fn push_front(&mut self, value: T) -> NodeHandle {
        let node = Node {
            value,
            prev: None,
            next: None,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                index
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.attach_front(index);
        self.len += 1;
        NodeHandle(index)
    }

    // == Move To Front ==
    /// Moves an existing node to the front. Stale handles are ignored.
    pub fn move_to_front(&mut self, handle: NodeHandle) {
        if self.head == Some(handle.0) || !self.is_live(handle) {
            return;
        }
        self.detach(handle.0);
        self.attach_front(handle.0);
    }

    // == Remove ==
    /// Unlinks a node and returns its value, or `None` for a stale handle.
    pub fn remove(&mut self, handle: NodeHandle) -> Option<T> {
        if !self.is_live(handle) {
            return None;
        }
        self.detach(handle.0);
        let node = self.slots[handle.0].take()?;
        self.free.push(handle.0);
        self.len -= 1;
        Some(node.value)
    }

    // == Pop Back ==
    /// Removes and returns the value at the back.
    pub fn pop_back(&mut self) -> Option<T> {
        let index = self.tail?;
        self.remove(NodeHandle(index))
    }

    // == Back ==
    /// Returns the value at the back (oldest position) without removing it.
    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|index| self.get(NodeHandle(index)))
    }

    // == Get ==
    /// Returns the value stored under a handle.
    pub fn get(&self, handle: NodeHandle) -> Option<&T> {
        self.slots
            .get(handle.0)
            .and_then(Option::as_ref)
            .map(|node| &node.value)
    }

    // == Length ==
    /// Returns the number of linked nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Iter ==
    /// Iterates values from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.slots.get(cursor?)?.as_ref()?;
            cursor = node.next;
            Some(&node.value)
        })
    }

    fn is_live(&self, handle: NodeHandle) -> bool {
        matches!(self.slots.get(handle.0), Some(Some(_)))
    }

    fn detach(&mut self, index: usize) {
        let (prev, next) = match self.slots.get(index).and_then(Option::as_ref) {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev_index) => {
                if let Some(prev_node) = self.slots.get_mut(prev_index).and_then(Option::as_mut) {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_index) => {
                if let Some(next_node) = self.slots.get_mut(next_index).and_then(Option::as_mut) {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.slots.get_mut(index).and_then(Option::as_mut) {
            node.prev = None;
            node.next = None;
        }
    }

    fn attach_front(&mut self, index: usize) {
        if let Some(node) = self.slots.get_mut(index).and_then(Option::as_mut) {
            node.prev = None;
            node.next = self.head;
        }

        match self.head {
            Some(head_index) => {
                if let Some(head_node) = self.slots.get_mut(head_index).and_then(Option::as_mut) {
                    head_node.prev = Some(index);
                }
            }
            None => self.tail = Some(index),
        }

        self.head = Some(index);
    }
}
