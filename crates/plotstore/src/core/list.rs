//! Doubly-linked list over a generational node arena
//!
//! Chunks, graphs and sub-plots are threaded through [`IntrusiveList`]. Nodes
//! are addressed by [`NodeId`] handles that carry the owning list's id and
//! the slot generation, so a handle from another list, from a removed node or
//! from before [`IntrusiveList::delete_all`] resolves to `None` instead of
//! aliasing a newer node.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LIST_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one list instance (renewed by `delete_all`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListId(u64);

impl ListId {
    fn fresh() -> Self {
        Self(NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Stable handle to a node in an [`IntrusiveList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    list: ListId,
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Slot index inside the owning list
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Id of the list that issued this handle
    pub fn list(&self) -> ListId {
        self.list
    }
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<u32>,
    next: Option<u32>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// Ordered container owning its nodes
#[derive(Debug)]
pub struct IntrusiveList<T> {
    id: ListId,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl<T> IntrusiveList<T> {
    pub fn new() -> Self {
        Self {
            id: ListId::fresh(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn id(&self) -> ListId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when `id` refers to a live node of this list
    pub fn contains(&self, id: NodeId) -> bool {
        self.resolve(id).is_some()
    }

    pub fn insert_head(&mut self, value: T) -> NodeId {
        let index = self.allocate(value);
        self.link(index, None, self.head);
        self.handle(index)
    }

    pub fn insert_tail(&mut self, value: T) -> NodeId {
        let index = self.allocate(value);
        self.link(index, self.tail, None);
        self.handle(index)
    }

    /// Insert after `anchor`; returns `None` (dropping nothing) if the anchor is stale
    pub fn insert_after(&mut self, anchor: NodeId, value: T) -> Option<NodeId> {
        let anchor = self.resolve(anchor)?;
        let next = self.node(anchor).and_then(|n| n.next);
        let index = self.allocate(value);
        self.link(index, Some(anchor), next);
        Some(self.handle(index))
    }

    pub fn insert_before(&mut self, anchor: NodeId, value: T) -> Option<NodeId> {
        let anchor = self.resolve(anchor)?;
        let prev = self.node(anchor).and_then(|n| n.prev);
        let index = self.allocate(value);
        self.link(index, prev, Some(anchor));
        Some(self.handle(index))
    }

    /// Unlink a node and hand its value back to the caller
    pub fn take_out(&mut self, id: NodeId) -> Option<T> {
        let index = self.resolve(id)?;
        let slot = &mut self.slots[index as usize];
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);

        match node.prev {
            Some(prev) => self.set_next(prev, node.next),
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.set_prev(next, node.prev),
            None => self.tail = node.prev,
        }
        self.len -= 1;
        Some(node.value)
    }

    /// Drop every node; all previously issued handles become stale
    pub fn delete_all(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
        self.id = ListId::fresh();
    }

    pub fn first(&self) -> Option<NodeId> {
        self.head.map(|i| self.handle(i))
    }

    pub fn last(&self) -> Option<NodeId> {
        self.tail.map(|i| self.handle(i))
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        let index = self.resolve(id)?;
        self.node(index)?.next.map(|i| self.handle(i))
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        let index = self.resolve(id)?;
        self.node(index)?.prev.map(|i| self.handle(i))
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        let index = self.resolve(id)?;
        self.node(index).map(|n| &n.value)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        let index = self.resolve(id)?;
        self.slots[index as usize].node.as_mut().map(|n| &mut n.value)
    }

    /// Handles in list order, useful when each node must be mutated in turn
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.len);
        let mut cursor = self.first();
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.next(id);
        }
        ids
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn allocate(&mut self, value: T) -> u32 {
        let node = Node {
            value,
            prev: None,
            next: None,
        };
        if let Some(index) = self.free.pop() {
            self.slots[index as usize].node = Some(node);
            index
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            (self.slots.len() - 1) as u32
        }
    }

    fn link(&mut self, index: u32, prev: Option<u32>, next: Option<u32>) {
        if let Some(node) = self.slots[index as usize].node.as_mut() {
            node.prev = prev;
            node.next = next;
        }
        match prev {
            Some(p) => self.set_next(p, Some(index)),
            None => self.head = Some(index),
        }
        match next {
            Some(n) => self.set_prev(n, Some(index)),
            None => self.tail = Some(index),
        }
        self.len += 1;
    }

    fn set_next(&mut self, index: u32, next: Option<u32>) {
        if let Some(node) = self.slots[index as usize].node.as_mut() {
            node.next = next;
        }
    }

    fn set_prev(&mut self, index: u32, prev: Option<u32>) {
        if let Some(node) = self.slots[index as usize].node.as_mut() {
            node.prev = prev;
        }
    }

    fn node(&self, index: u32) -> Option<&Node<T>> {
        self.slots.get(index as usize)?.node.as_ref()
    }

    fn handle(&self, index: u32) -> NodeId {
        NodeId {
            list: self.id,
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn resolve(&self, id: NodeId) -> Option<u32> {
        if id.list != self.id {
            return None;
        }
        let slot = self.slots.get(id.index as usize)?;
        (slot.generation == id.generation && slot.node.is_some()).then_some(id.index)
    }
}

impl<T> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(handle, value)` pairs in list order
pub struct Iter<'a, T> {
    list: &'a IntrusiveList<T>,
    cursor: Option<u32>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let node = self.list.node(index)?;
        self.cursor = node.next;
        Some((self.list.handle(index), &node.value))
    }
}

impl<'a, T> IntoIterator for &'a IntrusiveList<T> {
    type Item = (NodeId, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
