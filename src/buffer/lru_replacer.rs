use std::collections::HashMap;

use crate::common::PageId;

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node {
    page_id: PageId,
    prev: usize,
    next: usize,
}

/// Strict LRU ordering over cached pages.
///
/// Nodes live in an arena and link to each other by index, giving O(1)
/// promotion, removal and victim selection. `head` is the most recently used
/// page and `tail` the least recently used one. Freed arena slots are reused.
///
/// The replacer is not synchronized; the buffer pool mutates it only while
/// holding its state lock, so the chain ends always match the true chain.
#[derive(Debug)]
pub struct LruReplacer {
    nodes: Vec<Node>,
    index: HashMap<PageId, usize>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    /// Records an access, making `page_id` the most recently used page.
    /// Untracked pages start being tracked.
    pub fn record_access(&mut self, page_id: PageId) {
        if let Some(&idx) = self.index.get(&page_id) {
            self.unlink(idx);
            self.push_front(idx);
            return;
        }

        let node = Node {
            page_id,
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.index.insert(page_id, idx);
        self.push_front(idx);
    }

    /// Returns the least recently used page without removing it.
    pub fn victim(&self) -> Option<PageId> {
        if self.tail == NIL {
            None
        } else {
            Some(self.nodes[self.tail].page_id)
        }
    }

    /// Removes and returns the least recently used page.
    #[cfg(test)]
    pub fn evict(&mut self) -> Option<PageId> {
        let page_id = self.victim()?;
        self.remove(page_id);
        Some(page_id)
    }

    /// Stops tracking `page_id`. No-op if it is not tracked.
    pub fn remove(&mut self, page_id: PageId) {
        if let Some(idx) = self.index.remove(&page_id) {
            self.unlink(idx);
            self.free.push(idx);
        }
    }

    #[cfg(test)]
    pub fn contains(&self, page_id: PageId) -> bool {
        self.index.contains_key(&page_id)
    }

    /// Returns the number of tracked pages.
    pub fn size(&self) -> usize {
        self.index.len()
    }

    /// Tracked pages from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = PageId> + '_ {
        let mut cur = self.head;
        std::iter::from_fn(move || {
            if cur == NIL {
                return None;
            }
            let node = &self.nodes[cur];
            cur = node.next;
            Some(node.page_id)
        })
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        if prev == NIL {
            self.head = next;
        } else {
            self.nodes[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.nodes[next].prev = prev;
        }
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }

    fn push_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}
