//! Reorder Buffer (ROB) ring queue.
//!
//! The ROB and the retiring ROB (rROB) are both bounded FIFOs of instruction
//! handles in program order. The queue provides:
//! 1. **Allocation:** Push at the tail (rename, or promotion into the rROB).
//! 2. **In-order Removal:** Pop from the head only; the head is always the oldest entry.
//! 3. **Inspection:** Peek by offset from the head, and head-to-tail iteration.
//!
//! Storage is a pre-allocated ring; slots are reset in place when popped.

use crate::core::pipeline::dinst::InstHandle;

/// Bounded ring of in-flight instruction handles.
#[derive(Clone, Debug)]
pub struct Rob {
    /// Fixed-size slot array.
    entries: Vec<Option<InstHandle>>,
    /// Index of the oldest entry.
    head: usize,
    /// Index where the next entry will be pushed.
    tail: usize,
    /// Number of occupied entries.
    count: usize,
}

impl Rob {
    /// Creates a new ROB with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let mut entries = Vec::with_capacity(capacity);
        entries.resize_with(capacity, || None);
        Self {
            entries,
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Returns the ROB capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the ROB is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the ROB is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.entries.len()
    }

    /// Appends a handle at the tail. Returns false (and stores nothing) if full.
    pub fn push(&mut self, handle: InstHandle) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries[self.tail] = Some(handle);
        self.tail = (self.tail + 1) % self.entries.len();
        self.count += 1;
        true
    }

    /// Returns the oldest handle without removing it.
    #[inline]
    pub fn top(&self) -> Option<InstHandle> {
        if self.count == 0 {
            None
        } else {
            self.entries[self.head]
        }
    }

    /// Removes and returns the oldest handle.
    pub fn pop(&mut self) -> Option<InstHandle> {
        if self.count == 0 {
            return None;
        }
        let handle = self.entries[self.head].take();
        self.head = (self.head + 1) % self.entries.len();
        self.count -= 1;
        handle
    }

    /// Returns the handle `offset` positions younger than the head.
    pub fn get(&self, offset: usize) -> Option<InstHandle> {
        if offset >= self.count {
            return None;
        }
        self.entries[(self.head + offset) % self.entries.len()]
    }

    /// Iterates from head (oldest) to tail (youngest).
    pub fn iter(&self) -> impl Iterator<Item = InstHandle> + '_ {
        (0..self.count).filter_map(move |offset| self.get(offset))
    }
}
