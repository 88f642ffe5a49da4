//! Circular head/tail/count bookkeeping for the bounded channels.
//!
//! One cursor implementation serves every ring variant so the full/empty
//! decision rule lives in exactly one place. Full and empty are
//! disambiguated by the occupancy counter (never the capacity+1 spare-slot
//! trick), so indices always stay in `[0, capacity)` and
//! `count == (tail - head) mod capacity` holds whenever the ring is not
//! completely full.

/// Head/tail/count triple governing circular slot addressing.
///
/// The cursor hands out slot indices; it never touches storage itself and
/// carries no synchronization — callers mutate it only under their own lock.
#[derive(Debug)]
pub(crate) struct RingCursor {
    head: usize,
    tail: usize,
    count: usize,
    capacity: usize,
}

impl RingCursor {
    /// Create a cursor over `capacity` slots. Callers validate `capacity > 0`.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            head: 0,
            tail: 0,
            count: 0,
            capacity,
        }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    /// Claim the slot at `tail` for a write. `None` when full.
    pub(crate) fn push(&mut self) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        let index = self.tail;
        self.tail = (self.tail + 1) % self.capacity;
        self.count += 1;
        self.check_invariant();
        Some(index)
    }

    /// Release the slot at `head` after a read. `None` when empty.
    pub(crate) fn pop(&mut self) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let index = self.head;
        self.head = (self.head + 1) % self.capacity;
        self.count -= 1;
        self.check_invariant();
        Some(index)
    }

    /// Slot index a non-destructive read would use. `None` when empty.
    pub(crate) fn peek(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.head)
        }
    }

    /// Reset to the empty state. Slot contents are untouched.
    pub(crate) fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    #[inline]
    fn check_invariant(&self) {
        debug_assert!(self.count <= self.capacity);
        // When not full, occupancy must agree with the index distance.
        debug_assert!(
            self.count == self.capacity
                || self.count == (self.tail + self.capacity - self.head) % self.capacity
        );
    }
}
