//! Typed element channels: bounded ring and unbounded deque.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use super::{block_on, RingCursor, Wait};
use crate::error::{SluiceError, SluiceResult};

/// Why a [`Bounded::put`] did not complete. Carries the rejected value back
/// so the caller keeps ownership.
#[derive(Debug, PartialEq, Eq)]
pub enum SendError<T> {
    /// Every slot is occupied and the call did not wait.
    Full(T),
    /// The bounded wait expired with every slot still occupied.
    Timeout(T),
}

impl<T> SendError<T> {
    /// Recover the value that was not sent.
    pub fn into_inner(self) -> T {
        match self {
            SendError::Full(v) | SendError::Timeout(v) => v,
        }
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Full(_) => write!(f, "channel is full"),
            SendError::Timeout(_) => write!(f, "timed out waiting for a free slot"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for SendError<T> {}

/// Why a [`Bounded::get`] or [`Unbounded::pop`] did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvError {
    /// Nothing buffered and the call did not wait.
    #[error("channel is empty")]
    Empty,
    /// The bounded wait expired with nothing buffered.
    #[error("timed out waiting for data")]
    Timeout,
}

struct BoundedState<T> {
    cursor: RingCursor,
    /// `None` marks a vacant slot; occupancy is decided by the cursor, the
    /// options only exist so values can be moved out without `unsafe`.
    slots: Box<[Option<T>]>,
}

/// Bounded FIFO of owned values — the typed twin of
/// [`SlotChannel`](super::SlotChannel), same state machine, same wait
/// semantics.
pub struct Bounded<T> {
    state: Mutex<BoundedState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> Bounded<T> {
    /// Create a channel holding up to `capacity` values. Capacity must be
    /// non-zero.
    pub fn new(capacity: usize) -> SluiceResult<Self> {
        if capacity == 0 {
            return Err(SluiceError::invalid_input("bounded channel capacity must be > 0"));
        }
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Ok(Self {
            state: Mutex::new(BoundedState {
                cursor: RingCursor::new(capacity),
                slots: slots.into_boxed_slice(),
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        })
    }

    /// Move `value` into the channel. On failure the value is handed back
    /// inside the error and the channel is unchanged.
    pub fn put(&self, value: T, wait: Wait) -> Result<(), SendError<T>> {
        let mut state = self.state.lock();
        if !block_on(&self.not_full, &mut state, wait, |s| !s.cursor.is_full()) {
            drop(state);
            return Err(match wait {
                Wait::NoWait => SendError::Full(value),
                _ => SendError::Timeout(value),
            });
        }
        let index = match state.cursor.push() {
            Some(i) => i,
            None => return Err(SendError::Full(value)),
        };
        state.slots[index] = Some(value);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove and return the oldest value.
    pub fn get(&self, wait: Wait) -> Result<T, RecvError> {
        let mut state = self.state.lock();
        if !block_on(&self.not_empty, &mut state, wait, |s| !s.cursor.is_empty()) {
            return Err(match wait {
                Wait::NoWait => RecvError::Empty,
                _ => RecvError::Timeout,
            });
        }
        let index = match state.cursor.pop() {
            Some(i) => i,
            None => return Err(RecvError::Empty),
        };
        let value = state.slots[index].take().ok_or(RecvError::Empty)?;
        drop(state);
        self.not_full.notify_one();
        Ok(value)
    }

    /// Clone the oldest value without removing it. `None` when empty —
    /// unlike [`Unbounded::peek`], emptiness is not a usage error here.
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        let state = self.state.lock();
        let index = state.cursor.peek()?;
        state.slots[index].clone()
    }

    /// Drop all buffered values and wake every waiter on both conditions.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.cursor.clear();
        for slot in state.slots.iter_mut() {
            *slot = None;
        }
        drop(state);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Buffered value count at the instant of the call; advisory under
    /// concurrent use.
    pub fn len(&self) -> usize {
        self.state.lock().cursor.len()
    }

    /// Advisory emptiness snapshot.
    pub fn is_empty(&self) -> bool {
        self.state.lock().cursor.is_empty()
    }

    /// Advisory fullness snapshot.
    pub fn is_full(&self) -> bool {
        self.state.lock().cursor.is_full()
    }

    /// Slot count, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Unbounded FIFO of owned values backed by a growable deque.
///
/// [`push`](Self::push) never fails; only consumption can come up empty.
pub struct Unbounded<T> {
    queue: Mutex<VecDeque<T>>,
    not_empty: Condvar,
}

impl<T> Unbounded<T> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
        }
    }

    /// Append a value. Never blocks, never fails (allocation failure
    /// aborts, as everywhere else in the process).
    pub fn push(&self, value: T) {
        let mut queue = self.queue.lock();
        queue.push_back(value);
        drop(queue);
        self.not_empty.notify_one();
    }

    /// Remove and return the oldest value.
    pub fn pop(&self, wait: Wait) -> Result<T, RecvError> {
        let mut queue = self.queue.lock();
        if !block_on(&self.not_empty, &mut queue, wait, |q| !q.is_empty()) {
            return Err(match wait {
                Wait::NoWait => RecvError::Empty,
                _ => RecvError::Timeout,
            });
        }
        queue.pop_front().ok_or(RecvError::Empty)
    }

    /// Clone the oldest value without removing it.
    ///
    /// # Panics
    ///
    /// Panics if the channel is empty. Callers of this variant assume data
    /// is already present; check [`is_empty`](Self::is_empty) or use
    /// [`pop`](Self::pop) when emptiness is an expected outcome.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.queue
            .lock()
            .front()
            .cloned()
            .unwrap_or_else(|| panic!("peek on empty unbounded channel"))
    }

    /// Drop all buffered values and wake every waiter so it re-checks.
    pub fn clear(&self) {
        let mut queue = self.queue.lock();
        queue.clear();
        drop(queue);
        self.not_empty.notify_all();
    }

    /// Buffered value count at the instant of the call; advisory under
    /// concurrent use.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Advisory emptiness snapshot.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<T> Default for Unbounded<T> {
    fn default() -> Self {
        Self::new()
    }
}
