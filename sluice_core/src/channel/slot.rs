//! Fixed-slot ring channel: `capacity` slots of exactly `slot_size` bytes.

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use super::{block_on, RingCursor, Wait};
use crate::error::{SluiceError, SluiceResult};

/// Why a [`SlotChannel::put`] did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotSendError {
    /// Every slot is occupied and the call did not wait.
    #[error("channel is full")]
    Full,
    /// The bounded wait expired with every slot still occupied.
    #[error("timed out waiting for a free slot")]
    Timeout,
    /// The payload does not match the channel's slot size. Caller error;
    /// partial writes are never performed.
    #[error("payload is {got} bytes but slots hold {expected}")]
    SizeMismatch { expected: usize, got: usize },
}

/// Why a [`SlotChannel::get`] or [`SlotChannel::peek`] did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotRecvError {
    /// No slot is occupied and the call did not wait.
    #[error("channel is empty")]
    Empty,
    /// The bounded wait expired with no slot occupied.
    #[error("timed out waiting for data")]
    Timeout,
    /// The destination buffer cannot hold one slot. Caller error.
    #[error("buffer is {got} bytes but slots hold {needed}")]
    BufferTooSmall { needed: usize, got: usize },
}

struct SlotState {
    cursor: RingCursor,
    /// `capacity × slot_size` bytes, slot `i` at `i * slot_size`.
    arena: Box<[u8]>,
}

/// Bounded FIFO of fixed-size byte records.
///
/// One mutex, two condition variables (`not_empty`, `not_full`). Producers
/// and consumers hold the lock only for the duration of one bounded memcpy;
/// only calls with a non-`NoWait` [`Wait`] ever block.
///
/// ```
/// use sluice_core::{SlotChannel, Wait};
///
/// let ch = SlotChannel::new(8, 4).unwrap();
/// ch.put(b"ping", Wait::NoWait).unwrap();
/// let mut buf = [0u8; 4];
/// ch.get(&mut buf, Wait::NoWait).unwrap();
/// assert_eq!(&buf, b"ping");
/// ```
pub struct SlotChannel {
    state: Mutex<SlotState>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    slot_size: usize,
}

impl SlotChannel {
    /// Create a channel with `capacity` slots of `slot_size` bytes each.
    ///
    /// Both must be non-zero.
    pub fn new(capacity: usize, slot_size: usize) -> SluiceResult<Self> {
        if capacity == 0 {
            return Err(SluiceError::invalid_input("slot channel capacity must be > 0"));
        }
        if slot_size == 0 {
            return Err(SluiceError::invalid_input("slot size must be > 0"));
        }
        Ok(Self {
            state: Mutex::new(SlotState {
                cursor: RingCursor::new(capacity),
                arena: vec![0u8; capacity * slot_size].into_boxed_slice(),
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            slot_size,
        })
    }

    /// Copy one record into the channel.
    ///
    /// `data` must be exactly [`slot_size`](Self::slot_size) bytes; a
    /// mismatch fails immediately without waiting. A failed call — full,
    /// mismatch, or timeout — makes no state change.
    pub fn put(&self, data: &[u8], wait: Wait) -> Result<(), SlotSendError> {
        if data.len() != self.slot_size {
            return Err(SlotSendError::SizeMismatch {
                expected: self.slot_size,
                got: data.len(),
            });
        }
        let mut state = self.state.lock();
        if !block_on(&self.not_full, &mut state, wait, |s| !s.cursor.is_full()) {
            return Err(match wait {
                Wait::NoWait => SlotSendError::Full,
                _ => SlotSendError::Timeout,
            });
        }
        let index = match state.cursor.push() {
            Some(i) => i,
            // block_on returned with the predicate true under this lock
            None => return Err(SlotSendError::Full),
        };
        let offset = index * self.slot_size;
        state.arena[offset..offset + self.slot_size].copy_from_slice(data);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest record and copy it into `buf[..slot_size]`.
    ///
    /// `buf` must hold at least one slot. A failed call makes no state
    /// change; bytes past `slot_size` in `buf` are never touched.
    pub fn get(&self, buf: &mut [u8], wait: Wait) -> Result<(), SlotRecvError> {
        if buf.len() < self.slot_size {
            return Err(SlotRecvError::BufferTooSmall {
                needed: self.slot_size,
                got: buf.len(),
            });
        }
        let mut state = self.state.lock();
        if !block_on(&self.not_empty, &mut state, wait, |s| !s.cursor.is_empty()) {
            return Err(match wait {
                Wait::NoWait => SlotRecvError::Empty,
                _ => SlotRecvError::Timeout,
            });
        }
        let index = match state.cursor.pop() {
            Some(i) => i,
            None => return Err(SlotRecvError::Empty),
        };
        let offset = index * self.slot_size;
        buf[..self.slot_size].copy_from_slice(&state.arena[offset..offset + self.slot_size]);
        drop(state);
        self.not_full.notify_one();
        Ok(())
    }

    /// Copy the oldest record without removing it. Never blocks.
    pub fn peek(&self, buf: &mut [u8]) -> Result<(), SlotRecvError> {
        if buf.len() < self.slot_size {
            return Err(SlotRecvError::BufferTooSmall {
                needed: self.slot_size,
                got: buf.len(),
            });
        }
        let state = self.state.lock();
        let index = state.cursor.peek().ok_or(SlotRecvError::Empty)?;
        let offset = index * self.slot_size;
        buf[..self.slot_size].copy_from_slice(&state.arena[offset..offset + self.slot_size]);
        Ok(())
    }

    /// Discard all buffered records.
    ///
    /// Slot bytes are not zeroed — callers must not assume cleared memory.
    /// Both condition variables are notified so indefinitely blocked puts
    /// re-observe free space and blocked gets re-observe emptiness (and
    /// resume waiting).
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.cursor.clear();
        drop(state);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Number of occupied slots at the instant of the call.
    ///
    /// Advisory only: with concurrent producers/consumers the value may be
    /// stale by the time the caller acts on it.
    pub fn len(&self) -> usize {
        self.state.lock().cursor.len()
    }

    /// Whether the channel held no records at the instant of the call.
    /// Advisory, like [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.state.lock().cursor.is_empty()
    }

    /// Whether every slot was occupied at the instant of the call.
    /// Advisory, like [`len`](Self::len).
    pub fn is_full(&self) -> bool {
        self.state.lock().cursor.is_full()
    }

    /// Number of slots, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes per slot, fixed at construction.
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }
}
