//! Thread-safe bounded and unbounded producer/consumer channels.
//!
//! All channels here share the same construction: one [`parking_lot::Mutex`]
//! around the storage, condition variables for the `not_empty` / `not_full`
//! transitions, and a single [`Wait`] parameter selecting non-blocking,
//! indefinite, or bounded-wait behavior per call:
//!
//! | Type | Storage | Put can fail | Get can fail |
//! |------|---------|--------------|--------------|
//! | [`SlotChannel`] | fixed `capacity × slot_size` byte arena | full, size mismatch | empty, small buffer |
//! | [`Bounded<T>`] | fixed ring of `T` | full | empty |
//! | [`Unbounded<T>`] | growable deque of `T` | never | empty |
//! | [`BytePipe`] | growable byte deque | never | empty (returns 0) |
//!
//! "Can fail" above means the transient "not right now" outcome; a timed or
//! non-blocking call that fails is guaranteed to have made no state change.
//!
//! FIFO order is guaranteed per channel instance in mutex-acquisition order;
//! nothing is ordered across distinct channels.

mod cursor;
mod element;
mod pipe;
mod slot;
mod wait;

pub use element::{Bounded, RecvError, SendError, Unbounded};
pub use pipe::BytePipe;
pub use slot::{SlotChannel, SlotRecvError, SlotSendError};
pub use wait::Wait;

pub(crate) use cursor::RingCursor;
pub(crate) use wait::block_on;
