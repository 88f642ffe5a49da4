//! # sluice
//!
//! Thread-safe, fixed-capacity data-movement primitives for producer/
//! consumer hand-off:
//!
//! - **[`SlotChannel`]**: bounded ring of fixed-size byte records
//! - **[`Bounded<T>`] / [`Unbounded<T>`]**: typed element channels
//! - **[`BytePipe`]**: unbounded strict-FIFO byte stream
//! - **[`SharedMemorySegment`]**: named OS shared memory with a
//!   creator/opener lifecycle for cross-process hand-off
//!
//! Every primitive owns a single mutex (plus condition variables) — there
//! are no lock-free progress guarantees, just small critical sections
//! bounded by one memcpy. Blocking is opt-in per call through [`Wait`]:
//!
//! ```
//! use std::time::Duration;
//! use sluice_core::{SlotChannel, Wait};
//!
//! let ch = SlotChannel::new(16, 8)?;
//! ch.put(b"8 bytes!", Wait::NoWait)?;
//!
//! let mut buf = [0u8; 8];
//! ch.get(&mut buf, Wait::For(Duration::from_millis(50)))?;
//! assert_eq!(&buf, b"8 bytes!");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Transient outcomes (full, empty, timed out) are ordinary results, never
//! panics; a failed or timed-out call is guaranteed to have made no state
//! change. Diagnostics go through the [`log`] facade and are only emitted
//! at lifecycle failure points, never while a channel lock is held.

pub mod channel;
pub mod error;
pub mod memory;

pub use channel::{
    Bounded, BytePipe, RecvError, SendError, SlotChannel, SlotRecvError, SlotSendError,
    Unbounded, Wait,
};
pub use error::{SluiceError, SluiceResult};
pub use memory::SharedMemorySegment;
