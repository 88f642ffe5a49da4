//! Cross-process shared memory.
//!
//! [`SharedMemorySegment`] wraps the platform's named shared-memory
//! primitive behind one create/open/attach/detach/destroy state machine,
//! with the same offset-addressed, bounds-checked read/write contract as
//! the in-process channels. See `backend` for the per-platform mapping
//! code (POSIX `shm_open` + `mmap`, Windows named file mappings).

mod backend;
mod segment;

pub use segment::SharedMemorySegment;
