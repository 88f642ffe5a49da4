//! Cross-process shared-memory segment with a two-party lifecycle.

use parking_lot::Mutex;

use super::backend::{self, SegmentBackend};
use crate::error::{SluiceError, SluiceResult};

struct Attachment {
    backend: Box<dyn SegmentBackend>,
    identity: String,
    owner: bool,
}

/// Named OS shared-memory segment.
///
/// Lifecycle: `Unattached → (create | open) → attached → detach →
/// Unattached`. Exactly one instance per identity is the *owner* — the one
/// that created the segment — and only the owner may
/// [`destroy`](Self::destroy) it. Removal follows POSIX semantics: the name
/// goes away
/// immediately, the storage once the last attachment is released (on
/// Windows the OS reference-counts handles instead, so removal is
/// best-effort-immediate).
///
/// The internal mutex serializes *this process's* view (the mapped pointer
/// and the read/write call sequence). It provides no inter-process mutual
/// exclusion: writers in different processes can race on the same bytes,
/// by design — coordination belongs to a higher-level protocol.
///
/// A failed `create`/`open` leaves the instance unattached, so retry is
/// always safe.
pub struct SharedMemorySegment {
    state: Mutex<Option<Attachment>>,
}

impl SharedMemorySegment {
    /// New, unattached instance.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    /// Create a new OS segment of `size` bytes under `identity` and attach
    /// to it as owner. Memory starts zero-filled.
    ///
    /// Fails with [`SluiceError::AlreadyExists`] if a segment with that
    /// identity exists (exclusive create), [`SluiceError::InvalidInput`]
    /// for a zero size or an already-attached instance.
    pub fn create(&self, identity: &str, size: usize) -> SluiceResult<()> {
        if size == 0 {
            return Err(SluiceError::invalid_input("shared-memory size must be > 0"));
        }
        let mut state = self.state.lock();
        if state.is_some() {
            return Err(SluiceError::invalid_input(
                "instance is already attached; detach first",
            ));
        }
        let backend = backend::create(identity, size)?;
        *state = Some(Attachment {
            backend,
            identity: identity.to_string(),
            owner: true,
        });
        Ok(())
    }

    /// Attach to an existing segment as a non-owner.
    ///
    /// `size` is the caller's expected extent; a smaller existing object is
    /// grown so at least `size` bytes are addressable. Fails with
    /// [`SluiceError::NotFound`] if no segment with that identity exists.
    pub fn open(&self, identity: &str, size: usize) -> SluiceResult<()> {
        if size == 0 {
            return Err(SluiceError::invalid_input("shared-memory size must be > 0"));
        }
        let mut state = self.state.lock();
        if state.is_some() {
            return Err(SluiceError::invalid_input(
                "instance is already attached; detach first",
            ));
        }
        let backend = backend::open(identity, size)?;
        *state = Some(Attachment {
            backend,
            identity: identity.to_string(),
            owner: false,
        });
        Ok(())
    }

    /// Copy up to `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// Returns the number of bytes copied: 0 if unattached or
    /// `offset >= size`, otherwise `min(buf.len(), size - offset)` — a
    /// partial result at the end of the segment, never wrapped or wrong
    /// data.
    pub fn read(&self, offset: usize, buf: &mut [u8]) -> usize {
        let state = self.state.lock();
        let att = match state.as_ref() {
            Some(att) => att,
            None => {
                drop(state);
                log::debug!("read on unattached shared-memory segment");
                return 0;
            }
        };
        let size = att.backend.len();
        if offset >= size {
            return 0;
        }
        let n = buf.len().min(size - offset);
        // SAFETY: the mapping is valid for `size` bytes while attached,
        // offset + n <= size, and buf holds at least n bytes; access is
        // serialized by the instance mutex held here.
        unsafe {
            std::ptr::copy_nonoverlapping(att.backend.base().add(offset), buf.as_mut_ptr(), n);
        }
        n
    }

    /// Copy up to `data.len()` bytes from `data` into the segment at
    /// `offset`. Same bounds contract as [`read`](Self::read).
    pub fn write(&self, offset: usize, data: &[u8]) -> usize {
        let state = self.state.lock();
        let att = match state.as_ref() {
            Some(att) => att,
            None => {
                drop(state);
                log::debug!("write on unattached shared-memory segment");
                return 0;
            }
        };
        let size = att.backend.len();
        if offset >= size {
            return 0;
        }
        let n = data.len().min(size - offset);
        // SAFETY: as in `read`; the mapping is writable (PROT_WRITE /
        // FILE_MAP_ALL_ACCESS) and the copy stays inside it.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), att.backend.base().add(offset), n);
        }
        n
    }

    /// Unmap the segment. Idempotent; a no-op when already unattached. The
    /// OS-level object persists for other attachments (and for a pending
    /// owner removal).
    pub fn detach(&self) {
        let mut state = self.state.lock();
        *state = None;
    }

    /// Request OS-level removal of the segment and detach this instance.
    ///
    /// Only the attached owner may destroy; anyone else gets
    /// [`SluiceError::PermissionDenied`] and no state change. After the
    /// last attachment anywhere is released the storage is reclaimed;
    /// subsequent opens of the same identity fail.
    pub fn destroy(&self) -> SluiceResult<()> {
        let mut state = self.state.lock();
        match state.as_mut() {
            None => Err(SluiceError::PermissionDenied(
                "destroy on an unattached segment instance".to_string(),
            )),
            Some(att) if !att.owner => Err(SluiceError::PermissionDenied(format!(
                "segment '{}' was opened, not created, by this instance",
                att.identity
            ))),
            Some(att) => {
                let result = att.backend.unlink();
                // Detach regardless: the name is gone (or going); holding
                // the mapping would only pin dead storage.
                *state = None;
                result
            }
        }
    }

    /// Whether this instance currently has a mapping.
    pub fn is_attached(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Whether this instance created (rather than opened) the segment.
    /// `false` when unattached.
    pub fn is_owner(&self) -> bool {
        self.state.lock().as_ref().map(|a| a.owner).unwrap_or(false)
    }

    /// Attached size in bytes; 0 when unattached.
    pub fn size(&self) -> usize {
        self.state.lock().as_ref().map(|a| a.backend.len()).unwrap_or(0)
    }

    /// Identity the instance is attached under, if any.
    pub fn identity(&self) -> Option<String> {
        self.state.lock().as_ref().map(|a| a.identity.clone())
    }
}

impl Default for SharedMemorySegment {
    fn default() -> Self {
        Self::new()
    }
}
