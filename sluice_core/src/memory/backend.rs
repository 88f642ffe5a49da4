//! Platform backends for named shared-memory segments.
//!
//! One trait, two implementations selected at build time:
//! - Unix: POSIX `shm_open` + `mmap` (via `libc` and `memmap2`). Removal is
//!   `shm_unlink` — the name disappears immediately, the storage once the
//!   last mapping goes away.
//! - Windows: pagefile-backed named file mappings
//!   (`CreateFileMappingW` / `OpenFileMappingW`). The OS removes the object
//!   when the last handle closes; an explicit removal request is therefore
//!   best-effort.
//!
//! Exclusive-create semantics hold on both: `create` fails if the name
//! already exists, `open` fails if it does not.

use crate::error::{SluiceError, SluiceResult};

/// One attached platform mapping. Dropping a backend unmaps (detaches) it.
pub(crate) trait SegmentBackend: Send {
    /// Base address of the mapping, valid for `len` bytes while attached.
    fn base(&self) -> *mut u8;

    /// Mapped length in bytes.
    fn len(&self) -> usize;

    /// Ask the OS to remove the named object (owner-only path). Existing
    /// attachments stay valid; subsequent opens of the name fail.
    fn unlink(&mut self) -> SluiceResult<()>;
}

/// Namespaced OS-level name for a segment identity.
fn segment_name(identity: &str) -> SluiceResult<String> {
    if identity.is_empty() {
        return Err(SluiceError::invalid_input("segment identity must not be empty"));
    }
    Ok(format!("sluice_{}", identity))
}

// ============================================================================
// Unix - POSIX shm_open + mmap
// ============================================================================

#[cfg(unix)]
mod posix {
    use std::ffi::CString;
    use std::fs::File;
    use std::os::fd::FromRawFd;

    use memmap2::{MmapMut, MmapOptions};

    use super::{segment_name, SegmentBackend};
    use crate::error::{SluiceError, SluiceResult};

    pub(crate) struct PosixSegment {
        mmap: MmapMut,
        /// Keeps the shm fd open for the lifetime of the mapping.
        _file: File,
        name: CString,
        size: usize,
    }

    fn shm_cstring(identity: &str) -> SluiceResult<CString> {
        let name = format!("/{}", segment_name(identity)?);
        CString::new(name).map_err(|_| {
            SluiceError::invalid_input("segment identity must not contain null bytes")
        })
    }

    pub(crate) fn create(identity: &str, size: usize) -> SluiceResult<PosixSegment> {
        let name = shm_cstring(identity)?;

        // SAFETY: name is a valid null-terminated CString; flags are valid
        // POSIX constants. O_EXCL gives exclusive-create semantics.
        let fd = unsafe {
            libc::shm_open(name.as_ptr(), libc::O_CREAT | libc::O_EXCL | libc::O_RDWR, 0o666)
        };
        if fd < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EEXIST) {
                return Err(SluiceError::AlreadyExists(format!(
                    "shared-memory segment '{}'",
                    identity
                )));
            }
            log::warn!("shm_open(create '{}') failed: {}", identity, err);
            return Err(SluiceError::memory(format!(
                "failed to create shm '{}': {}",
                identity, err
            )));
        }

        // SAFETY: fd is a valid descriptor from shm_open above.
        if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
            let err = std::io::Error::last_os_error();
            // SAFETY: fd is valid; name is a valid CString. Roll back the
            // half-created object so retry is safe.
            unsafe {
                libc::close(fd);
                libc::shm_unlink(name.as_ptr());
            }
            log::warn!("ftruncate on shm '{}' to {} bytes failed: {}", identity, size, err);
            return Err(SluiceError::memory(format!(
                "failed to size shm '{}' to {} bytes: {}",
                identity, size, err
            )));
        }

        // SAFETY: fd is a valid, owned shm descriptor; File takes ownership
        // and closes it on drop.
        let file = unsafe { File::from_raw_fd(fd) };

        // SAFETY: file is open read/write with its length set above; len
        // matches the object size.
        let mut mmap = match unsafe { MmapOptions::new().len(size).map_mut(&file) } {
            Ok(m) => m,
            Err(err) => {
                // SAFETY: name is a valid CString; undo the create.
                unsafe {
                    libc::shm_unlink(name.as_ptr());
                }
                log::warn!("mmap of shm '{}' failed: {}", identity, err);
                return Err(SluiceError::memory(format!(
                    "failed to map shm '{}': {}",
                    identity, err
                )));
            }
        };

        // Fresh segments read as zeroes, never stale kernel pages.
        mmap.fill(0);

        Ok(PosixSegment {
            mmap,
            _file: file,
            name,
            size,
        })
    }

    pub(crate) fn open(identity: &str, size: usize) -> SluiceResult<PosixSegment> {
        let name = shm_cstring(identity)?;

        // SAFETY: name is a valid null-terminated CString; no O_CREAT, so
        // this only attaches to an existing object.
        let fd = unsafe { libc::shm_open(name.as_ptr(), libc::O_RDWR, 0o666) };
        if fd < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ENOENT) {
                return Err(SluiceError::NotFound(format!(
                    "shared-memory segment '{}'",
                    identity
                )));
            }
            log::warn!("shm_open(open '{}') failed: {}", identity, err);
            return Err(SluiceError::memory(format!(
                "failed to open shm '{}': {}",
                identity, err
            )));
        }

        // SAFETY: fd is a valid, owned shm descriptor.
        let file = unsafe { File::from_raw_fd(fd) };

        // Grow the object if the existing one is smaller than the caller's
        // expected extent, so the mapping below is fully backed.
        let actual = file.metadata().map_err(|e| {
            SluiceError::memory(format!("failed to stat shm '{}': {}", identity, e))
        })?;
        if actual.len() < size as u64 {
            file.set_len(size as u64).map_err(|e| {
                SluiceError::memory(format!(
                    "failed to grow shm '{}' to {} bytes: {}",
                    identity, size, e
                ))
            })?;
        }

        // SAFETY: file is open read/write and at least `size` bytes long.
        let mmap = unsafe { MmapOptions::new().len(size).map_mut(&file) }.map_err(|err| {
            log::warn!("mmap of shm '{}' failed: {}", identity, err);
            SluiceError::memory(format!("failed to map shm '{}': {}", identity, err))
        })?;

        Ok(PosixSegment {
            mmap,
            _file: file,
            name,
            size,
        })
    }

    impl SegmentBackend for PosixSegment {
        fn base(&self) -> *mut u8 {
            self.mmap.as_ptr() as *mut u8
        }

        fn len(&self) -> usize {
            self.size
        }

        fn unlink(&mut self) -> SluiceResult<()> {
            // SAFETY: self.name is a valid null-terminated CString.
            if unsafe { libc::shm_unlink(self.name.as_ptr()) } != 0 {
                let err = std::io::Error::last_os_error();
                log::warn!("shm_unlink('{:?}') failed: {}", self.name, err);
                return Err(SluiceError::memory(format!(
                    "failed to unlink shm: {}",
                    err
                )));
            }
            Ok(())
        }
    }
}

#[cfg(unix)]
pub(crate) fn create(identity: &str, size: usize) -> SluiceResult<Box<dyn SegmentBackend>> {
    posix::create(identity, size).map(|s| Box::new(s) as Box<dyn SegmentBackend>)
}

#[cfg(unix)]
pub(crate) fn open(identity: &str, size: usize) -> SluiceResult<Box<dyn SegmentBackend>> {
    posix::open(identity, size).map(|s| Box::new(s) as Box<dyn SegmentBackend>)
}

// ============================================================================
// Windows - CreateFileMappingW with pagefile backing
// ============================================================================

#[cfg(windows)]
mod windows {
    use windows_sys::Win32::Foundation::{
        CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, INVALID_HANDLE_VALUE,
    };
    use windows_sys::Win32::System::Memory::{
        CreateFileMappingW, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile,
        FILE_MAP_ALL_ACCESS, PAGE_READWRITE,
    };

    use super::{segment_name, SegmentBackend};
    use crate::error::{SluiceError, SluiceResult};

    pub(crate) struct WindowsSegment {
        ptr: *mut u8,
        handle: isize, // HANDLE
        size: usize,
    }

    // SAFETY: the mapping is plain OS shared memory with no thread affinity;
    // all access is serialized by the owning segment's mutex.
    unsafe impl Send for WindowsSegment {}

    fn wide_name(identity: &str) -> SluiceResult<Vec<u16>> {
        let name = format!("Local\\{}", segment_name(identity)?);
        Ok(name.encode_utf16().chain(std::iter::once(0)).collect())
    }

    fn map_view(handle: isize, size: usize, identity: &str) -> SluiceResult<*mut u8> {
        // SAFETY: handle is a valid file-mapping handle (checked non-zero by
        // the callers); size matches the requested view extent.
        let ptr = unsafe { MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, size) };
        if ptr.is_null() {
            // SAFETY: GetLastError is always safe after an API failure;
            // handle is valid and must be released on this error path.
            let code = unsafe { GetLastError() };
            unsafe { CloseHandle(handle) };
            log::warn!("MapViewOfFile for shm '{}' failed: error {}", identity, code);
            return Err(SluiceError::memory(format!(
                "failed to map shm '{}': error {}",
                identity, code
            )));
        }
        Ok(ptr as *mut u8)
    }

    pub(crate) fn create(identity: &str, size: usize) -> SluiceResult<WindowsSegment> {
        let name = wide_name(identity)?;

        // SAFETY: INVALID_HANDLE_VALUE requests a pagefile-backed mapping;
        // name is a valid null-terminated wide string.
        let handle = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                std::ptr::null(),
                PAGE_READWRITE,
                (size as u64 >> 32) as u32,
                size as u32,
                name.as_ptr(),
            )
        };
        if handle == 0 {
            // SAFETY: GetLastError is always safe after an API failure.
            let code = unsafe { GetLastError() };
            log::warn!("CreateFileMappingW for shm '{}' failed: error {}", identity, code);
            return Err(SluiceError::memory(format!(
                "failed to create shm '{}': error {}",
                identity, code
            )));
        }

        // Exclusive-create: an existing object under this name is a failure.
        // SAFETY: GetLastError is always safe to call after the API call.
        if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
            // SAFETY: handle is a valid handle from CreateFileMappingW.
            unsafe { CloseHandle(handle) };
            return Err(SluiceError::AlreadyExists(format!(
                "shared-memory segment '{}'",
                identity
            )));
        }

        let ptr = map_view(handle, size, identity)?;

        // Fresh segments read as zeroes. Pagefile-backed views are zeroed by
        // the OS already, but keep the guarantee explicit and uniform.
        // SAFETY: ptr is a valid mapping of `size` bytes (null checked).
        unsafe { std::ptr::write_bytes(ptr, 0, size) };

        Ok(WindowsSegment { ptr, handle, size })
    }

    pub(crate) fn open(identity: &str, size: usize) -> SluiceResult<WindowsSegment> {
        let name = wide_name(identity)?;

        // SAFETY: name is a valid null-terminated wide string.
        let handle = unsafe { OpenFileMappingW(FILE_MAP_ALL_ACCESS, 0, name.as_ptr()) };
        if handle == 0 {
            return Err(SluiceError::NotFound(format!(
                "shared-memory segment '{}'",
                identity
            )));
        }

        let ptr = map_view(handle, size, identity)?;
        Ok(WindowsSegment { ptr, handle, size })
    }

    impl SegmentBackend for WindowsSegment {
        fn base(&self) -> *mut u8 {
            self.ptr
        }

        fn len(&self) -> usize {
            self.size
        }

        fn unlink(&mut self) -> SluiceResult<()> {
            // Named mappings are reference counted by the OS; the object
            // disappears when the last handle closes. Nothing to do here —
            // dropping this backend releases our handle.
            Ok(())
        }
    }

    impl Drop for WindowsSegment {
        fn drop(&mut self) {
            // SAFETY: ptr is a valid mapped view and handle a valid mapping
            // handle; both were checked at construction.
            unsafe {
                UnmapViewOfFile(self.ptr as *const std::ffi::c_void);
                CloseHandle(self.handle);
            }
        }
    }
}

#[cfg(windows)]
pub(crate) fn create(identity: &str, size: usize) -> SluiceResult<Box<dyn SegmentBackend>> {
    windows::create(identity, size).map(|s| Box::new(s) as Box<dyn SegmentBackend>)
}

#[cfg(windows)]
pub(crate) fn open(identity: &str, size: usize) -> SluiceResult<Box<dyn SegmentBackend>> {
    windows::open(identity, size).map(|s| Box::new(s) as Box<dyn SegmentBackend>)
}
