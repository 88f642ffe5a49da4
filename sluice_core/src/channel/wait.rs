//! Blocking policy shared by every channel in this crate.
//!
//! The non-blocking / indefinite / bounded-wait axis is expressed as a single
//! [`Wait`] parameter instead of parallel `*Blocking` method families. All
//! waiting goes through [`block_on`], which re-evaluates its predicate after
//! every wakeup — a wake caused by `notify_all` (e.g. from `clear`) or by a
//! spurious OS wakeup never lets a caller proceed with a false predicate.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, MutexGuard};

/// How long a channel operation may block waiting for space or data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Return immediately if the operation cannot proceed right now.
    NoWait,
    /// Block until the operation can proceed.
    Forever,
    /// Block up to the given duration, then give up.
    For(Duration),
}

impl Wait {
    /// Map the conventional signed-millisecond timeout: negative waits
    /// indefinitely, zero does not wait, positive bounds the wait.
    pub fn from_millis(timeout_ms: i64) -> Self {
        match timeout_ms {
            ms if ms < 0 => Wait::Forever,
            0 => Wait::NoWait,
            ms => Wait::For(Duration::from_millis(ms as u64)),
        }
    }
}

impl From<Duration> for Wait {
    fn from(d: Duration) -> Self {
        Wait::For(d)
    }
}

/// Wait on `cond` until `ready` returns true or the wait policy runs out.
///
/// Returns `true` if the predicate held when the wait ended. The guard is
/// held on return either way; a `false` return guarantees no state change
/// was made by this call.
pub(crate) fn block_on<T, F>(
    cond: &Condvar,
    guard: &mut MutexGuard<'_, T>,
    wait: Wait,
    mut ready: F,
) -> bool
where
    F: FnMut(&T) -> bool,
{
    if ready(guard) {
        return true;
    }
    match wait {
        Wait::NoWait => false,
        Wait::Forever => {
            while !ready(guard) {
                cond.wait(guard);
            }
            true
        }
        Wait::For(timeout) => {
            let deadline = Instant::now() + timeout;
            while !ready(guard) {
                if cond.wait_until(guard, deadline).timed_out() {
                    // Last chance: the notifier may have raced the timeout.
                    return ready(guard);
                }
            }
            true
        }
    }
}
