//! Unbounded byte-stream pipe: strict FIFO over bytes, append at one end,
//! consume from the other.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use super::{block_on, Wait};

/// Copy up to `buf.len()` bytes from the front of `queue` into `buf`,
/// handling the deque's two-slice internal layout. The queue is unchanged.
fn copy_front(queue: &VecDeque<u8>, buf: &mut [u8]) -> usize {
    let n = buf.len().min(queue.len());
    let (front, back) = queue.as_slices();
    if n <= front.len() {
        buf[..n].copy_from_slice(&front[..n]);
    } else {
        buf[..front.len()].copy_from_slice(front);
        buf[front.len()..n].copy_from_slice(&back[..n - front.len()]);
    }
    n
}

/// Unbounded FIFO byte stream.
///
/// Writes always append in full; reads drain up to the requested count in
/// arrival order, independent of the granularity of the writes that
/// produced the bytes. A read returning 0 means "nothing available (in
/// time)" — there is no separate error channel for this primitive.
///
/// One mutex and a single `not_empty` condition variable; writes never
/// block, so no `not_full` condition exists.
pub struct BytePipe {
    queue: Mutex<VecDeque<u8>>,
    not_empty: Condvar,
}

impl BytePipe {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
        }
    }

    /// Append all of `data`; returns `data.len()`.
    ///
    /// Never blocks while the pipe is unbounded (allocation failure aborts
    /// the process, it is not a recoverable error here).
    pub fn write(&self, data: &[u8]) -> usize {
        let mut queue = self.queue.lock();
        queue.extend(data.iter().copied());
        drop(queue);
        self.not_empty.notify_one();
        data.len()
    }

    /// Remove up to `buf.len()` bytes in arrival order.
    ///
    /// With a non-`NoWait` policy the call waits for *at least one* byte —
    /// not for a full buffer — then drains what is available. Returns the
    /// number of bytes copied; 0 means empty (or timed out), with no state
    /// change.
    pub fn read(&self, buf: &mut [u8], wait: Wait) -> usize {
        if buf.is_empty() {
            return 0;
        }
        let mut queue = self.queue.lock();
        if !block_on(&self.not_empty, &mut queue, wait, |q| !q.is_empty()) {
            return 0;
        }
        let n = copy_front(&queue, buf);
        queue.drain(..n);
        n
    }

    /// Copy up to `buf.len()` bytes without removing them. Never blocks.
    pub fn peek(&self, buf: &mut [u8]) -> usize {
        let queue = self.queue.lock();
        copy_front(&queue, buf)
    }

    /// Discard all buffered bytes and wake every waiter so it re-checks.
    pub fn clear(&self) {
        let mut queue = self.queue.lock();
        queue.clear();
        drop(queue);
        self.not_empty.notify_all();
    }

    /// Buffered byte count at the instant of the call; advisory under
    /// concurrent use.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Advisory emptiness snapshot.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl Default for BytePipe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn write_returns_full_length() {
        let pipe = BytePipe::new();
        assert_eq!(pipe.write(b"hello"), 5);
        assert_eq!(pipe.write(b""), 0);
        assert_eq!(pipe.len(), 5);
    }

    #[test]
    fn read_drains_in_arrival_order_across_write_boundaries() {
        let pipe = BytePipe::new();
        pipe.write(b"ab");
        pipe.write(b"cdef");

        // One read spanning both writes
        let mut buf = [0u8; 3];
        assert_eq!(pipe.read(&mut buf, Wait::NoWait), 3);
        assert_eq!(&buf, b"abc");

        // Partial result when less is available than requested
        let mut buf = [0u8; 16];
        assert_eq!(pipe.read(&mut buf, Wait::NoWait), 3);
        assert_eq!(&buf[..3], b"def");
        assert!(pipe.is_empty());
    }

    #[test]
    fn read_empty_returns_zero() {
        let pipe = BytePipe::new();
        let mut buf = [0u8; 4];
        assert_eq!(pipe.read(&mut buf, Wait::NoWait), 0);
        assert_eq!(buf, [0u8; 4]);
    }

    #[test]
    fn peek_is_non_destructive() {
        let pipe = BytePipe::new();
        pipe.write(b"data");
        let mut a = [0u8; 4];
        let mut b = [0u8; 4];
        assert_eq!(pipe.peek(&mut a), 4);
        assert_eq!(pipe.peek(&mut b), 4);
        assert_eq!(a, b);
        assert_eq!(pipe.len(), 4);
    }

    #[test]
    fn wrapped_deque_layout_copies_correctly() {
        // Force the deque's internal ring to wrap so as_slices returns two
        // non-empty halves.
        let pipe = BytePipe::new();
        pipe.write(&[0u8; 9]);
        let mut scratch = [0u8; 9];
        pipe.read(&mut scratch, Wait::NoWait);
        let payload: Vec<u8> = (0..32).collect();
        pipe.write(&payload);

        let mut buf = vec![0u8; 32];
        assert_eq!(pipe.read(&mut buf, Wait::NoWait), 32);
        assert_eq!(buf, payload);
    }

    #[test]
    fn clear_discards_everything() {
        let pipe = BytePipe::new();
        pipe.write(b"stale");
        pipe.clear();
        assert!(pipe.is_empty());
        let mut buf = [0u8; 8];
        assert_eq!(pipe.read(&mut buf, Wait::NoWait), 0);
    }

    #[test]
    fn threaded_stream_preserves_byte_order() {
        let pipe = Arc::new(BytePipe::new());
        let total: usize = 64 * 1024;

        let writer = {
            let pipe = pipe.clone();
            std::thread::spawn(move || {
                let mut next = 0usize;
                // Deliberately irregular write sizes
                for chunk in [1usize, 7, 64, 513, 1024].iter().cycle() {
                    if next >= total {
                        break;
                    }
                    let n = (*chunk).min(total - next);
                    let data: Vec<u8> = (next..next + n).map(|i| (i % 251) as u8).collect();
                    pipe.write(&data);
                    next += n;
                }
            })
        };

        let mut received = Vec::with_capacity(total);
        let mut buf = [0u8; 300];
        while received.len() < total {
            let n = pipe.read(&mut buf, Wait::Forever);
            received.extend_from_slice(&buf[..n]);
        }
        writer.join().unwrap();

        for (i, &b) in received.iter().enumerate() {
            assert_eq!(b, (i % 251) as u8, "byte {} out of order", i);
        }
    }
}
