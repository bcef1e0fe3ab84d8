//! Prefetch jobs (component B). Grounded on `prefetch_memory_range` in
//! `smv/convolution.c`: touch every cache line of a byte range, optionally
//! after a busy-wait delay, using a volatile read so the optimizer can't
//! prove the read is dead and elide it.

use std::time::{Duration, Instant};

/// Wraps a raw byte pointer so a [`PrefetchJob`] can cross into a worker
/// thread. The execution driver calls [`crate::pool::WorkerPool::join`]
/// before the referenced host buffer goes out of scope or is mutated (see
/// §5 of the design), so the pointer never outlives the memory it names.
struct PrefetchPtr(*const u8);

// SAFETY: the driver guarantees the pointed-to buffer outlives every
// dispatched job via a join barrier; the job only reads through the
// pointer, never writes.
unsafe impl Send for PrefetchPtr {}

/// A single prefetch task: touch `[offset, len)` of a buffer, cache line by
/// cache line, after an optional busy-wait delay.
pub struct PrefetchJob {
    ptr: PrefetchPtr,
    len: usize,
    offset: usize,
    delay_ns: u64,
    cache_line_bytes: usize,
}

impl PrefetchJob {
    /// # Safety
    /// `base` must remain valid for reads of `len` bytes until the pool's
    /// next `join()` call.
    pub unsafe fn new(base: *const u8, len: usize, offset: usize, delay_ns: u64, cache_line_bytes: usize) -> Self {
        Self {
            ptr: PrefetchPtr(base),
            len,
            offset,
            delay_ns,
            cache_line_bytes,
        }
    }

    pub fn run(self) {
        if self.offset >= self.len {
            return;
        }
        if self.delay_ns > 0 {
            let start = Instant::now();
            let target = Duration::from_nanos(self.delay_ns);
            while start.elapsed() < target {}
        }
        let step = self.cache_line_bytes.max(1);
        let mut cursor = self.offset;
        while cursor < self.len {
            unsafe {
                let byte = self.ptr.0.add(cursor);
                std::ptr::read_volatile(byte);
            }
            cursor += step;
        }
    }
}
