//! Prefetch worker pool (component A). Grounded on `init_thread_pool` /
//! `thread_dispatch` / `thread_pool_join` / `destroy_thread_pool` in
//! `utility/thread_pool.c`. A fixed set of OS threads consumes prefetch
//! jobs dispatched by the execution driver; an unbounded FIFO queue
//! absorbs overflow when every worker is busy.

mod job;
mod worker;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

pub use job::PrefetchJob;
pub use worker::ThreadStatus;
use worker::{worker_loop, WorkerSlot};

/// A fixed-size pool of background prefetch workers.
pub struct WorkerPool {
    slots: Vec<Arc<WorkerSlot>>,
    handles: Vec<JoinHandle<()>>,
    queue: Arc<Mutex<VecDeque<PrefetchJob>>>,
}

impl WorkerPool {
    /// Spawns `n` worker threads and blocks until each has reported ready.
    pub fn new(n: usize) -> Self {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let mut slots = Vec::with_capacity(n);
        let mut handles = Vec::with_capacity(n);

        for _ in 0..n {
            let slot = Arc::new(WorkerSlot::new());
            let slot_for_thread = Arc::clone(&slot);
            let queue_for_thread = Arc::clone(&queue);
            let handle = std::thread::Builder::new()
                .name("tile-sched-prefetch".into())
                .spawn(move || worker_loop(slot_for_thread, queue_for_thread))
                .expect("failed to spawn prefetch worker thread");
            slots.push(slot);
            handles.push(handle);
        }

        for slot in &slots {
            let state = slot.state.lock().unwrap();
            let _ready = slot
                .status_cond
                .wait_while(state, |s| s.status == ThreadStatus::Uninit)
                .unwrap();
        }

        Self { slots, handles, queue }
    }

    /// Dispatches `job`, preferring an idle worker over the overflow queue.
    /// Never blocks the caller.
    pub fn dispatch(&self, job: PrefetchJob) {
        for slot in &self.slots {
            let mut state = slot.state.lock().unwrap();
            if state.status == ThreadStatus::Idle && !state.valid {
                state.job = Some(job);
                state.valid = true;
                drop(state);
                slot.wakeup_cond.notify_one();
                return;
            }
        }
        self.queue.lock().unwrap().push_back(job);
    }

    /// Blocks until every worker is idle with no queued job of its own. Does
    /// not drain the shared overflow queue by itself; a worker only drains
    /// it when finishing a job, so call this only once no further
    /// dispatches are expected for the current tile boundary.
    pub fn join(&self) {
        for slot in &self.slots {
            let state = slot.state.lock().unwrap();
            let _idle = slot
                .status_cond
                .wait_while(state, |s| s.status == ThreadStatus::Running || s.valid)
                .unwrap();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for slot in &self.slots {
            let mut state = slot.state.lock().unwrap();
            state.exit = true;
            drop(state);
            slot.wakeup_cond.notify_one();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dispatches_and_joins() {
        let pool = WorkerPool::new(2);
        let buf = vec![0u8; 4096];
        for _ in 0..8 {
            let job = unsafe { PrefetchJob::new(buf.as_ptr(), buf.len(), 0, 0, 64) };
            pool.dispatch(job);
        }
        pool.join();
    }

    #[test]
    fn survives_a_panicking_job() {
        let pool = WorkerPool::new(1);
        let job = unsafe { PrefetchJob::new(std::ptr::null(), 0, 0, 0, 64) };
        pool.dispatch(job);
        pool.join();
        // pool is still usable after a degenerate job.
        let buf = vec![0u8; 64];
        let job = unsafe { PrefetchJob::new(buf.as_ptr(), buf.len(), 0, 0, 64) };
        pool.dispatch(job);
        pool.join();
    }
}
