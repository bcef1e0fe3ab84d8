//! Per-worker state (component A). Grounded on `thread_work_t` in
//! `utility/thread_pool.h`: a status descriptor with its own mutex and two
//! condition variables, one for waking the worker, one for reporting status
//! changes back to whoever dispatched or is joining.

use std::sync::{Condvar, Mutex};

use tracing::error;

use super::job::PrefetchJob;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    Uninit,
    Idle,
    Running,
}

pub(super) struct WorkerState {
    pub job: Option<PrefetchJob>,
    pub status: ThreadStatus,
    pub valid: bool,
    pub exit: bool,
}

/// Shared between the owning [`super::WorkerPool`] and the worker's OS
/// thread. One `WorkerSlot` per worker; never moved once spawned.
pub(super) struct WorkerSlot {
    pub state: Mutex<WorkerState>,
    pub wakeup_cond: Condvar,
    pub status_cond: Condvar,
}

impl WorkerSlot {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WorkerState {
                job: None,
                status: ThreadStatus::Uninit,
                valid: false,
                exit: false,
            }),
            wakeup_cond: Condvar::new(),
            status_cond: Condvar::new(),
        }
    }
}

/// The body run on each worker's OS thread. Grounded on `thread_spinloop`:
/// report idle once, then loop waiting on `wakeup_cond` until a job is
/// published or `exit` is set; run the job, go idle, and before sleeping
/// again try to self-dispatch the next queued job rather than waking a
/// different idle worker.
pub(super) fn worker_loop(
    slot: std::sync::Arc<WorkerSlot>,
    queue: std::sync::Arc<Mutex<std::collections::VecDeque<PrefetchJob>>>,
) {
    {
        let mut state = slot.state.lock().unwrap();
        state.status = ThreadStatus::Idle;
        slot.status_cond.notify_all();
    }

    loop {
        let job = {
            let mut state = slot.state.lock().unwrap();
            while !state.valid && !state.exit {
                state = slot.wakeup_cond.wait(state).unwrap();
            }
            if state.exit {
                return;
            }
            state.status = ThreadStatus::Running;
            state.job.take()
        };

        if let Some(job) = job {
            if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| job.run())) {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(message, "prefetch job panicked; ignoring, prefetching is advisory");
            }
        }

        let mut state = slot.state.lock().unwrap();
        state.valid = false;
        match queue.lock().unwrap().pop_front() {
            Some(next) => {
                state.job = Some(next);
                state.valid = true;
                state.status = ThreadStatus::Running;
            }
            None => {
                state.status = ThreadStatus::Idle;
            }
        }
        slot.status_cond.notify_all();
    }
}
