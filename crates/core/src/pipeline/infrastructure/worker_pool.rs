use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::shared::swap_error::SwapError;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of long-lived worker threads fed from one job queue.
///
/// Created once per process and shared by every request, so the number of
/// concurrently running jobs never exceeds `size` no matter how many
/// requests are in flight. Dropping the pool lets queued jobs finish and
/// joins the threads.
pub struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, SwapError> {
        if size < 1 {
            return Err(SwapError::InvalidInput("worker count must be >= 1".into()));
        }

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let mut handles = Vec::with_capacity(size);
        for id in 0..size {
            let job_rx = job_rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("gifswap-worker-{id}"))
                .spawn(move || {
                    for job in job_rx {
                        // Jobs report their own failures; this only keeps the thread alive.
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            log::error!("Worker {id}: job panicked");
                        }
                    }
                })
                .map_err(|e| SwapError::Internal(format!("failed to spawn worker {id}: {e}")))?;
            handles.push(handle);
        }

        log::debug!("Worker pool started with {size} thread(s)");
        Ok(Self {
            job_tx: Some(job_tx),
            handles,
        })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Queues a job. Hands the job back if the pool is shutting down.
    pub fn submit(&self, job: Job) -> Result<(), Job> {
        match &self.job_tx {
            Some(tx) => tx.send(job).map_err(|e| e.into_inner()),
            None => Err(job),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.job_tx.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::warn!("Worker thread panicked during shutdown");
            }
        }
    }
}
