use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::identity::domain::identity::Identity;
use crate::pipeline::frame_dispatcher::FrameDispatcher;
use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::infrastructure::worker_pool::{Job, WorkerPool};
use crate::pipeline::processed_frame::ProcessedFrame;
use crate::shared::frame::Frame;
use crate::shared::swap_error::SwapError;

/// Fans sampled frames out to a shared [`WorkerPool`] and gathers the
/// results back into sample order.
///
/// Layout: `caller → pool[N workers: process_one] → caller [gather by position]`
pub struct WorkerPoolDispatcher {
    pool: WorkerPool,
}

impl WorkerPoolDispatcher {
    pub fn new(workers: usize) -> Result<Self, SwapError> {
        Ok(Self {
            pool: WorkerPool::new(workers)?,
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.size()
    }
}

impl FrameDispatcher for WorkerPoolDispatcher {
    fn dispatch_all(
        &self,
        frames: Vec<Frame>,
        identity: Arc<Identity>,
        processor: Arc<FrameProcessor>,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> Vec<ProcessedFrame> {
        let total = frames.len();
        let frames: Vec<Arc<Frame>> = frames.into_iter().map(Arc::new).collect();

        // Sized so no worker ever blocks on send.
        let (result_tx, result_rx) =
            crossbeam_channel::bounded::<(usize, ProcessedFrame)>(total.max(1));

        for (position, frame) in frames.iter().enumerate() {
            let job = process_job(
                position,
                Arc::clone(frame),
                Arc::clone(&identity),
                Arc::clone(&processor),
                result_tx.clone(),
            );
            if self.pool.submit(job).is_err() {
                log::error!(
                    "Worker pool is shut down, frame {} was not processed",
                    frame.index()
                );
            }
        }
        drop(result_tx);

        let mut slots: Vec<Option<ProcessedFrame>> = (0..total).map(|_| None).collect();
        let mut completed = 0;
        for (position, result) in result_rx {
            if slots[position].replace(result).is_none() {
                completed += 1;
            }
            on_progress(completed, total);
        }

        slots
            .into_iter()
            .zip(&frames)
            .map(|(slot, frame)| {
                slot.unwrap_or_else(|| {
                    ProcessedFrame::degraded(frame, "no result received from worker pool")
                })
            })
            .collect()
    }
}

fn process_job(
    position: usize,
    frame: Arc<Frame>,
    identity: Arc<Identity>,
    processor: Arc<FrameProcessor>,
    result_tx: crossbeam_channel::Sender<(usize, ProcessedFrame)>,
) -> Job {
    Box::new(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            processor.process_one(&frame, &identity)
        }))
        .unwrap_or_else(|payload| {
            let cause = format!("frame processing panicked: {}", panic_message(&*payload));
            log::error!("Frame {}: {cause}", frame.index());
            ProcessedFrame::degraded(&frame, cause)
        });
        // The receiver only goes away if the caller itself is gone.
        let _ = result_tx.send((position, result));
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
